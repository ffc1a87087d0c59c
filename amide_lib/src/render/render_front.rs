use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use crossbeam::channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::{
    common::{Axis, TimeInterval},
    error::Result,
    volumetric::Interpolation,
};

use super::{PixelType, Quality, RasterImage, RenderingContextList};

/// Messages to renderer
///
/// Messages queue up and are handled in order, a render blocks the queue until done.
#[derive(Debug, Clone)]
pub enum RendererMessage {
    Rotate(Axis, f64),
    ResetRotation,
    Quality(Quality),
    Image(PixelType, f64),
    DepthCueing(bool),
    DepthCueingParameters { front_factor: f32, density: f32 },
    Reload(TimeInterval, Interpolation),
    /// Render a frame, see [`RenderingContextList::render`]
    Render {
        width: usize,
        height: usize,
        eye_count: usize,
        eye_angle_deg: f64,
        eye_width: usize,
    },
    /// Shut down, thread will get ready to be joined
    ShutDown,
}

type SharedBuffer = Arc<Mutex<Option<RasterImage>>>;

/// Communicating with a renderer running in its own thread
///
/// Can be active or inactive.
pub struct RendererFront {
    handle: Option<JoinHandle<()>>,
    buffer: SharedBuffer,
    cancel: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    communication_in: (Sender<RendererMessage>, Receiver<RendererMessage>),
    // result of every render, outcomes nobody reads are dropped once it is full
    communication_out: (Sender<Result<()>>, Receiver<Result<()>>),
}

impl RendererFront {
    /// Create inactive front
    pub fn new() -> Self {
        let communication_in = crossbeam::channel::bounded(100); // main -> renderer
        let communication_out = crossbeam::channel::bounded(100); // renderer -> main
        Self {
            handle: None,
            buffer: Arc::new(Mutex::new(None)),
            cancel: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(AtomicBool::new(false)),
            communication_in,
            communication_out,
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Getter for sender
    /// Returned struct can be used to send commands to renderer
    pub fn get_sender(&self) -> Sender<RendererMessage> {
        self.communication_in.0.clone()
    }

    /// Send message to renderer, returns `false` if the renderer is gone
    pub fn send_message(&self, msg: RendererMessage) -> bool {
        self.communication_in.0.send(msg).is_ok()
    }

    /// Receive outcomes of renders.
    /// `Ok` means a new frame is in the shared buffer.
    pub fn get_receiver(&self) -> Receiver<Result<()>> {
        self.communication_out.1.clone()
    }

    /// Blocking wait for the outcome of the next render, `None` if the channel is closed
    pub fn receive_message(&self) -> Option<Result<()>> {
        self.communication_out.1.recv().ok()
    }

    /// Shared buffer holding the last rendered frame
    pub fn get_buffer_handle(&self) -> SharedBuffer {
        self.buffer.clone()
    }

    /// Raise the cancel flag, the running render returns `Cancelled`.
    /// The flag is lowered again before the next render starts.
    pub fn cancel_render(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Start rendering `contexts` in a new thread
    ///
    /// Front goes into active state.
    /// If front was already active, previous renderer gets shutdown first.
    pub fn start_rendering(&mut self, contexts: RenderingContextList) {
        if self.handle.is_some() {
            log::debug!("Shutting down current renderer");
            self.finish();
        }

        self.shutdown.store(false, Ordering::Relaxed);
        let worker = RenderThread {
            contexts,
            buffer: self.buffer.clone(),
            cancel: self.cancel.clone(),
            shutdown: self.shutdown.clone(),
            messages: self.communication_in.1.clone(),
            results: self.communication_out.0.clone(),
        };
        self.handle = Some(std::thread::spawn(move || worker.run()));
    }

    /// Shut the renderer down and sync thread with parent
    ///
    /// Call is blocking until thread is joined, messages still queued are skipped.
    /// Front goes into inactive state.
    pub fn finish(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.shutdown.store(true, Ordering::Relaxed);
            self.cancel_render();
            if self.communication_in.0.send(RendererMessage::ShutDown).is_err() {
                log::warn!("Renderer thread already gone");
            }
            if handle.join().is_err() {
                log::error!("Renderer thread panicked");
            }
            *self.buffer.lock() = None;
            // a restarted renderer starts with no stale outcomes
            while self.communication_in.1.try_recv().is_ok() {}
            while self.communication_out.1.try_recv().is_ok() {}
        }
    }
}

impl Default for RendererFront {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RendererFront {
    fn drop(&mut self) {
        self.finish();
    }
}

struct RenderThread {
    contexts: RenderingContextList,
    buffer: SharedBuffer,
    cancel: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    messages: Receiver<RendererMessage>,
    results: Sender<Result<()>>,
}

impl RenderThread {
    fn run(mut self) {
        // Master loop
        while let Ok(msg) = self.messages.recv() {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
            let outcome = match msg {
                RendererMessage::ShutDown => break,
                RendererMessage::Render {
                    width,
                    height,
                    eye_count,
                    eye_angle_deg,
                    eye_width,
                } => {
                    self.cancel.store(false, Ordering::Relaxed);
                    let frame = self.contexts.render(
                        width,
                        height,
                        eye_count,
                        eye_angle_deg,
                        eye_width,
                        Some(&self.cancel),
                    );
                    Some(frame.map(|image| {
                        *self.buffer.lock() = Some(image);
                    }))
                }
                other => self.apply(other).err().map(Err),
            };

            if let Some(outcome) = outcome {
                match self.results.try_send(outcome) {
                    Ok(()) => (),
                    Err(TrySendError::Full(_)) => log::debug!("Result queue full, outcome dropped"),
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
        }
        log::debug!("Renderer thread finished");
    }

    fn apply(&mut self, msg: RendererMessage) -> Result<()> {
        match msg {
            RendererMessage::Rotate(axis, theta) => self.contexts.set_rotation(axis, theta),
            RendererMessage::ResetRotation => self.contexts.reset_rotation(),
            RendererMessage::Quality(quality) => self.contexts.set_quality(quality),
            RendererMessage::Image(pixel_type, zoom) => self.contexts.set_image(pixel_type, zoom)?,
            RendererMessage::DepthCueing(enabled) => self.contexts.set_depth_cueing(enabled),
            RendererMessage::DepthCueingParameters {
                front_factor,
                density,
            } => self
                .contexts
                .set_depth_cueing_parameters(front_factor, density),
            RendererMessage::Reload(interval, interpolation) => {
                self.contexts.reload_objects(interval, interpolation, None)?;
            }
            RendererMessage::Render { .. } | RendererMessage::ShutDown => (),
        }
        Ok(())
    }
}
