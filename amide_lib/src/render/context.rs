use std::sync::atomic::AtomicBool;

use nalgebra::{Matrix3, Vector3};

use crate::{
    common::{axis_rotation, orthonormalize, Axis, TimeInterval, Transform},
    error::{EngineError, Result},
    volumetric::Interpolation,
};

use super::{
    classify,
    raycast::{RayCaster, Tables, View},
    ClassifiedVolume, ClassifyParams, DepthCue, FloatImage, PixelType, Quality, Ramp,
    RenderOptions, RenderSource, ShadeTable, RAMP_SIZE,
};

/// Renders one dataset or ROI.
///
/// Owns the classified volume of its object and all viewing state.
/// Rotations are incremental and view relative, each one composes with the
/// current orientation.
pub struct RenderingContext {
    source: RenderSource,
    params: ClassifyParams,
    options: RenderOptions,
    volume: ClassifiedVolume,
    density_ramp: Ramp,
    gradient_ramp: Ramp,
    density_table: [f32; RAMP_SIZE],
    gradient_table: [f32; RAMP_SIZE],
    orientation: Matrix3<f64>,
    quality: Quality,
    pixel_type: PixelType,
    zoom: f64,
    depth_cue: DepthCue,
    image: Option<FloatImage>,
}

impl RenderingContext {
    /// Classify `source` on a grid spanning `[0, far_corner]` of `render_frame`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: RenderSource,
        render_frame: Transform,
        far_corner: Vector3<f64>,
        min_voxel_size: f64,
        interval: TimeInterval,
        interpolation: Interpolation,
        options: RenderOptions,
        cancel: Option<&AtomicBool>,
    ) -> Result<RenderingContext> {
        let params = ClassifyParams {
            render_frame,
            far_corner,
            min_voxel_size,
            max_dim: options.max_dim,
            interval,
            interpolation,
        };
        let volume = classify(&source, &params, options.threads, cancel)?;

        let density_ramp = Ramp::default();
        let gradient_ramp = Ramp::default();
        Ok(RenderingContext {
            source,
            params,
            options,
            volume,
            density_table: density_ramp.table(),
            gradient_table: gradient_ramp.table(),
            density_ramp,
            gradient_ramp,
            orientation: Matrix3::identity(),
            quality: Quality::Highest,
            pixel_type: PixelType::Opacity,
            zoom: 1.0,
            depth_cue: DepthCue::default(),
            image: None,
        })
    }

    pub fn source(&self) -> &RenderSource {
        &self.source
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn classified(&self) -> &ClassifiedVolume {
        &self.volume
    }

    /// Rotate by `theta` radians around the view `axis`
    pub fn set_rotation(&mut self, axis: Axis, theta: f64) {
        self.orientation = orthonormalize(&(axis_rotation(axis, theta) * self.orientation));
    }

    pub fn reset_rotation(&mut self) {
        self.orientation = Matrix3::identity();
    }

    /// Object to view rotation
    pub fn orientation(&self) -> &Matrix3<f64> {
        &self.orientation
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.quality = quality;
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn set_image(&mut self, pixel_type: PixelType, zoom: f64) -> Result<()> {
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(EngineError::InvalidArgument(format!("Zoom {zoom} must be positive")));
        }
        self.pixel_type = pixel_type;
        self.zoom = zoom;
        Ok(())
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_depth_cueing(&mut self, enabled: bool) {
        self.depth_cue.enabled = enabled;
    }

    pub fn set_depth_cueing_parameters(&mut self, front_factor: f32, density: f32) {
        self.depth_cue.front_factor = front_factor;
        self.depth_cue.density = density;
    }

    pub fn depth_cue(&self) -> DepthCue {
        self.depth_cue
    }

    pub fn set_density_ramp(&mut self, ramp: Ramp) {
        self.density_table = ramp.table();
        self.density_ramp = ramp;
    }

    pub fn set_gradient_ramp(&mut self, ramp: Ramp) {
        self.gradient_table = ramp.table();
        self.gradient_ramp = ramp;
    }

    pub fn density_ramp(&self) -> &Ramp {
        &self.density_ramp
    }

    pub fn gradient_ramp(&self) -> &Ramp {
        &self.gradient_ramp
    }

    /// Change the time interval or interpolation without classifying,
    /// the next render picks the change up.
    pub fn set_interval(&mut self, interval: TimeInterval, interpolation: Interpolation) {
        self.params.interval = interval;
        self.params.interpolation = interpolation;
    }

    /// Classified volume was built for other parameters than the current ones
    pub fn is_stale(&self) -> bool {
        self.volume.stamp() != self.params.stamp()
    }

    /// Set new parameters and reclassify if they differ.
    /// Returns whether a reclassification happened.
    pub fn reload(
        &mut self,
        interval: TimeInterval,
        interpolation: Interpolation,
        cancel: Option<&AtomicBool>,
    ) -> Result<bool> {
        self.set_interval(interval, interpolation);
        self.ensure_classified(cancel)
    }

    fn ensure_classified(&mut self, cancel: Option<&AtomicBool>) -> Result<bool> {
        if !self.is_stale() {
            return Ok(false);
        }
        log::debug!(
            "Reclassifying {} for {:?}",
            self.source.name(),
            self.params.stamp()
        );
        self.volume = classify(&self.source, &self.params, self.options.threads, cancel)?;
        Ok(true)
    }

    /// Side of the square image a render produces
    pub fn image_dim(&self) -> usize {
        super::raycast::image_dim(self.volume.dims(), self.zoom)
    }

    /// Render with the current orientation, the result is kept in [`image`](Self::image)
    pub fn render(&mut self, cancel: Option<&AtomicBool>) -> Result<&FloatImage> {
        let image = self.render_view(&Matrix3::identity(), cancel)?;
        Ok(self.image.insert(image))
    }

    /// Render with `extra` applied in view space after the orientation, used for stereo pairs
    pub fn render_view(
        &mut self,
        extra: &Matrix3<f64>,
        cancel: Option<&AtomicBool>,
    ) -> Result<FloatImage> {
        self.ensure_classified(cancel)?;

        let orientation = extra * self.orientation;
        let shades = ShadeTable::new(&self.options.material, &self.options.light, &orientation);
        let tables = Tables {
            density: &self.density_table,
            gradient: &self.gradient_table,
            shades: &shades,
        };
        let view = View::new(self.volume.dims(), &orientation, self.zoom);
        let caster = RayCaster::new(
            &self.volume,
            &tables,
            self.quality.settings(),
            self.pixel_type,
            self.depth_cue,
            view,
        )?;
        caster.render(self.options.threads, cancel)
    }

    /// Last image produced by [`render`](Self::render)
    pub fn image(&self) -> Option<&FloatImage> {
        self.image.as_ref()
    }
}
