use std::sync::atomic::AtomicBool;

use nalgebra::{point, Matrix3, Vector3};

use crate::{
    common::{axis_rotation, Axis, TimeInterval, Transform},
    error::{EngineError, Result},
    volumetric::Interpolation,
};

use super::{
    DepthCue, FloatImage, PixelType, Quality, RasterImage, RenderOptions, RenderSource,
    RenderingContext,
};

/// Rendering contexts of all visible objects, kept co-registered.
///
/// Every context is classified on the same grid, so their images line up and
/// can be composited. List order is painter order, later contexts go over earlier ones.
pub struct RenderingContextList {
    contexts: Vec<RenderingContext>,
}

impl RenderingContextList {
    /// Build a context for every dataset and drawn ROI of `objects`.
    ///
    /// The common grid spans the union of the objects' extents in `render_frame`,
    /// its voxels are as small as the finest dataset voxel allows.
    pub fn new(
        objects: Vec<RenderSource>,
        render_frame: &Transform,
        interval: TimeInterval,
        interpolation: Interpolation,
        options: RenderOptions,
        cancel: Option<&AtomicBool>,
    ) -> Result<RenderingContextList> {
        let objects: Vec<RenderSource> = objects
            .into_iter()
            .filter(|object| match object {
                RenderSource::Roi(roi) if roi.is_undrawn() => {
                    log::warn!("Skipping undrawn ROI {}", roi.name());
                    false
                }
                _ => true,
            })
            .collect();

        if objects.is_empty() {
            log::warn!("Nothing to render");
            return Ok(RenderingContextList {
                contexts: Vec::new(),
            });
        }

        let mut low = Vector3::repeat(f64::INFINITY);
        let mut high = Vector3::repeat(f64::NEG_INFINITY);
        for corner in objects.iter().flat_map(|o| o.base_corners()) {
            let local = render_frame.to_local(&corner).coords;
            low = low.inf(&local);
            high = high.sup(&local);
        }
        let far_corner = high - low;
        if !far_corner.iter().all(|&c| c > 0.0) {
            return Err(EngineError::InvalidGeometry(format!(
                "Objects span a degenerate extent {far_corner:?}"
            )));
        }
        let frame = render_frame.shifted(&render_frame.vector_to_base(&low));

        let min_voxel_size = objects
            .iter()
            .filter_map(RenderSource::min_voxel_size)
            .fold(f64::INFINITY, f64::min);
        // ROIs only, the grid size alone decides
        let min_voxel_size = if min_voxel_size.is_finite() {
            min_voxel_size
        } else {
            far_corner.max() / options.max_dim as f64
        };

        log::info!(
            "Building {} rendering contexts, extent {far_corner:?} mm at {}",
            objects.len(),
            frame.offset()
        );

        let contexts = objects
            .into_iter()
            .map(|object| {
                RenderingContext::new(
                    object,
                    frame,
                    far_corner,
                    min_voxel_size,
                    interval,
                    interpolation,
                    options.clone(),
                    cancel,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RenderingContextList { contexts })
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn contexts(&self) -> &[RenderingContext] {
        &self.contexts
    }

    /// Per-object settings such as transfer function ramps
    pub fn context_mut(&mut self, index: usize) -> Option<&mut RenderingContext> {
        self.contexts.get_mut(index)
    }

    pub fn set_rotation(&mut self, axis: Axis, theta: f64) {
        self.contexts
            .iter_mut()
            .for_each(|c| c.set_rotation(axis, theta));
    }

    pub fn reset_rotation(&mut self) {
        self.contexts.iter_mut().for_each(|c| c.reset_rotation());
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.contexts.iter_mut().for_each(|c| c.set_quality(quality));
    }

    pub fn set_image(&mut self, pixel_type: PixelType, zoom: f64) -> Result<()> {
        self.contexts
            .iter_mut()
            .try_for_each(|c| c.set_image(pixel_type, zoom))
    }

    pub fn set_depth_cueing(&mut self, enabled: bool) {
        self.contexts
            .iter_mut()
            .for_each(|c| c.set_depth_cueing(enabled));
    }

    pub fn set_depth_cueing_parameters(&mut self, front_factor: f32, density: f32) {
        self.contexts
            .iter_mut()
            .for_each(|c| c.set_depth_cueing_parameters(front_factor, density));
    }

    pub fn depth_cue(&self) -> Option<DepthCue> {
        self.contexts.first().map(RenderingContext::depth_cue)
    }

    /// Reclassify the contexts built for other parameters, returns how many were rebuilt
    pub fn reload_objects(
        &mut self,
        interval: TimeInterval,
        interpolation: Interpolation,
        cancel: Option<&AtomicBool>,
    ) -> Result<usize> {
        let mut reloaded = 0;
        for context in self.contexts.iter_mut() {
            if context.reload(interval, interpolation, cancel)? {
                reloaded += 1;
            }
        }
        log::debug!("Reloaded {reloaded} of {} contexts", self.contexts.len());
        Ok(reloaded)
    }

    /// Render all contexts into one `image_width × image_height` raster,
    /// or a side by side stereo pair `2 × eye_width` wide.
    ///
    /// Each eye is rotated by half of `eye_angle_deg` around the view y axis,
    /// left eye first.
    pub fn render(
        &mut self,
        image_width: usize,
        image_height: usize,
        eye_count: usize,
        eye_angle_deg: f64,
        eye_width: usize,
        cancel: Option<&AtomicBool>,
    ) -> Result<RasterImage> {
        match eye_count {
            1 => {
                let mut output = RasterImage::new(image_width, image_height)?;
                if let Some(image) = self.composite(&Matrix3::identity(), cancel)? {
                    output.blit_centered(&RasterImage::from_float(&image)?, 0, image_width);
                }
                Ok(output)
            }
            2 => {
                let mut output = RasterImage::new(2 * eye_width, image_height)?;
                let half = 0.5 * eye_angle_deg.to_radians();
                for (eye, angle) in [-half, half].into_iter().enumerate() {
                    let extra = axis_rotation(Axis::Y, angle);
                    if let Some(image) = self.composite(&extra, cancel)? {
                        let raster = RasterImage::from_float(&image)?;
                        output.blit_centered(&raster, eye * eye_width, eye_width);
                    }
                }
                Ok(output)
            }
            _ => Err(EngineError::InvalidArgument(format!(
                "Eye count {eye_count} must be 1 or 2"
            ))),
        }
    }

    /// All contexts rendered and composited in list order, `None` for an empty list
    pub fn composite(
        &mut self,
        extra: &Matrix3<f64>,
        cancel: Option<&AtomicBool>,
    ) -> Result<Option<FloatImage>> {
        let mut result: Option<FloatImage> = None;
        for context in self.contexts.iter_mut() {
            let image = context.render_view(extra, cancel)?;
            match result.as_mut() {
                Some(acc) => acc.under(&image),
                None => result = Some(image),
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use nalgebra::vector;

    use super::*;
    use crate::{
        roi::Roi,
        test_helpers::{box_roi, uniform_dataset},
        volumetric::Dataset,
    };

    fn options() -> RenderOptions {
        RenderOptions::builder().max_dim(16).threads(1).build_unchecked()
    }

    #[test]
    fn common_grid() {
        let ds: Arc<dyn Dataset> = Arc::new(uniform_dataset(vector![4, 4, 4], 1.0));
        let roi = box_roi(point![2.0, 2.0, 2.0], vector![4.0, 4.0, 4.0]);
        let list = RenderingContextList::new(
            vec![RenderSource::Dataset(ds), RenderSource::Roi(Arc::new(roi))],
            &Transform::identity(),
            TimeInterval::new(0.0, 1.0),
            Interpolation::NearestNeighbor,
            options(),
            None,
        )
        .unwrap();

        assert_eq!(list.len(), 2);
        for context in list.contexts() {
            assert_eq!(context.classified().dims(), vector![6, 6, 6]);
            assert_eq!(context.classified().voxel_size(), 1.0);
        }
    }

    #[test]
    fn undrawn_rois_skipped() {
        let undrawn = Roi::new_box(Transform::identity(), vector![0.0, 0.0, 0.0]).unwrap();
        let list = RenderingContextList::new(
            vec![RenderSource::Roi(Arc::new(undrawn))],
            &Transform::identity(),
            TimeInterval::new(0.0, 1.0),
            Interpolation::NearestNeighbor,
            options(),
            None,
        )
        .unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn empty_list_renders_blank() {
        let mut list = RenderingContextList { contexts: Vec::new() };
        let image = list.render(8, 4, 1, 0.0, 0, None).unwrap();
        assert_eq!((image.width, image.height), (8, 4));
        assert!(image.pixels.iter().all(|&p| p == 0));

        assert!(matches!(
            list.render(8, 4, 3, 0.0, 0, None),
            Err(EngineError::InvalidArgument(_))
        ));
    }
}
