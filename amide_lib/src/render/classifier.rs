//! Resampling of datasets and ROIs into classified rendering voxels

use std::sync::{atomic::AtomicBool, Arc};

use nalgebra::{point, vector, Point3, Vector3};

use crate::{
    common::{check_cancel, for_each_band, BoundBox, TimeInterval, Transform, ValueRange},
    error::{alloc_vec, EngineError, Result},
    roi::{Roi, ShapePredicate},
    volumetric::{Dataset, Interpolation},
};

use super::shading::encode_normal;

/// Largest possible gradient of densities normalized to `[0, 1]`,
/// central differences bound every component by 1/2.
const MAX_GRADIENT: f64 = 0.866_025_403_784_438_6;

/// One voxel of a classified volume
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RenderingVoxel {
    /// Encoded surface normal, see [`encode_normal`](super::encode_normal)
    pub normal: u16,
    pub density: u8,
    /// Gradient magnitude
    pub gradient: u8,
}

/// Object a rendering context is built for
#[derive(Clone)]
pub enum RenderSource {
    Dataset(Arc<dyn Dataset>),
    /// Rendered as a binary volume, inside voxels get the highest density
    Roi(Arc<Roi>),
}

impl std::fmt::Debug for RenderSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderSource::Dataset(ds) => write!(f, "Dataset({})", ds.name()),
            RenderSource::Roi(roi) => write!(f, "Roi({})", roi.name()),
        }
    }
}

impl RenderSource {
    pub fn name(&self) -> &str {
        match self {
            RenderSource::Dataset(ds) => ds.name(),
            RenderSource::Roi(roi) => roi.name(),
        }
    }

    pub fn base_corners(&self) -> [Point3<f64>; 8] {
        match self {
            RenderSource::Dataset(ds) => ds.base_corners(),
            RenderSource::Roi(roi) => roi.base_corners(),
        }
    }

    /// Smallest voxel side, `None` for ROIs
    pub fn min_voxel_size(&self) -> Option<f64> {
        match self {
            RenderSource::Dataset(ds) => Some(ds.voxel_size().min()),
            RenderSource::Roi(_) => None,
        }
    }
}

/// Inputs the classification depends on that can change during a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifyStamp {
    pub interval: TimeInterval,
    pub interpolation: Interpolation,
}

/// Everything needed to (re)classify one object
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyParams {
    /// Frame the classified grid is axis aligned in
    pub render_frame: Transform,
    /// Extent of the grid in `render_frame`, millimeters
    pub far_corner: Vector3<f64>,
    /// Classified voxels are never smaller than this
    pub min_voxel_size: f64,
    /// Largest side of the classified grid, in voxels
    pub max_dim: usize,
    pub interval: TimeInterval,
    pub interpolation: Interpolation,
}

impl ClassifyParams {
    pub fn stamp(&self) -> ClassifyStamp {
        ClassifyStamp {
            interval: self.interval,
            interpolation: self.interpolation,
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.far_corner.iter().all(|&c| c.is_finite() && c > 0.0) {
            return Err(EngineError::InvalidArgument(format!(
                "Render extent {:?} must be positive",
                self.far_corner
            )));
        }
        if !(self.min_voxel_size.is_finite() && self.min_voxel_size > 0.0) {
            return Err(EngineError::InvalidArgument(format!(
                "Minimal voxel size {} must be positive",
                self.min_voxel_size
            )));
        }
        if self.max_dim == 0 {
            return Err(EngineError::InvalidArgument("max_dim must be positive".into()));
        }
        Ok(())
    }

    /// Voxel side and grid dimensions.
    ///
    /// Voxels are cubic but the grid is not: each side follows the extent of
    /// `far_corner` and is capped at `max_dim`, so a flat object gets a flat buffer.
    pub fn grid(&self) -> (f64, Vector3<usize>) {
        let voxel_size = f64::max(self.min_voxel_size, self.far_corner.max() / self.max_dim as f64);
        let dims = self
            .far_corner
            .map(|c| ((c / voxel_size).ceil() as usize).clamp(1, self.max_dim));
        (voxel_size, dims)
    }
}

/// Classified voxel grid of one object, x fastest.
#[derive(Debug, Clone)]
pub struct ClassifiedVolume {
    dims: Vector3<usize>,
    voxel_size: f64,
    voxels: Vec<RenderingVoxel>,
    stamp: ClassifyStamp,
    density_range: ValueRange,
}

impl ClassifiedVolume {
    pub fn dims(&self) -> Vector3<usize> {
        self.dims
    }

    /// Side of the cubic voxels in millimeters
    pub fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

    pub fn voxels(&self) -> &[RenderingVoxel] {
        &self.voxels
    }

    pub fn stamp(&self) -> ClassifyStamp {
        self.stamp
    }

    /// Raw values mapped to density 0 and 255
    pub fn density_range(&self) -> ValueRange {
        self.density_range
    }

    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.dims.x * (y + self.dims.y * z)
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<&RenderingVoxel> {
        if x >= self.dims.x || y >= self.dims.y || z >= self.dims.z {
            return None;
        }
        self.voxels.get(self.index(x, y, z))
    }

    /// Grid bounds in voxel units
    pub fn bound_box(&self) -> BoundBox {
        let d = self.dims.map(|v| v as f32);
        BoundBox::new(point![0.0, 0.0, 0.0], point![d.x, d.y, d.z])
    }
}

/// Resample `source` onto the grid described by `params`.
///
/// Values are averaged over the frames of the time interval, quantized over
/// their range to 8 bits, and gradients come from central differences of the
/// quantized densities. Samples outside of the source count as zero.
pub fn classify(
    source: &RenderSource,
    params: &ClassifyParams,
    threads: usize,
    cancel: Option<&AtomicBool>,
) -> Result<ClassifiedVolume> {
    params.validate()?;
    let (voxel_size, dims) = params.grid();
    let len = dims.x * dims.y * dims.z;
    let layer = dims.x * dims.y;

    log::debug!(
        "Classifying {:?}, grid {dims:?}, voxel size {voxel_size:.3} mm",
        source
    );

    let mut values = alloc_vec("resampled values", len, f32::NAN)?;
    match source {
        RenderSource::Dataset(ds) => {
            let frames = ds.frames_in_interval(params.interval);
            let to_dataset = params.render_frame.local_to_other(ds.transform());
            let ds_voxel = ds.voxel_size();
            fill_values(&mut values, dims, voxel_size, threads, cancel, |p| {
                let pos = Point3::from(to_dataset.apply(p).coords.component_div(&ds_voxel));
                ds.sample_interval(&pos, &frames, params.interpolation)
            })?;
        }
        RenderSource::Roi(roi) => {
            let to_roi = params.render_frame.local_to_other(roi.transform());
            let predicate = roi.predicate();
            fill_values(&mut values, dims, voxel_size, threads, cancel, |p| {
                let inside = predicate.contains(&to_roi.apply(p));
                Some(if inside { 1.0 } else { 0.0 })
            })?;
        }
    }

    let density_range = ValueRange::from_samples(values.iter().copied().filter(|v| v.is_finite()));
    let mut densities = alloc_vec("densities", len, 0u8)?;
    densities
        .iter_mut()
        .zip(values.iter())
        .for_each(|(d, &v)| *d = quantize(v, &density_range));
    drop(values);

    let mut voxels = alloc_vec("classified volume", len, RenderingVoxel::default())?;
    for_each_band(&mut voxels, layer, threads, |first_z, band| {
        for (layer_id, slab) in band.chunks_mut(layer).enumerate() {
            check_cancel(cancel)?;
            let z = first_z + layer_id;
            for y in 0..dims.y {
                for x in 0..dims.x {
                    let gradient = central_gradient(&densities, dims, x, y, z);
                    let magnitude = gradient.norm();
                    slab[x + dims.x * y] = RenderingVoxel {
                        // gradient points into the denser region
                        normal: encode_normal(&-gradient),
                        density: densities[x + dims.x * (y + dims.y * z)],
                        gradient: (magnitude / MAX_GRADIENT * 255.0).round().min(255.0) as u8,
                    };
                }
            }
        }
        Ok(())
    })?;

    Ok(ClassifiedVolume {
        dims,
        voxel_size,
        voxels,
        stamp: params.stamp(),
        density_range,
    })
}

fn fill_values<F>(
    values: &mut [f32],
    dims: Vector3<usize>,
    voxel_size: f64,
    threads: usize,
    cancel: Option<&AtomicBool>,
    sample: F,
) -> Result<()>
where
    F: Fn(&Point3<f64>) -> Option<f32> + Sync,
{
    let layer = dims.x * dims.y;
    for_each_band(values, layer, threads, |first_z, band| {
        for (layer_id, slab) in band.chunks_mut(layer).enumerate() {
            check_cancel(cancel)?;
            let z = first_z + layer_id;
            for y in 0..dims.y {
                for x in 0..dims.x {
                    let center =
                        point![x as f64 + 0.5, y as f64 + 0.5, z as f64 + 0.5] * voxel_size;
                    slab[x + dims.x * y] = sample(&center).unwrap_or(f32::NAN);
                }
            }
        }
        Ok(())
    })
}

/// Map `v` into `0..=255` over `range`. Samples outside of the source map to 0,
/// a flat range maps positive values to 255.
fn quantize(v: f32, range: &ValueRange) -> u8 {
    if !v.is_finite() || range.is_empty() {
        return 0;
    }
    let span = range.span();
    if span <= 0.0 {
        return if v > 0.0 { 255 } else { 0 };
    }
    let t = (v as f64 - range.low) / span;
    (t * 255.0).round().clamp(0.0, 255.0) as u8
}

fn central_gradient(
    densities: &[u8],
    dims: Vector3<usize>,
    x: usize,
    y: usize,
    z: usize,
) -> Vector3<f64> {
    let at = |x: isize, y: isize, z: isize| -> f64 {
        if x < 0 || y < 0 || z < 0 {
            return 0.0;
        }
        let (x, y, z) = (x as usize, y as usize, z as usize);
        if x >= dims.x || y >= dims.y || z >= dims.z {
            return 0.0;
        }
        densities[x + dims.x * (y + dims.y * z)] as f64 / 255.0
    };
    let (x, y, z) = (x as isize, y as isize, z as isize);
    vector![
        at(x + 1, y, z) - at(x - 1, y, z),
        at(x, y + 1, z) - at(x, y - 1, z),
        at(x, y, z + 1) - at(x, y, z - 1)
    ] * 0.5
}
