use std::sync::atomic::AtomicBool;

use nalgebra::{point, vector, Point3, Vector3};

use crate::{
    common::{check_cancel, for_each_band, AffineMap},
    error::{alloc_vec, Result},
    roi::{Roi, ShapePredicate},
    volumetric::Dataset,
};

use super::AnalysisOptions;

/// Axis aligned block of dataset voxels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelRegion {
    pub lower: Point3<usize>,
    pub size: Vector3<usize>,
}

impl VoxelRegion {
    pub fn len(&self) -> usize {
        self.size.x * self.size.y * self.size.z
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn upper(&self) -> Point3<usize> {
        self.lower + self.size
    }

    /// Grow by `margin` voxels on every face, clamped to `[0, limit)`
    pub fn expanded(&self, margin: usize, limit: &Vector3<usize>) -> VoxelRegion {
        let upper = self.upper();
        let lower = self.lower.map(|v| v.saturating_sub(margin));
        let upper = point![
            (upper.x + margin).min(limit.x),
            (upper.y + margin).min(limit.y),
            (upper.z + margin).min(limit.z)
        ];
        VoxelRegion {
            lower,
            size: upper - lower,
        }
    }
}

/// Voxels of the dataset touched by the ROI bounding box.
///
/// Returns the region (clamped to the dataset) and whether the ROI is at most one
/// voxel thick along some dataset axis. `None` when the ROI misses the dataset.
pub fn intersection_region(roi: &Roi, dataset: &dyn Dataset) -> Option<(VoxelRegion, bool)> {
    let dims = dataset.dimensions().voxel_dims();
    let voxel_size = dataset.voxel_size();

    let mut low = vector![f64::INFINITY, f64::INFINITY, f64::INFINITY];
    let mut high = vector![f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
    for corner in roi.base_corners() {
        let local = dataset.transform().to_local(&corner);
        let voxel = local.coords.component_div(&voxel_size);
        low = low.inf(&voxel);
        high = high.sup(&voxel);
    }

    let low = low.map(f64::floor);
    let high = high.map(f64::ceil);
    let thin = (high - low).iter().any(|&extent| extent <= 1.0);

    let mut lower = Point3::origin();
    let mut size = Vector3::zeros();
    for i in 0..3 {
        let l = low[i].clamp(0.0, dims[i] as f64) as usize;
        let h = high[i].clamp(0.0, dims[i] as f64) as usize;
        lower[i] = l;
        size[i] = h.saturating_sub(l);
    }

    let region = VoxelRegion { lower, size };
    if region.is_empty() {
        None
    } else {
        Some((region, thin))
    }
}

/// Fraction of every voxel of a region covered by an ROI.
///
/// Voxels with all 8 corners inside weigh 1, with no corner inside 0, the rest
/// is supersampled on a `granularity³` grid. Forced supersampling applies the
/// sub-voxel test everywhere, needed for ROIs thinner than a voxel.
#[derive(Debug, Clone)]
pub struct VoxelWeights {
    region: VoxelRegion,
    // x fastest, then y, then z
    weights: Vec<f64>,
}

impl VoxelWeights {
    /// Walk the dataset voxels covered by `roi`, `None` if they don't overlap.
    pub fn for_roi(
        roi: &Roi,
        dataset: &dyn Dataset,
        options: &AnalysisOptions,
        cancel: Option<&AtomicBool>,
    ) -> Result<Option<VoxelWeights>> {
        if roi.is_undrawn() {
            log::warn!("ROI {} is undrawn, nothing to analyze", roi.name());
            return Ok(None);
        }

        let (region, thin) = match intersection_region(roi, dataset) {
            Some(r) => r,
            None => {
                log::debug!("ROI {} misses dataset {}", roi.name(), dataset.name());
                return Ok(None);
            }
        };

        // one voxel margin, boundary voxels get their corners tested too
        let region = region.expanded(1, &dataset.dimensions().voxel_dims());

        let to_roi = dataset
            .transform()
            .local_to_other(roi.transform())
            .prescaled(&dataset.voxel_size());

        let predicate = roi.predicate();
        let mut weights =
            VoxelWeights::compute(&predicate, &to_roi, region, thin, options, cancel)?;
        if !thin && weights.fractional_voxels() == 0.0 {
            // shape fits between voxel corners
            log::debug!("ROI {} caught no voxel corner, supersampling all voxels", roi.name());
            weights = VoxelWeights::compute(&predicate, &to_roi, region, true, options, cancel)?;
        }
        Ok(Some(weights))
    }

    /// Core walk, generic over the shape.
    ///
    /// `to_roi` maps dataset voxel coordinates (voxel `i` spans `[i, i+1)`) into ROI local space.
    pub fn compute<P: ShapePredicate>(
        predicate: &P,
        to_roi: &AffineMap,
        region: VoxelRegion,
        force_supersample: bool,
        options: &AnalysisOptions,
        cancel: Option<&AtomicBool>,
    ) -> Result<VoxelWeights> {
        let mut weights = alloc_vec("analysis weights", region.len(), 0.0)?;
        let walker = Walker::new(predicate, to_roi, region, force_supersample, options.granularity);

        log::debug!(
            "Analysis walk over {:?} voxels at {:?}, supersample everything: {force_supersample}",
            region.size,
            region.lower
        );

        let layer_len = region.size.x * region.size.y;
        for_each_band(&mut weights, layer_len, options.threads, |first_layer, band| {
            walker.walk_band(first_layer, band, cancel)
        })?;

        Ok(VoxelWeights { region, weights })
    }

    pub fn region(&self) -> VoxelRegion {
        self.region
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Sum of weights, the ROI volume in voxels
    pub fn fractional_voxels(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Dataset voxels with nonzero weight, `(voxel, weight)`
    pub fn iter(&self) -> impl Iterator<Item = (Point3<usize>, f64)> + '_ {
        let size = self.region.size;
        let lower = self.region.lower;
        self.weights
            .iter()
            .enumerate()
            .filter(|(_, &w)| w > 0.0)
            .map(move |(i, &w)| {
                let x = i % size.x;
                let y = (i / size.x) % size.y;
                let z = i / (size.x * size.y);
                (lower + vector![x, y, z], w)
            })
    }
}

struct Walker<'a, P> {
    predicate: &'a P,
    to_roi: &'a AffineMap,
    region: VoxelRegion,
    force_supersample: bool,
    // sub-voxel centers relative to voxel corner
    sub_offsets: Vec<Vector3<f64>>,
}

impl<'a, P: ShapePredicate> Walker<'a, P> {
    fn new(
        predicate: &'a P,
        to_roi: &'a AffineMap,
        region: VoxelRegion,
        force_supersample: bool,
        granularity: usize,
    ) -> Self {
        let g = granularity.max(1);
        let step = 1.0 / g as f64;
        let mut sub_offsets = Vec::with_capacity(g * g * g);
        for a in 0..g {
            for b in 0..g {
                for c in 0..g {
                    sub_offsets.push(vector![
                        (a as f64 + 0.5) * step,
                        (b as f64 + 0.5) * step,
                        (c as f64 + 0.5) * step
                    ]);
                }
            }
        }
        Walker {
            predicate,
            to_roi,
            region,
            force_supersample,
            sub_offsets,
        }
    }

    fn corner_inside(&self, x: usize, y: usize, z: usize) -> bool {
        let corner = (self.region.lower + vector![x, y, z]).map(|v| v as f64);
        self.predicate.contains(&self.to_roi.apply(&corner))
    }

    /// Corner flags of plane `z`, `(size.x + 1) × (size.y + 1)` values
    fn fill_plane(&self, plane: &mut [bool], z: usize) {
        let row = self.region.size.x + 1;
        for (j, plane_row) in plane.chunks_mut(row).enumerate() {
            for (i, flag) in plane_row.iter_mut().enumerate() {
                *flag = self.corner_inside(i, j, z);
            }
        }
    }

    fn supersample(&self, x: usize, y: usize, z: usize) -> f64 {
        let corner = (self.region.lower + vector![x, y, z]).map(|v| v as f64);
        let inside = self
            .sub_offsets
            .iter()
            .filter(|offset| self.predicate.contains(&self.to_roi.apply(&(corner + *offset))))
            .count();
        inside as f64 / self.sub_offsets.len() as f64
    }

    /// Fill weights of layers `first_layer..` with a private pair of rolling corner planes
    fn walk_band(
        &self,
        first_layer: usize,
        band: &mut [f64],
        cancel: Option<&AtomicBool>,
    ) -> Result<()> {
        let nx = self.region.size.x;
        let ny = self.region.size.y;
        let row = nx + 1;
        let plane_len = row * (ny + 1);

        let mut current = alloc_vec("corner plane", plane_len, false)?;
        let mut next = alloc_vec("corner plane", plane_len, false)?;
        self.fill_plane(&mut current, first_layer);

        for (layer_id, layer) in band.chunks_mut(nx * ny).enumerate() {
            check_cancel(cancel)?;
            let z = first_layer + layer_id;
            self.fill_plane(&mut next, z + 1);

            for y in 0..ny {
                for x in 0..nx {
                    let low = y * row + x;
                    let high = low + row;
                    let inside = [
                        current[low],
                        current[low + 1],
                        current[high],
                        current[high + 1],
                        next[low],
                        next[low + 1],
                        next[high],
                        next[high + 1],
                    ]
                    .iter()
                    .filter(|&&c| c)
                    .count();

                    layer[y * nx + x] = if self.force_supersample || (inside > 0 && inside < 8) {
                        self.supersample(x, y, z)
                    } else if inside == 8 {
                        1.0
                    } else {
                        0.0
                    };
                }
            }

            std::mem::swap(&mut current, &mut next);
        }
        Ok(())
    }
}
