use nalgebra::{point, vector, Point3, Vector3};

use crate::common::{box_corners, TimeInterval, Transform, ValueRange};

/// How a dataset is sampled between voxel centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    NearestNeighbor,
    Trilinear,
}

/// Voxel grid dimensions, including time frames and gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub frames: usize,
    pub gates: usize,
}

impl Dimensions {
    pub fn new(x: usize, y: usize, z: usize, frames: usize, gates: usize) -> Dimensions {
        Dimensions {
            x,
            y,
            z,
            frames,
            gates,
        }
    }

    /// Single frame, single gate grid
    pub fn spatial(size: Vector3<usize>) -> Dimensions {
        Dimensions::new(size.x, size.y, size.z, 1, 1)
    }

    pub fn voxel_dims(&self) -> Vector3<usize> {
        vector![self.x, self.y, self.z]
    }

    pub fn voxels_per_frame(&self) -> usize {
        self.x * self.y * self.z
    }

    pub fn total(&self) -> usize {
        self.voxels_per_frame() * self.frames * self.gates
    }

    pub fn contains(&self, voxel: &Point3<usize>) -> bool {
        voxel.x < self.x && voxel.y < self.y && voxel.z < self.z
    }
}

/// Regular voxel grid owned by the caller, the engine only reads from it.
///
/// Voxel `(i, j, k)` covers `[i, i+1) × [j, j+1) × [k, k+1)` in voxel units,
/// multiply by [`voxel_size`](Dataset::voxel_size) to get millimeters in the
/// dataset frame, then [`transform`](Dataset::transform) places it in base space.
pub trait Dataset: Send + Sync {
    fn dimensions(&self) -> Dimensions;

    /// Voxel size in millimeters
    fn voxel_size(&self) -> Vector3<f64>;

    /// Voxel space (in millimeters) to base space
    fn transform(&self) -> &Transform;

    /// Raw value, `None` outside of the grid
    fn scalar_at(&self, voxel: Point3<usize>, frame: usize, gate: usize) -> Option<f32>;

    fn frame_start_time(&self, frame: usize) -> f64;

    fn frame_duration(&self, frame: usize) -> f64;

    fn name(&self) -> &str {
        "dataset"
    }

    fn frame_end_time(&self, frame: usize) -> f64 {
        self.frame_start_time(frame) + self.frame_duration(frame)
    }

    /// Time midpoint of the frame
    fn frame_midpoint(&self, frame: usize) -> f64 {
        0.5 * (self.frame_start_time(frame) + self.frame_end_time(frame))
    }

    /// Scaled size, millimeters
    fn extent(&self) -> Vector3<f64> {
        self.dimensions()
            .voxel_dims()
            .map(|v| v as f64)
            .component_mul(&self.voxel_size())
    }

    /// Corners of the whole grid in base space
    fn base_corners(&self) -> [Point3<f64>; 8] {
        let extent = self.extent();
        box_corners(point![0.0, 0.0, 0.0], Point3::from(extent))
            .map(|c| self.transform().to_base(&c))
    }

    /// Frames overlapping `interval` with their weights, weights sum to one.
    ///
    /// If no frame overlaps, the frame closest in time is used alone.
    fn frames_in_interval(&self, interval: TimeInterval) -> Vec<(usize, f64)> {
        let frames = self.dimensions().frames;
        let mut weighted: Vec<(usize, f64)> = (0..frames)
            .map(|f| {
                let overlap = interval.overlap(self.frame_start_time(f), self.frame_end_time(f));
                (f, overlap)
            })
            .filter(|&(_, overlap)| overlap > 0.0)
            .collect();

        let sum: f64 = weighted.iter().map(|(_, w)| w).sum();
        if sum > 0.0 {
            weighted.iter_mut().for_each(|(_, w)| *w /= sum);
            return weighted;
        }

        let closest = (0..frames).min_by(|&a, &b| {
            let da = (self.frame_midpoint(a) - interval.midpoint()).abs();
            let db = (self.frame_midpoint(b) - interval.midpoint()).abs();
            da.total_cmp(&db)
        });
        closest.map(|f| vec![(f, 1.0)]).unwrap_or_default()
    }

    /// Sample at continuous voxel coordinate `pos` (voxel centers sit at `i + 0.5`).
    /// `None` if `pos` lies outside the grid.
    fn sample(
        &self,
        pos: &Point3<f64>,
        frame: usize,
        gate: usize,
        interpolation: Interpolation,
    ) -> Option<f32> {
        let dims = self.dimensions().voxel_dims();
        let inside = (0..3).all(|i| pos[i] >= 0.0 && pos[i] < dims[i] as f64);
        if !inside {
            return None;
        }

        match interpolation {
            Interpolation::NearestNeighbor => {
                let voxel = pos.map(|v| v as usize);
                self.scalar_at(voxel, frame, gate)
            }
            Interpolation::Trilinear => {
                // shift so integer coordinates are voxel centers
                let shifted = pos.map(|v| v - 0.5);
                let base = shifted.map(f64::floor);
                let t = shifted - base;

                let mut acc = 0.0;
                for corner in 0..8usize {
                    let offset = vector![corner & 1, (corner >> 1) & 1, (corner >> 2) & 1];
                    let mut weight = 1.0;
                    let mut voxel = Point3::origin();
                    for i in 0..3 {
                        let idx = base[i] as isize + offset[i] as isize;
                        // replicate edge voxels
                        voxel[i] = idx.clamp(0, dims[i] as isize - 1) as usize;
                        weight *= if offset[i] == 1 { t[i] } else { 1.0 - t[i] };
                    }
                    if weight == 0.0 {
                        continue;
                    }
                    acc += weight * self.scalar_at(voxel, frame, gate)? as f64;
                }
                Some(acc as f32)
            }
        }
    }

    /// Sample weighted across `frames` (see [`frames_in_interval`](Dataset::frames_in_interval)),
    /// averaged across gates.
    fn sample_interval(
        &self,
        pos: &Point3<f64>,
        frames: &[(usize, f64)],
        interpolation: Interpolation,
    ) -> Option<f32> {
        let gates = self.dimensions().gates.max(1);
        let mut acc = 0.0;
        for &(frame, weight) in frames {
            for gate in 0..gates {
                acc += weight * self.sample(pos, frame, gate, interpolation)? as f64;
            }
        }
        Some((acc / gates as f64) as f32)
    }

    /// Smallest and largest value of one frame and gate
    fn value_range(&self, frame: usize, gate: usize) -> ValueRange {
        let dims = self.dimensions();
        let mut range = ValueRange::empty();
        for x in 0..dims.x {
            for y in 0..dims.y {
                for z in 0..dims.z {
                    if let Some(v) = self.scalar_at(point![x, y, z], frame, gate) {
                        range.extend(v as f64);
                    }
                }
            }
        }
        range
    }
}
