//! Orthographic front-to-back ray casting through a classified volume

use std::sync::atomic::AtomicBool;

use nalgebra::{point, vector, Matrix3, Point3, Vector3};

use crate::{
    color::{self, RGBA},
    common::{check_cancel, for_each_band, BoundBox, Ray},
    error::{alloc_vec, Result},
};

use super::{
    classifier::ClassifiedVolume, DepthCue, FloatImage, PixelType, QualitySettings, ShadeTable,
    RAMP_SIZE,
};

/// Viewing parameters of one render, all lengths in classified voxels.
///
/// The image plane is perpendicular to `forward` and centered on the volume,
/// pixel `(0, 0)` is the top left corner.
#[derive(Debug, Clone)]
pub struct View {
    forward: Vector3<f32>,
    right: Vector3<f32>,
    up: Vector3<f32>,
    center: Point3<f32>,
    // distance of ray origins from the center
    reach: f32,
    pixel_size: f32,
    image_dim: usize,
    // extent of the volume along forward, for depth cueing
    near: f32,
    far: f32,
}

impl View {
    /// `orientation` maps volume to view space, the viewer looks along view +z.
    pub fn new(dims: Vector3<usize>, orientation: &Matrix3<f64>, zoom: f64) -> View {
        let to_object = orientation.transpose().cast::<f32>();
        let forward = to_object * vector![0.0, 0.0, 1.0];
        let right = to_object * vector![1.0, 0.0, 0.0];
        let up = to_object * vector![0.0, 1.0, 0.0];

        let extent = dims.map(|d| d as f32);
        let max_dim = extent.max();
        let image_dim = image_dim(dims, zoom);

        let mut near = f32::INFINITY;
        let mut far = f32::NEG_INFINITY;
        for corner in BoundBox::new(point![0.0, 0.0, 0.0], Point3::from(extent)) {
            let d = corner.coords.dot(&forward);
            near = near.min(d);
            far = far.max(d);
        }

        View {
            forward,
            right,
            up,
            center: Point3::from(extent * 0.5),
            reach: extent.norm(),
            pixel_size: max_dim / image_dim as f32,
            image_dim,
            near,
            far,
        }
    }

    pub fn image_dim(&self) -> usize {
        self.image_dim
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.forward
    }

    pub fn ray(&self, x: usize, y: usize) -> Ray {
        let half = 0.5 * self.image_dim as f32;
        let u = (x as f32 + 0.5 - half) * self.pixel_size;
        let v = (half - y as f32 - 0.5) * self.pixel_size;
        let origin = self.center + self.right * u + self.up * v - self.forward * self.reach;
        Ray::new(origin, self.forward)
    }

    /// Position along the view direction, 0 at the front of the volume, 1 at its back
    fn depth(&self, p: &Point3<f32>) -> f32 {
        let span = self.far - self.near;
        if span <= 0.0 {
            return 0.0;
        }
        (p.coords.dot(&self.forward) - self.near) / span
    }
}

/// Side of the square output image, `ceil(zoom × largest side)`
pub fn image_dim(dims: Vector3<usize>, zoom: f64) -> usize {
    ((zoom * dims.max() as f64).ceil() as usize).max(1)
}

/// Lookup tables of one render
pub struct Tables<'a> {
    pub density: &'a [f32; RAMP_SIZE],
    pub gradient: &'a [f32; RAMP_SIZE],
    pub shades: &'a ShadeTable,
}

pub struct RayCaster<'a> {
    volume: &'a ClassifiedVolume,
    // (opacity, shade) of every voxel
    samples: Vec<[f32; 2]>,
    settings: QualitySettings,
    pixel_type: PixelType,
    depth_cue: DepthCue,
    view: View,
}

impl<'a> RayCaster<'a> {
    pub fn new(
        volume: &'a ClassifiedVolume,
        tables: &Tables<'_>,
        settings: QualitySettings,
        pixel_type: PixelType,
        depth_cue: DepthCue,
        view: View,
    ) -> Result<RayCaster<'a>> {
        let mut samples = alloc_vec("voxel opacities", volume.voxels().len(), [0.0, 0.0])?;
        samples
            .iter_mut()
            .zip(volume.voxels())
            .for_each(|(sample, voxel)| {
                let opacity = tables.density[voxel.density as usize]
                    * tables.gradient[voxel.gradient as usize];
                if opacity > 0.0 && opacity >= settings.min_voxel_opacity {
                    *sample = [opacity, tables.shades.shade(voxel.normal)];
                }
            });

        Ok(RayCaster {
            volume,
            samples,
            settings,
            pixel_type,
            depth_cue,
            view,
        })
    }

    /// Cast one ray per pixel, rows split between `threads` workers
    pub fn render(&self, threads: usize, cancel: Option<&AtomicBool>) -> Result<FloatImage> {
        let dim = self.view.image_dim;
        let mut image = FloatImage::new(dim, dim)?;
        for_each_band(&mut image.pixels, dim, threads, |first_row, band| {
            for (row_id, row) in band.chunks_mut(dim).enumerate() {
                check_cancel(cancel)?;
                let y = first_row + row_id;
                for (x, pixel) in row.iter_mut().enumerate() {
                    *pixel = self.collect_light(&self.view.ray(x, y));
                }
            }
            Ok(())
        })?;
        Ok(image)
    }

    pub fn collect_light(&self, ray: &Ray) -> RGBA {
        let (t0, t1) = match self.volume.bound_box().intersect(ray) {
            Some(t) => t,
            None => return color::zero(),
        };
        let t0 = t0.max(0.0);

        let step = self.settings.step;
        let mut color = 0.0;
        let mut opacity = 0.0;

        let mut t = t0 + 0.5 * step;
        while t < t1 {
            let pos = ray.point_from_t(t);
            t += step;

            let [alpha, shade] = self.sample_at(&pos);
            if alpha <= 0.0 {
                continue;
            }
            // opacities are given per voxel length
            let alpha = 1.0 - (1.0 - alpha.min(1.0)).powf(step);
            let shade = match self.pixel_type {
                PixelType::Opacity => 1.0,
                PixelType::Grayscale => shade,
            };
            let cue = self.depth_cue.factor(self.view.depth(&pos));

            color += (1.0 - opacity) * alpha * shade * cue;
            opacity += (1.0 - opacity) * alpha;

            // early ray termination
            if opacity >= self.settings.max_ray_opacity {
                break;
            }
        }
        color::mono(color, opacity)
    }

    /// Trilinear opacity and opacity weighted shade, zero outside of the grid
    fn sample_at(&self, pos: &Point3<f32>) -> [f32; 2] {
        let dims = self.volume.dims();
        let shifted = pos.map(|v| v - 0.5);
        let base = shifted.map(f32::floor);
        let t = shifted - base;

        let mut acc = [0.0; 2];
        for corner in 0..8usize {
            let offset = [corner & 1, (corner >> 1) & 1, (corner >> 2) & 1];
            let mut weight = 1.0;
            let mut index = [0usize; 3];
            let mut inside = true;
            for i in 0..3 {
                let idx = base[i] as isize + offset[i] as isize;
                if idx < 0 || idx >= dims[i] as isize {
                    inside = false;
                    break;
                }
                index[i] = idx as usize;
                weight *= if offset[i] == 1 { t[i] } else { 1.0 - t[i] };
            }
            if !inside || weight == 0.0 {
                continue;
            }
            let sample = self.samples[self.volume.index(index[0], index[1], index[2])];
            acc[0] += weight * sample[0];
            acc[1] += weight * sample[0] * sample[1];
        }
        if acc[0] > 0.0 {
            acc[1] /= acc[0];
        }
        acc
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;
    use crate::common::{axis_rotation, Axis};

    #[test]
    fn view_axes_follow_orientation() {
        let view = View::new(vector![4, 4, 4], &Matrix3::identity(), 1.0);
        assert_eq!(view.forward(), vector![0.0, 0.0, 1.0]);
        assert_eq!(view.image_dim(), 4);

        let rotated = axis_rotation(Axis::Y, std::f64::consts::FRAC_PI_2);
        let view = View::new(vector![4, 4, 4], &rotated, 1.0);
        // rotating the object by +90° around y makes the viewer look along object -x
        assert_relative_eq!(view.forward(), vector![-1.0, 0.0, 0.0], epsilon = 1e-6);
    }

    #[test]
    fn center_ray_hits_center() {
        let view = View::new(vector![4, 4, 4], &Matrix3::identity(), 2.0);
        assert_eq!(view.image_dim(), 8);
        let ray = view.ray(4, 3);
        // pixel centers at ±pixel_size/2 around the volume center
        assert_relative_eq!(ray.origin.x, 2.25, epsilon = 1e-6);
        assert_relative_eq!(ray.origin.y, 2.25, epsilon = 1e-6);
        assert!(ray.origin.z < 0.0);
    }

    #[test]
    fn depth_normalized() {
        let view = View::new(vector![2, 2, 10], &Matrix3::identity(), 1.0);
        assert_relative_eq!(view.depth(&point![1.0, 1.0, 0.0]), 0.0);
        assert_relative_eq!(view.depth(&point![1.0, 1.0, 5.0]), 0.5);
        assert_relative_eq!(view.depth(&point![1.0, 1.0, 10.0]), 1.0);
    }

    #[test]
    fn zoomed_image_dim() {
        assert_eq!(image_dim(vector![10, 3, 7], 1.5), 15);
        assert_eq!(image_dim(vector![10, 3, 7], 0.01), 1);
    }
}
