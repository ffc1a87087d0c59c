use nalgebra::{vector, Vector3};

use crate::{
    common::default_threads,
    error::{EngineError, Result},
};

use super::Material;

/// Speed and quality trade-off of the ray caster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    #[default]
    Highest,
    High,
    Fast,
    Fastest,
}

/// Parameters a [`Quality`] level stands for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySettings {
    /// Ray stops once its accumulated opacity reaches this
    pub max_ray_opacity: f32,
    /// Voxels less opaque than this are skipped
    pub min_voxel_opacity: f32,
    /// Sampling distance along the ray, in classified voxels
    pub step: f32,
}

impl Quality {
    pub fn settings(self) -> QualitySettings {
        let (max_ray_opacity, min_voxel_opacity, step) = match self {
            Quality::Highest => (1.0, 0.0, 0.5),
            Quality::High => (0.95, 0.05, 1.0),
            Quality::Fast => (0.9, 0.1, 1.0),
            Quality::Fastest => (0.8, 0.15, 2.0),
        };
        QualitySettings {
            max_ray_opacity,
            min_voxel_opacity,
            step,
        }
    }
}

/// What a pixel holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelType {
    /// Accumulated opacity only, no shading
    #[default]
    Opacity,
    /// Shaded grayscale
    Grayscale,
}

/// Brightness falloff along the ray, `front_factor × exp(−density × depth)`
/// with depth 0 at the front of the volume and 1 at its back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthCue {
    pub enabled: bool,
    pub front_factor: f32,
    pub density: f32,
}

impl Default for DepthCue {
    fn default() -> Self {
        DepthCue {
            enabled: false,
            front_factor: 1.0,
            density: 1.0,
        }
    }
}

impl DepthCue {
    pub fn factor(&self, depth: f32) -> f32 {
        if self.enabled {
            self.front_factor * (-self.density * depth).exp()
        } else {
            1.0
        }
    }
}

/// Options fixed for the lifetime of a rendering session
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Largest side of a classified volume, in voxels
    pub max_dim: usize,
    /// Worker threads for ray casting and classification
    pub threads: usize,
    /// Direction towards the light in view space
    pub light: Vector3<f64>,
    pub material: Material,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            max_dim: 256,
            threads: default_threads(),
            light: vector![0.0, 0.0, -1.0],
            material: Material::default(),
        }
    }
}

impl RenderOptions {
    pub fn builder() -> RenderOptionsBuilder {
        RenderOptionsBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct RenderOptionsBuilder {
    max_dim: Option<usize>,
    threads: Option<usize>,
    light: Option<Vector3<f64>>,
    material: Option<Material>,
}

impl RenderOptionsBuilder {
    pub fn max_dim(mut self, max_dim: usize) -> Self {
        self.max_dim = Some(max_dim);
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn light_direction(mut self, light: Vector3<f64>) -> Self {
        self.light = Some(light);
        self
    }

    pub fn material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    /// Validate and build
    pub fn build(self) -> Result<RenderOptions> {
        let options = self.build_unchecked();
        if options.max_dim == 0 {
            return Err(EngineError::InvalidArgument("max_dim must be positive".into()));
        }
        if options.threads == 0 {
            return Err(EngineError::InvalidArgument("threads must be positive".into()));
        }
        if !options.light.iter().all(|v| v.is_finite()) || options.light.norm() == 0.0 {
            return Err(EngineError::InvalidArgument(format!(
                "Invalid light direction {:?}",
                options.light
            )));
        }
        Ok(options)
    }

    /// Missing fields take their defaults, nothing is checked
    pub fn build_unchecked(self) -> RenderOptions {
        let default = RenderOptions::default();
        RenderOptions {
            max_dim: self.max_dim.unwrap_or(default.max_dim),
            threads: self.threads.unwrap_or(default.threads),
            light: self.light.unwrap_or(default.light),
            material: self.material.unwrap_or(default.material),
        }
    }
}
