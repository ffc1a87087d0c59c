//! Normal encoding and the per-normal shade table

use nalgebra::{vector, Matrix3, Vector2, Vector3};

/// Side of the octahedral normal grid
pub const NORMAL_SIDE: usize = 64;

/// Number of normal codes, code 0 is reserved for "no gradient"
pub const NORMAL_COUNT: usize = NORMAL_SIDE * NORMAL_SIDE + 1;

/// Code of a zero length normal
pub const NULL_NORMAL: u16 = 0;

fn sign(v: f64) -> f64 {
    if v >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Quantize a direction onto the octahedral grid.
///
/// Directions shorter than `1e-9` encode to [`NULL_NORMAL`].
pub fn encode_normal(n: &Vector3<f64>) -> u16 {
    let l1 = n.x.abs() + n.y.abs() + n.z.abs();
    if l1 < 1e-9 {
        return NULL_NORMAL;
    }
    let mut p = vector![n.x / l1, n.y / l1];
    if n.z < 0.0 {
        p = vector![(1.0 - p.y.abs()) * sign(p.x), (1.0 - p.x.abs()) * sign(p.y)];
    }

    let side = (NORMAL_SIDE - 1) as f64;
    let to_grid = |v: f64| ((v + 1.0) * 0.5 * side).round().clamp(0.0, side) as usize;
    let code = 1 + to_grid(p.y) * NORMAL_SIDE + to_grid(p.x);
    code as u16
}

/// Unit direction of a normal code, zero vector for [`NULL_NORMAL`]
pub fn decode_normal(code: u16) -> Vector3<f64> {
    if code == NULL_NORMAL || code as usize >= NORMAL_COUNT {
        return Vector3::zeros();
    }
    let index = code as usize - 1;
    let side = (NORMAL_SIDE - 1) as f64;
    let from_grid = |i: usize| i as f64 / side * 2.0 - 1.0;
    let p = Vector2::new(from_grid(index % NORMAL_SIDE), from_grid(index / NORMAL_SIDE));

    let z = 1.0 - p.x.abs() - p.y.abs();
    let (x, y) = if z < 0.0 {
        ((1.0 - p.y.abs()) * sign(p.x), (1.0 - p.x.abs()) * sign(p.y))
    } else {
        (p.x, p.y)
    };
    vector![x, y, z].normalize()
}

/// Phong coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            ambient: 0.25,
            diffuse: 0.65,
            specular: 0.1,
            shininess: 10.0,
        }
    }
}

/// Brightness of every normal code for one orientation.
pub struct ShadeTable {
    shades: Vec<f32>,
}

impl ShadeTable {
    /// `light` is the direction towards the light in view space, the viewer looks along +z.
    /// `orientation` maps object to view space.
    pub fn new(
        material: &Material,
        light: &Vector3<f64>,
        orientation: &Matrix3<f64>,
    ) -> ShadeTable {
        let to_object = orientation.transpose();
        let light = (to_object * light).try_normalize(1e-12).unwrap_or_else(Vector3::zeros);
        let to_viewer = to_object * vector![0.0, 0.0, -1.0];
        let half = (light + to_viewer)
            .try_normalize(1e-12)
            .unwrap_or(to_viewer);

        let mut shades = Vec::with_capacity(NORMAL_COUNT);
        shades.push((material.ambient + material.diffuse).clamp(0.0, 1.0));
        for code in 1..NORMAL_COUNT {
            let n = decode_normal(code as u16);
            let diffuse = n.dot(&light).max(0.0) as f32;
            let specular = (n.dot(&half).max(0.0) as f32).powf(material.shininess);
            let shade =
                material.ambient + material.diffuse * diffuse + material.specular * specular;
            shades.push(shade.clamp(0.0, 1.0));
        }
        ShadeTable { shades }
    }

    pub fn shade(&self, normal: u16) -> f32 {
        self.shades.get(normal as usize).copied().unwrap_or(0.0)
    }
}
