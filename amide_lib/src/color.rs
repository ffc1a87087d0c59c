use nalgebra::{vector, Vector4};

/// Premultiplied color, `w` holds accumulated opacity <0;1>
pub type RGBA = Vector4<f32>;

pub fn new(r: f32, g: f32, b: f32, a: f32) -> RGBA {
    vector![r, g, b, a]
}

pub fn zero() -> RGBA {
    vector![0.0, 0.0, 0.0, 0.0]
}

pub fn mono(v: f32, opacity: f32) -> RGBA {
    vector![v, v, v, opacity]
}

/// Porter-Duff "over", `front` is composited over `back`.
/// Both colors are premultiplied.
pub fn over(front: RGBA, back: RGBA) -> RGBA {
    front + back * (1.0 - front.w)
}

/// Convert channel <0;1> to byte, clamping out of range values
pub fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
