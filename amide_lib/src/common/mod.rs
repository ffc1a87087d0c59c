mod bound_box;
mod parallel;
mod ray;
mod time_interval;
mod transform;
mod value_range;

pub use bound_box::{box_corners, BoundBox, BoundBoxIterator};
pub use parallel::{check_cancel, default_threads, for_each_band};
pub use ray::Ray;
pub use time_interval::TimeInterval;
pub use transform::{
    axis_rotation, is_orthonormal, orthonormalize, AffineMap, Axis, Transform,
    ORTHONORMAL_TOLERANCE,
};
pub use value_range::ValueRange;
