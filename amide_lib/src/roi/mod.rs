//! Region of interest geometry and the membership predicates shared by
//! analysis and rendering.

mod mask;
mod predicate;
mod roi_geometry;

pub use mask::VoxelMask;
pub use predicate::{
    isocontour_contains, point_in_box, point_in_ellipsoid, point_in_elliptic_cylinder,
    RoiPredicate, ShapePredicate,
};
pub use roi_geometry::{Roi, RoiShape};
