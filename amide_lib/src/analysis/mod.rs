//! ROI statistics over dataset frames
//!
//! The voxel walk ([`VoxelWeights`]) is shared by every ROI shape, only the
//! [`ShapePredicate`](crate::roi::ShapePredicate) differs.

mod analyzer;
mod frame_result;
mod options;
mod voxel_weights;

pub use analyzer::{
    analyze_all_frames, analyze_frame, analyze_frame_with, analyze_frames, analyze_gate,
    two_pass_variance, welford_variance, WeightedWelford,
};
pub use frame_result::AnalysisFrameResult;
pub use options::{AnalysisOptions, VarianceMethod, ANALYSIS_GRANULARITY};
pub use voxel_weights::{intersection_region, VoxelRegion, VoxelWeights};
