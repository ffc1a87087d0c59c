//! Volume rendering and ROI statistics for medical image datasets.
//!
//! Datasets implement [`volumetric::Dataset`], regions of interest are
//! [`roi::Roi`] values. [`analysis`] computes per-frame statistics of a dataset
//! inside an ROI, [`render`] classifies datasets and ROIs into voxel volumes and
//! ray casts them into raster images.

pub mod analysis;
pub mod color;
pub mod common;
pub mod error;
pub mod render;
pub mod roi;
pub mod test_helpers;
pub mod volumetric;

pub use analysis::{analyze_frame, AnalysisFrameResult};
pub use error::{EngineError, Result};
pub use render::{RasterImage, RenderingContext, RenderingContextList};
pub use roi::Roi;
pub use volumetric::{Dataset, LinearDataset};
