mod dataset;
mod dataset_builder;
mod linear_dataset;

pub use dataset::{Dataset, Dimensions, Interpolation};
pub use dataset_builder::{BuildDataset, DatasetMetadata};
pub use linear_dataset::LinearDataset;
