//! Benchmark categories by engine part

pub mod analysis;
pub mod render;
