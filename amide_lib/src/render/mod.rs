//! Volume rendering of datasets and ROIs
//!
//! Objects are resampled into classified volumes ([`classify`]), rendered by
//! ray casting in a [`RenderingContext`] and composited by a [`RenderingContextList`].

mod classifier;
mod context;
mod context_list;
mod image;
mod raycast;
mod render_front;
mod render_options;
mod shading;
mod transfer_function;

pub use classifier::{
    classify, ClassifiedVolume, ClassifyParams, ClassifyStamp, RenderSource, RenderingVoxel,
};
pub use context::RenderingContext;
pub use context_list::RenderingContextList;
pub use image::{FloatImage, RasterImage};
pub use raycast::{image_dim, View};
pub use render_front::{RendererFront, RendererMessage};
pub use render_options::{
    DepthCue, PixelType, Quality, QualitySettings, RenderOptions, RenderOptionsBuilder,
};
pub use shading::{
    decode_normal, encode_normal, Material, ShadeTable, NORMAL_COUNT, NORMAL_SIDE, NULL_NORMAL,
};
pub use transfer_function::{CurveType, Ramp, RAMP_SIZE};
