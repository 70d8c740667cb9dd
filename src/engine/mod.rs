//! Per-frame pipeline: view transform, culling, lighting, clipping, scan
//! conversion, span ordering and picking, driven by [`Engine`].

pub mod clip;
#[allow(clippy::module_inception)]
mod engine;
pub mod frustum;
pub mod lighting;
pub mod pick;
mod pipeline;
pub mod raster;
pub mod spans;
pub mod transform;
pub mod types;

pub use engine::Engine;
pub use pick::{PickTarget, Selection};
pub use transform::{TransformBackend, ViewTransform};
pub use types::{FrameInput, FrameStats, Screen, Viewer};
