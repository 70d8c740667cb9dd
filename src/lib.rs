//! Software renderer for block-based 3-D spots.
//!
//! * [`world`] holds the loaded spot: grid, blocks, lights, popups, textures.
//! * [`engine`] turns a spot and a camera into spans or screen polygons.
//! * [`renderer`] fills spans on the CPU or forwards polygons to a GPU.

pub mod config;
pub mod engine;
pub mod error;
pub mod renderer;
pub mod world;

pub use config::RenderConfig;
pub use error::{ConfigError, RenderError};
