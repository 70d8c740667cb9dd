use std::collections::TryReserveError;

use thiserror::Error;

use crate::world::{MapError, TextureError};

/// Problems reading a [`RenderConfig`](crate::config::RenderConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Errors surfaced by renderer set-up. Per-frame degeneracies never reach
/// this type; they are skipped silently.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error(transparent)]
    Map(#[from] MapError),

    /// Per-frame scratch could not be reserved; rendering cannot start.
    #[error("out of memory reserving {what}")]
    ScratchAllocation {
        what: &'static str,
        #[source]
        source: TryReserveError,
    },
}

impl RenderError {
    pub(crate) fn scratch(what: &'static str) -> impl FnOnce(TryReserveError) -> Self {
        move |source| Self::ScratchAllocation { what, source }
    }
}
