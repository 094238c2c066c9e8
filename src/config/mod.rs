//! Static startup configuration.
//!
//! Defines the [`ConfigSource`] trait for pluggable file formats and the
//! [`ConfigVersion`] digest reported by `/health`. Configuration is loaded
//! once before the server starts and never reloaded; pool bounds and
//! timeouts are fixed for the lifetime of the process.

pub mod model;
pub mod sources;
pub mod validation;

use async_trait::async_trait;

use crate::error::FerryError;
use model::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigVersion {
    /// SHA-256 of the file contents.
    Hash(String),
    /// No file was found; built-in defaults are in effect.
    Defaults,
}

impl ConfigVersion {
    /// Short form for display: the first 8 hex digits, or `defaults`.
    #[must_use]
    pub fn short(&self) -> &str {
        match self {
            Self::Hash(h) => h.get(..8).unwrap_or(h),
            Self::Defaults => "defaults",
        }
    }
}

// async_trait keeps ConfigSource usable as `dyn ConfigSource`; native async fn
// in traits (Rust 1.75+) does not support dyn dispatch.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<(Config, ConfigVersion), FerryError>;
}
