//! File-based [`ConfigSource`](super::ConfigSource) implementation.
//!
//! YAML is always available through the default feature set; JSON and TOML
//! are gated behind their own features. [`parse_config_str`] is the single
//! place that maps a file extension onto a deserializer, shared by
//! [`FileSource`] and the `validate` subcommand.

pub mod file_source;

pub use file_source::FileSource;

use sha2::{Digest, Sha256};

use crate::config::model::Config;
use crate::error::FerryError;

/// File names probed in the working directory when `--config` is absent.
pub const CANDIDATES: &[&str] = &["ferry.yaml", "ferry.yml", "ferry.json", "ferry.toml"];

/// Parse a config string based on file extension.
pub fn parse_config_str(ext: &str, content: &str, path_display: &str) -> Result<Config, FerryError> {
    let parse_error = |source: Box<dyn std::error::Error + Send + Sync>| FerryError::ConfigParse {
        path: path_display.to_string(),
        source,
    };

    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => {
            // An empty YAML document is `null`, which serde_yml refuses as a map.
            if content.trim().is_empty() {
                return Ok(Config::default());
            }
            serde_yml::from_str(content).map_err(|e| parse_error(Box::new(e)))
        }

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(|e| parse_error(Box::new(e))),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| parse_error(Box::new(e))),

        other => Err(FerryError::UnsupportedFormat(other.to_string())),
    }
}

/// Compute a lowercase hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
