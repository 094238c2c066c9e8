//! Async file-based config source with SHA-256 versioning.
//!
//! [`FileSource`] reads the file through Tokio, picks the deserializer from
//! the extension, validates the result, and hashes the raw contents so
//! `/health` can report which revision of the file is running.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{parse_config_str, sha256_hex};
use crate::config::model::Config;
use crate::config::validation::validate;
use crate::config::{ConfigSource, ConfigVersion};
use crate::error::FerryError;

pub struct FileSource {
    path: PathBuf,
    ext: String,
    name: &'static str,
}

impl FileSource {
    /// Build a source for `path`, rejecting extensions no enabled feature
    /// can parse before any IO happens.
    pub fn new(path: &Path) -> Result<Self, FerryError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let name = match ext.as_str() {
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => "yaml",
            #[cfg(feature = "json")]
            "json" => "json",
            #[cfg(feature = "toml")]
            "toml" => "toml",
            other => return Err(FerryError::UnsupportedFormat(other.to_string())),
        };

        Ok(Self {
            path: path.to_path_buf(),
            ext,
            name,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_content(&self) -> Result<String, FerryError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FerryError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                FerryError::Io(e)
            }
        })
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn load(&self) -> Result<(Config, ConfigVersion), FerryError> {
        let content = self.read_content().await?;
        let config = parse_config_str(&self.ext, &content, &self.path.display().to_string())?;

        if let Err(errors) = validate(&config) {
            return Err(FerryError::ConfigValidation { errors });
        }

        let hash = sha256_hex(content.as_bytes());
        Ok((config, ConfigVersion::Hash(hash)))
    }
}
