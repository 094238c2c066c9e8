//! `ferry validate` — check a configuration file without starting.
//!
//! Uses the same candidate list as `ferry run` when no file is given, so
//! `ferry validate` checks exactly what `ferry run` would load.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::model::Config;
use crate::config::sources::{parse_config_str, sha256_hex, CANDIDATES};
use crate::config::validation;
use crate::error::{FerryError, ValidationError};

#[derive(Debug, Serialize)]
struct Finding<'a> {
    section: &'a str,
    field: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'a str>,
}

impl<'a> From<&'a ValidationError> for Finding<'a> {
    fn from(e: &'a ValidationError) -> Self {
        Self {
            section: &e.section,
            field: &e.field,
            message: &e.message,
            suggestion: e.suggestion.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    valid: bool,
    file: String,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<&'a Config>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<Finding<'a>>,
}

pub fn execute(args: &ValidateArgs) -> Result<(), FerryError> {
    let path = resolve_path(args.config.as_deref())?;
    let content = std::fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FerryError::ConfigFileNotFound { path: path.clone() }
        } else {
            FerryError::Io(e)
        }
    })?;

    let display = path.display().to_string();
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let config = parse_config_str(ext, &content, &display)?;
    let digest = sha256_hex(content.as_bytes());
    let findings = validation::validate(&config).err().unwrap_or_default();

    let report = Report {
        valid: findings.is_empty(),
        file: display.clone(),
        version: digest.get(..8).unwrap_or(&digest).to_string(),
        config: findings.is_empty().then_some(&config),
        errors: findings.iter().map(Finding::from).collect(),
    };

    match args.format {
        ValidateFormat::Json => {
            let rendered = serde_json::to_string_pretty(&report).map_err(|e| {
                FerryError::ConfigParse {
                    path: display.clone(),
                    source: Box::new(e),
                }
            })?;
            println!("{rendered}");
        }
        ValidateFormat::Text if report.valid => {
            println!(
                "\u{2713} {} [{}]",
                validation::format_validation_report(&display, &config),
                report.version
            );
        }
        ValidateFormat::Text => {
            eprintln!("\u{2717} {display} has {} errors\n", findings.len());
            for finding in &findings {
                eprintln!("{finding}");
            }
        }
    }

    if findings.is_empty() {
        Ok(())
    } else {
        Err(FerryError::ConfigValidation { errors: findings })
    }
}

/// The given file, else the first candidate present in the working directory.
fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, FerryError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| FerryError::ConfigFileNotFound {
            path: PathBuf::from(CANDIDATES[0]),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(path: PathBuf) -> ValidateArgs {
        ValidateArgs {
            config: Some(path),
            format: ValidateFormat::Json,
        }
    }

    #[test]
    fn valid_file_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferry.yaml");
        std::fs::write(&path, "pool:\n  max_total: 10\n  max_per_host: 5\n").unwrap();

        assert!(execute(&args(path)).is_ok());
    }

    #[test]
    fn invalid_file_returns_every_finding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferry.yaml");
        std::fs::write(&path, "proxy:\n  path: forward\npool:\n  max_total: 0\n").unwrap();

        let Err(FerryError::ConfigValidation { errors }) = execute(&args(path)) else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].suggestion.as_deref(), Some("did you mean '/forward'?"));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = execute(&args(PathBuf::from("/nonexistent/ferry.yaml")));
        assert!(matches!(result, Err(FerryError::ConfigFileNotFound { .. })));
    }
}
