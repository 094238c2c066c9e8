//! `ferry init` — generate a starter configuration file.
//!
//! Writes a YAML, JSON, or TOML config with either the few values most
//! deployments touch, or every option with its default.

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::error::FerryError;

pub fn execute(args: &InitArgs) -> Result<(), FerryError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("ferry.{}", args.format.extension())));

    if output.exists() {
        return Err(FerryError::FileExists { path: output });
    }

    std::fs::write(&output, template(&args.format, args.full))?;
    println!("Created {}", output.display());
    Ok(())
}

#[must_use]
pub const fn template(format: &ConfigFormat, full: bool) -> &'static str {
    match (format, full) {
        (ConfigFormat::Yaml, false) => YAML_MINIMAL,
        (ConfigFormat::Yaml, true) => YAML_FULL,
        (ConfigFormat::Json, false) => JSON_MINIMAL,
        (ConfigFormat::Json, true) => JSON_FULL,
        (ConfigFormat::Toml, false) => TOML_MINIMAL,
        (ConfigFormat::Toml, true) => TOML_FULL,
    }
}

const YAML_MINIMAL: &str = r#"# Ferry config

proxy:
  path: "/proxy"

pool:
  max_total: 1000
  max_per_host: 100
"#;

const YAML_FULL: &str = r#"# Ferry config
#
# All values shown are defaults.

proxy:
  # Ingress path; callers send `<path>?url=<absolute target URL>`
  path: "/proxy"
  # Value of the Proxied-By header added to every relayed response
  proxied_by: "ferry"
  # X-Forwarded-For policy: "overwrite" (caller address only) or
  # "append" (inbound chain, then caller address)
  forwarded_for: "overwrite"
  # Send the target's authority as Host instead of the caller's
  rewrite_host: true

pool:
  # Concurrent outbound connections, across all targets
  max_total: 1000
  # Concurrent outbound connections per scheme://host:port
  max_per_host: 100
  # Idle pooled connections older than this are not reused
  validate_after_inactivity_ms: 10000
  # Max wait for a free connection slot
  acquire_timeout_ms: 5000
  # TCP + TLS connect timeout
  connect_timeout_ms: 10000
  # Max silence while waiting for headers or body data
  socket_timeout_ms: 10000
"#;

const JSON_MINIMAL: &str = r#"{
  "proxy": {
    "path": "/proxy"
  },
  "pool": {
    "max_total": 1000,
    "max_per_host": 100
  }
}
"#;

const JSON_FULL: &str = r#"{
  "proxy": {
    "path": "/proxy",
    "proxied_by": "ferry",
    "forwarded_for": "overwrite",
    "rewrite_host": true
  },
  "pool": {
    "max_total": 1000,
    "max_per_host": 100,
    "validate_after_inactivity_ms": 10000,
    "acquire_timeout_ms": 5000,
    "connect_timeout_ms": 10000,
    "socket_timeout_ms": 10000
  }
}
"#;

const TOML_MINIMAL: &str = r#"# Ferry config

[proxy]
path = "/proxy"

[pool]
max_total = 1000
max_per_host = 100
"#;

const TOML_FULL: &str = r#"# Ferry config
#
# All values shown are defaults.

[proxy]
# Ingress path; callers send `<path>?url=<absolute target URL>`
path = "/proxy"
# Value of the Proxied-By header added to every relayed response
proxied_by = "ferry"
# "overwrite" or "append"
forwarded_for = "overwrite"
rewrite_host = true

[pool]
max_total = 1000
max_per_host = 100
validate_after_inactivity_ms = 10000
acquire_timeout_ms = 5000
connect_timeout_ms = 10000
socket_timeout_ms = 10000
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::Config;
    use crate::config::sources::parse_config_str;
    use crate::config::validation::validate;

    fn assert_defaults(ext: &str, content: &str) {
        let config = parse_config_str(ext, content, "template").unwrap();
        assert!(validate(&config).is_ok());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn yaml_templates_match_defaults() {
        assert_defaults("yaml", template(&ConfigFormat::Yaml, false));
        assert_defaults("yaml", template(&ConfigFormat::Yaml, true));
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_templates_match_defaults() {
        assert_defaults("json", template(&ConfigFormat::Json, false));
        assert_defaults("json", template(&ConfigFormat::Json, true));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn toml_templates_match_defaults() {
        assert_defaults("toml", template(&ConfigFormat::Toml, false));
        assert_defaults("toml", template(&ConfigFormat::Toml, true));
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("ferry.yaml");
        std::fs::write(&output, "").unwrap();

        let args = InitArgs {
            format: ConfigFormat::Yaml,
            output: Some(output),
            full: false,
        };
        assert!(matches!(execute(&args), Err(FerryError::FileExists { .. })));
    }
}
