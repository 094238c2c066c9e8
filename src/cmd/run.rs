//! `ferry run` — start the proxy server.
//!
//! Loads the static configuration (explicit file, auto-detected file, or
//! built-in defaults), applies CLI overrides, builds the process-wide
//! upstream pool, and serves until SIGTERM / Ctrl+C. The pool is closed
//! once the server has drained.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::RunArgs;
use crate::config::model::Config;
use crate::config::sources::{FileSource, CANDIDATES};
use crate::config::{ConfigSource, ConfigVersion};
use crate::error::FerryError;
use crate::logging;
use crate::server::{self, AppState};

pub async fn execute(args: RunArgs) -> Result<(), FerryError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    #[cfg(feature = "sentry-integration")]
    let _sentry_guard = args
        .sentry_dsn
        .as_ref()
        .map(|dsn| crate::sentry_integration::init(dsn, args.sentry_environment.as_deref()));

    let (mut config, version, source_name) = load_config(args.config.as_deref()).await?;
    args.apply_overrides(&mut config);

    let state = Arc::new(AppState::new(config, source_name, version)?);
    let router = server::build_router(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let pool = state.pool.config();
    tracing::info!(
        addr = %addr,
        path = %state.proxy.path,
        config = %state.config_source,
        max_total = pool.max_total,
        max_per_host = pool.max_per_host,
        connect_timeout_ms = pool.connect_timeout_ms,
        socket_timeout_ms = pool.socket_timeout_ms,
        "ferry started"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

    state.pool.close();
    tracing::info!("ferry stopped");
    Ok(())
}

/// Resolve the config: `--config` if given, else the first file found
/// among [`CANDIDATES`], else built-in defaults.
pub async fn load_config(
    explicit: Option<&Path>,
) -> Result<(Config, ConfigVersion, String), FerryError> {
    let source = match explicit {
        Some(path) => Some(FileSource::new(path)?),
        None => auto_detect().await?,
    };

    match source {
        Some(source) => {
            let (config, version) = source.load().await?;
            tracing::info!(
                path = %source.path().display(),
                version = version.short(),
                "config loaded"
            );
            Ok((config, version, source.name().to_string()))
        }
        None => {
            tracing::info!("no config file found, using built-in defaults");
            Ok((Config::default(), ConfigVersion::Defaults, "defaults".into()))
        }
    }
}

async fn auto_detect() -> Result<Option<FileSource>, FerryError> {
    for name in CANDIDATES {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            // A candidate whose format is not compiled in is skipped, not fatal.
            match FileSource::new(&path) {
                Ok(source) => return Ok(Some(source)),
                Err(FerryError::UnsupportedFormat(ext)) => {
                    tracing::warn!(path = %path.display(), format = %ext, "config format not enabled in this build, skipping");
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(None)
}
