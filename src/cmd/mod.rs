//! Subcommand handlers, one submodule each.

pub mod health;
pub mod init;
pub mod run;
pub mod validate;

use std::path::Path;

use crate::cli::{Cli, Commands};
use crate::config::sources::CANDIDATES;
use crate::error::FerryError;

pub async fn dispatch(cli: Cli) -> Result<(), FerryError> {
    let Some(command) = cli.command else {
        println!("{}", welcome(detected_config()));
        return Ok(());
    };

    match command {
        Commands::Run(args) => run::execute(*args).await,
        Commands::Init(args) => init::execute(&args),
        Commands::Validate(args) => validate::execute(&args),
        Commands::Health(args) => health::execute(args).await,
    }
}

fn detected_config() -> Option<&'static str> {
    CANDIDATES.iter().copied().find(|name| Path::new(name).exists())
}

fn welcome(detected: Option<&str>) -> String {
    let version = env!("CARGO_PKG_VERSION");
    let config_line = detected.map_or_else(
        || "No config file here; `ferry run` uses built-in defaults.".to_string(),
        |name| format!("Found {name}; `ferry run` will load it."),
    );
    format!(
        "\n  ferry v{version} \u{2014} HTTP forwarding proxy\n\n  \
         {config_line}\n\n    \
         ferry run                         Start on :3000\n    \
         ferry init                        Generate a starter config\n    \
         ferry validate                    Check the config without starting\n    \
         ferry --help                      See all commands and options\n"
    )
}
