use std::process::ExitCode;

use clap::Parser;
use ferry::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    match ferry::cmd::dispatch(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
