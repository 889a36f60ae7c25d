mod cli;
mod config;
mod platform;

use std::process::ExitCode;

use clap::Parser;
use client_logging::{client_error, client_info};

use crate::cli::Cli;
use crate::config::ClientConfig;
use crate::platform::{app, logging};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match ClientConfig::resolve(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    logging::initialize(config.log_destination, config.level());
    client_info!(
        "Using configuration {:?} against {}",
        cli.config,
        config.api_url
    );

    match app::run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            client_error!("Command failed: {err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
