mod capture;
mod config;
mod core;
mod domain;
mod library;
mod session;

use std::process::ExitCode;

use clap::Parser;

use crate::capture::CaptureError;

fn main() -> ExitCode {
    let cli = core::app::Cli::parse();
    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match core::app::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Cancelling a pick is not worth an error message
            if !err
                .downcast_ref::<CaptureError>()
                .is_some_and(CaptureError::is_silent)
            {
                eprintln!("Error: {:#}", err);
            }
            ExitCode::FAILURE
        }
    }
}
