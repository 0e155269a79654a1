use clap::Parser;
use downsort::cli::{self, Cli};
use downsort::output::OutputFormatter;
use log::debug;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Cli::parse();

    let level = match args.verbose {
        _ if args.quiet => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    debug!("Starting downsort v{}", env!("CARGO_PKG_VERSION"));

    match cli::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}
