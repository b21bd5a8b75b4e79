mod cli;
mod platform;

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    if let Err(err) = cli::run(cli) {
        eprintln!("pipeline_app error: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
