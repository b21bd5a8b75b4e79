use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use pipeline_core::PluginType;

use crate::platform::app::{App, BatchPlan};
use crate::platform::config::{AppConfig, ConfigOverrides};
use crate::platform::logging::{self, LogDestination};

/// Terminal client for the data pipeline API.
#[derive(Debug, Parser)]
#[command(name = "pipeline_app")]
#[command(about = "Log in to the data pipeline API, run a plugin, fetch the result", long_about = None)]
pub struct Cli {
    /// RON config file; flags below override its values.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API origin, e.g. http://localhost:8000.
    #[arg(long, global = true)]
    pub origin: Option<String>,

    #[arg(long, global = true)]
    pub username: Option<String>,

    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Directory downloaded artifacts are written to.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Also write logs to ./pipeline.log.
    #[arg(long, global = true)]
    pub log_file: bool,

    /// Keep terminal logging off (only with --log-file).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Interactive prompt (default).
    Interactive,

    /// Log in, submit once, and exit.
    Run {
        /// Plugin to run: csv or github.
        #[arg(long)]
        plugin: PluginType,

        /// Repository URL for the github plugin.
        #[arg(long)]
        repo_url: Option<String>,

        /// File to upload for the csv plugin.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Save the generated artifact to the output directory.
        #[arg(long)]
        download: bool,
    },
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_origin: self.origin.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            output_dir: self.output_dir.clone(),
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    logging::initialize(
        LogDestination::from_flags(cli.log_file, cli.quiet),
        cli.log_level(),
    );

    let config = AppConfig::load(cli.config.as_deref(), cli.overrides())?;
    let stdout = io::stdout();

    match cli.command.unwrap_or(CliCommand::Interactive) {
        CliCommand::Interactive => {
            let mut app = App::new(&config, stdout.lock())?;
            app.run_interactive(io::stdin().lock())
        }
        CliCommand::Run {
            plugin,
            repo_url,
            file,
            download,
        } => {
            let mut app = App::new(&config, stdout.lock())?;
            app.run_batch(BatchPlan {
                plugin_type: plugin,
                repo_url,
                file,
                download,
            })
        }
    }
}
