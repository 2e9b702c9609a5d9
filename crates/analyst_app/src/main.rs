mod app;
mod cli;
mod config;
mod effects;
mod history;
mod report;
mod status;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;
use crate::config::AppConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli(&cli);

    analyst_logging::initialize(config.log_destination(), config.log_level(cli.verbose));

    if cli.history {
        history::print_history(&config.report_dir);
        return Ok(());
    }
    let job = cli.job()?;
    app::run(&config, job)
}
