//! govdata - Query school statistics through a stale-tolerant cache
//!
//! Fetches one or more datasets from the schools-data API, serving cached
//! snapshots within the freshness window and falling back to the last good
//! snapshot when the upstream is down.

use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use govdata::app::{all_available, App, DatasetReport};
use govdata::cli::Cli;
use govdata::config::Config;
use govdata::data::SchoolsData;

/// Installs the stderr log subscriber; `RUST_LOG` takes precedence over `default_filter`
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints one round of results as pretty JSON on stdout
fn print_reports(app: &App, reports: &[DatasetReport]) -> Result<(), serde_json::Error> {
    let output = serde_json::to_string_pretty(&app.render(reports))?;
    println!("{}", output);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_filter());

    let watch_interval = cli.watch_interval()?;

    // Layer CLI flags over file and environment settings
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let data = SchoolsData::from_config(&config)?;
    let app = App::new(data, cli.dataset_list(), cli.params.clone()).with_summary(cli.summary);

    let Some(interval) = watch_interval else {
        let reports = app.load_all().await;
        print_reports(&app, &reports)?;
        return Ok(if all_available(&reports) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    };

    info!(interval_secs = interval.as_secs(), "watching datasets");
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let reports = app.load_all().await;
                print_reports(&app, &reports)?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, exiting");
                break;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
