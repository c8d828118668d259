pub mod cli;
pub mod coerce;
pub mod error;
pub mod io_utils;
pub mod load;
pub mod mapping;
pub mod period;
pub mod pipeline;
pub mod preview;
pub mod record;
pub mod schema;
pub mod session;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{cli::Cli, pipeline::Pipeline};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("retail_load", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let encoding = io_utils::resolve_encoding(cli.input_encoding.as_deref())?;
    let pipeline = Pipeline::new(cli.strategy())
        .with_delimiter(cli.delimiter)
        .with_encoding(encoding);

    if cli.dry_run {
        return handle_dry_run(&cli, &pipeline);
    }

    let params = cli
        .connection_params()
        .ok_or_else(|| anyhow!("--database, --user and --password are required"))?;
    info!(
        "Loading '{}' into {}:{}/{} using {}",
        cli.file.display(),
        params.host,
        params.port,
        params.database,
        pipeline.strategy_name()
    );
    let report = pipeline
        .run(&cli.file, &params)
        .with_context(|| format!("Loading {:?}", cli.file))?;
    info!(
        "{} of {} row(s) loaded",
        report.rows_loaded, report.rows_read
    );
    Ok(())
}

fn handle_dry_run(cli: &Cli, pipeline: &Pipeline) -> Result<()> {
    let records = pipeline
        .prepare(&cli.file)
        .with_context(|| format!("Transforming {:?}", cli.file))?;
    print!("{}", preview::render_preview(&records, cli.preview_rows));
    info!(
        "Dry run: {} row(s) ready, database untouched",
        records.len()
    );
    Ok(())
}
