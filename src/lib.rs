pub mod cli;
pub mod data;
pub mod geo;
pub mod io_utils;
pub mod job;
pub mod parse;
pub mod project;
pub mod storage;
pub mod summary;
pub mod worker;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("dataset_profiler", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Summarize(args) => summary::execute(&args),
        Commands::Chart(args) => project::execute(&args),
        Commands::Geo(command) => geo::execute(&command),
        Commands::Store(args) => storage::execute_store(&args),
        Commands::Fetch(args) => storage::execute_fetch(&args),
        Commands::Ingest(args) => job::execute(&args),
    }
}
