//! Post-pass entry point.
//!
//! Invoked by the observation scheduler after a pass:
//!
//! ```text
//! meteor-pipeline --id <pass> [--sat <catalog>] [--tle <element lines...>]
//! ```
//!
//! The satellite identity comes from `--sat` when given, otherwise it is
//! extracted from the TLE block. Configuration is read from the file named
//! by `METEOR_CONFIG` (default `config.toml`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meteor_core::{
    lifecycle::{DirectoryLayout, FileLifecycle},
    load_config, resolve_catalog_number, validate_config, CommandToolchain, PassPipeline,
    ProfileRegistry, Toolchain,
};

const USAGE: &str = "usage: meteor-pipeline --id <pass> [--sat <catalog>] [--tle <elements...>]";

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    pass_id: Option<u64>,
    sat: Option<u32>,
    tle: Option<String>,
}

/// Parses the argument list. `--tle` consumes every following word up to
/// the next flag, so element lines can be passed unquoted.
fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--id" => {
                let value = iter.next().ok_or("--id needs a value")?;
                parsed.pass_id = Some(value.parse().map_err(|_| "invalid --id value")?);
            }
            "--sat" => {
                let value = iter.next().ok_or("--sat needs a value")?;
                parsed.sat = Some(value.parse().map_err(|_| "invalid --sat value")?);
            }
            "--tle" => {
                let mut words = Vec::new();
                while let Some(next) = iter.peek() {
                    if next.starts_with("--") {
                        break;
                    }
                    words.push(iter.next().map(String::as_str).unwrap_or_default());
                }
                parsed.tle = Some(words.join(" "));
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
    }

    Ok(parsed)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    let Some(pass_id) = args.pass_id else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let Some(catalog_number) = resolve_catalog_number(args.sat, args.tle.as_deref()) else {
        eprintln!("could not resolve a satellite identifier\n{}", USAGE);
        std::process::exit(2);
    };

    if let Err(e) = run(pass_id, catalog_number).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(pass_id: u64, catalog_number: u32) -> Result<()> {
    let config_path = std::env::var("METEOR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let registry =
        ProfileRegistry::from_config(&config.profiles).context("Failed to build profile registry")?;
    info!("Profile registry loaded ({} satellites)", registry.len());

    let toolchain = CommandToolchain::new(config.toolchain.clone());
    toolchain
        .validate()
        .await
        .context("Toolchain validation failed")?;

    let layout = DirectoryLayout::new(config.station.data_dir.clone());
    let lifecycle = FileLifecycle::new(layout, config.pipeline.disposal);
    lifecycle
        .ensure_layout()
        .await
        .context("Failed to create lifecycle directories")?;

    let pipeline = PassPipeline::new(
        config.pipeline.clone(),
        registry,
        toolchain,
        lifecycle,
        config.station.destination_dir.clone(),
    );

    let report = pipeline
        .process_pass(pass_id, catalog_number)
        .await
        .context("Pass processing failed")?;

    info!(
        processed = report.processed,
        skipped = report.skipped,
        failed = report.failures.len(),
        "pass complete"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
