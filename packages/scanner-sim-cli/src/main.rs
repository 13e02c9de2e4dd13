use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scanner_sim::EngineConfig;
use scanner_sim_cli::{run_sim, RunSimArgs};

fn main() -> Result<ExitCode> {
    // Logs go to stderr; stdout carries only the summary
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,scanner_sim=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .init();

    let args = RunSimArgs::parse();

    let base = EngineConfig::from_env().context("Failed to load configuration")?;

    let outcome = args
        .engine_config(base)
        .and_then(|config| run_sim(&args, &config));

    match outcome {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            for line in e.to_string().lines() {
                eprintln!("{}", line.red());
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
