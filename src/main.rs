// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use std::env;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use eventrix::backends::factory::PilotFactory;
use eventrix::config::{load_and_validate_config, UnitRegistry};
use eventrix::engine::{Deployer, DeployerOptions};
use eventrix::utils::signals::wait_for_shutdown_signal;

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {program} <runtime.yaml|runtime.toml>\n       {program} --list-types"
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("eventrix");

    match args.get(1).map(String::as_str) {
        Some("--list-types") => {
            for name in UnitRegistry::with_builtin_units().names() {
                println!("{}", name);
            }
            Ok(())
        }
        Some("--help") | Some("-h") => {
            println!("{}", usage(program));
            Ok(())
        }
        Some(path) if args.len() == 2 => {
            init_logging();
            run(path).await
        }
        _ => bail!(usage(program)),
    }
}

async fn run(config_path: &str) -> Result<()> {
    let cfg = load_and_validate_config(config_path)
        .with_context(|| format!("loading runtime config from {}", config_path))?;

    let registry = Arc::new(UnitRegistry::with_builtin_units());
    let pilot = PilotFactory::from_config(&cfg.pilot).context("building pilot")?;
    pilot
        .connect()
        .await
        .with_context(|| format!("connecting {} pilot", pilot.name()))?;

    let deployer = Deployer::with_options(
        registry,
        Arc::clone(&pilot),
        DeployerOptions::from(&cfg.deployer),
    );

    let mut deployed = 0;
    for deployment in &cfg.deployments {
        // Failures are already logged by the deployer; keep going with the rest.
        if deployer
            .deploy(&deployment.id, &deployment.type_name, deployment.config.clone())
            .await
            .is_ok()
        {
            deployed += 1;
        }
    }
    tracing::info!(
        deployed,
        configured = cfg.deployments.len(),
        "Eventrix running; waiting for shutdown signal"
    );

    let signal = wait_for_shutdown_signal()
        .await
        .context("installing signal handlers")?;
    tracing::info!(signal, "Shutdown requested");

    let shutdown = deployer.shutdown().await;
    if let Err(e) = pilot.disconnect().await {
        tracing::warn!(error = %e, "Pilot disconnect failed");
    }
    shutdown.context("shutting down deployments")?;
    Ok(())
}
