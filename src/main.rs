//! Planner entry point: CLI wiring, history loading and report output.

mod cli;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use solar_planner::error::PlannerError;
use solar_planner::io::export::{export_samples_csv, export_sweep_csv, export_trace_csv};
use solar_planner::io::import::load_samples;
use solar_planner::planner::{PlanOutcome, plan, trace_scenario};
use solar_planner::synth::{SynthConfig, generate};

use cli::Cli;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    #[cfg(feature = "api")]
    if cli.serve {
        return serve(cli.port);
    }

    let config = cli.planner_config()?;
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(PlannerError::from(errors).into());
    }

    // Files are planned as of today; synthetic data as of its last hour.
    let (samples, now_ms) = match &cli.samples {
        Some(path) => {
            let samples = load_samples(path)
                .with_context(|| format!("failed to load samples from {}", path.display()))?;
            info!(path = %path.display(), samples = samples.len(), "history loaded");
            (samples, Some(cli.now.unwrap_or_else(|| Utc::now().timestamp_millis())))
        }
        None => {
            let synth = SynthConfig {
                days: cli.demo_days,
                seed: cli.seed,
                ..SynthConfig::default()
            };
            let samples = generate(&synth);
            info!(days = synth.days, seed = synth.seed, "synthetic history generated");
            (samples, cli.now)
        }
    };

    if let Some(path) = &cli.samples_out {
        export_samples_csv(&samples, path)
            .with_context(|| format!("failed to write samples to {}", path.display()))?;
        eprintln!("Samples written to {}", path.display());
    }

    let request = config.to_request(samples, now_ms);
    let errors = request.validate();
    if !errors.is_empty() {
        return Err(PlannerError::from(errors).into());
    }

    let outcome = plan(&request);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{outcome}");
    }

    let PlanOutcome::Ready(report) = &outcome else {
        if cli.sweep_out.is_some() || cli.trace_out.is_some() {
            warn!("not enough history; no CSV output written");
        }
        return Ok(());
    };

    if let Some(path) = &cli.sweep_out {
        export_sweep_csv(
            &report.recommendation.candidates,
            &report.recommendation.thresholds,
            path,
        )
        .with_context(|| format!("failed to write sweep to {}", path.display()))?;
        eprintln!("Sweep written to {}", path.display());
    }

    if let Some(path) = &cli.trace_out {
        match trace_scenario(&request, report, &report.scenarios.pv_plus_battery) {
            Some(steps) => {
                export_trace_csv(&steps, path)
                    .with_context(|| format!("failed to write trace to {}", path.display()))?;
                eprintln!("Trace written to {}", path.display());
            }
            None => warn!("upgrade scenario is measured; no trace available"),
        }
    }

    Ok(())
}

#[cfg(feature = "api")]
fn serve(port: u16) -> Result<()> {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use solar_planner::api::AppState;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    runtime.block_on(solar_planner::api::serve(Arc::new(AppState::default()), addr))?;
    Ok(())
}
