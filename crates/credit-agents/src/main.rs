//! `credit-agents` binary.
//!
//! ```bash
//! # HTTP service on CREDIT_BIND_ADDR (default 0.0.0.0:8000)
//! CREDIT_ORACLE_API_KEY=... credit-agents serve
//!
//! # One-off evaluations from a JSON request file
//! credit-agents evaluate-group team.json
//! credit-agents evaluate member.json --metrics
//!
//! # Probe the oracle endpoint
//! credit-agents check
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use credit_agents::api::{GroupEvaluationRequest, SingleEvaluationRequest};
use credit_agents::telemetry::EvaluationMetrics;
use credit_agents::{oracle, server, CreditConfig, EvaluationService, RigOracle};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file (environment variables still take precedence)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Bind address (overrides CREDIT_BIND_ADDR)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Evaluate a whole team from a JSON request file
    EvaluateGroup {
        file: PathBuf,
        /// Print run telemetry to stderr
        #[arg(long, default_value_t = false)]
        metrics: bool,
    },
    /// Evaluate a single contribution from a JSON request file
    Evaluate {
        file: PathBuf,
        /// Print run telemetry to stderr
        #[arg(long, default_value_t = false)]
        metrics: bool,
    },
    /// Check that the oracle endpoint is reachable
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = Arc::new(CreditConfig::load(args.config.as_deref())?);
    info!(
        model = %config.oracle.model,
        base_url = %config.oracle.base_url,
        timeout_secs = config.oracle.timeout.as_secs(),
        "Configuration loaded"
    );

    match args.command {
        Command::Check => check(&config).await,
        Command::Serve { bind } => {
            let service = build_service(&config)?;
            let bind = bind.unwrap_or_else(|| config.bind_addr.clone());
            server::serve(&bind, service).await
        }
        Command::EvaluateGroup { file, metrics } => {
            let request: GroupEvaluationRequest = read_request(&file)?;
            let out = build_service(&config)?.evaluate_group(request).await?;
            emit(&out.response, metrics.then_some(&out.metrics))
        }
        Command::Evaluate { file, metrics } => {
            let request: SingleEvaluationRequest = read_request(&file)?;
            let out = build_service(&config)?.evaluate_single(request).await?;
            emit(&out.response, metrics.then_some(&out.metrics))
        }
    }
}

fn build_service(config: &Arc<CreditConfig>) -> Result<EvaluationService> {
    let oracle = Arc::new(RigOracle::from_config(&config.oracle)?);
    Ok(EvaluationService::new(oracle, Arc::clone(config)))
}

async fn check(config: &CreditConfig) -> Result<()> {
    if oracle::check_endpoint(&config.oracle).await {
        info!(base_url = %config.oracle.base_url, "Oracle endpoint reachable");
        Ok(())
    } else {
        error!(base_url = %config.oracle.base_url, "Oracle endpoint unreachable");
        anyhow::bail!("oracle endpoint {} is not reachable", config.oracle.base_url)
    }
}

fn read_request<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid request JSON in {}", path.display()))
}

fn emit<T: Serialize>(response: &T, metrics: Option<&EvaluationMetrics>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    if let Some(metrics) = metrics {
        eprintln!("{}", serde_json::to_string_pretty(metrics)?);
    }
    Ok(())
}
