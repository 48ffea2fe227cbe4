//! BreedLens Server
//!
//! HTTP upload server and one-shot CLI for the gated animal breed
//! classification pipeline. Uploads are decoded once, optionally gated by a
//! secondary human-detector model, classified through a hosted pretrained
//! model, and rendered as a top-N table with CSV export.

use anyhow::Result;
use breedlens_core::Credential;
use breedlens_inference::credential;
use breedlens_server::cli::{CheckImageArgs, Cli, Commands, StartArgs};
use breedlens_server::config::ServerConfig;
use breedlens_server::server::run_server;
use breedlens_server::state::{build_pipeline, AppState};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start(args) => start(args).await,
        Commands::CheckImage(args) => check_image(args).await,
    }
}

async fn start(args: StartArgs) -> Result<()> {
    init_tracing(args.verbose);

    let config = ServerConfig::load(&args.config, &args.overrides())?;
    info!("Configuration loaded");
    info!("Primary model: {}", config.primary_model);
    info!("Gate: {:?}", config.gate);

    let credential = resolve_credential(&config, args.prompt_token)?;
    if credential.is_none() {
        warn!(
            "no credential resolved; uploads will be rejected until {} is set",
            credential::TOKEN_ENV_VAR
        );
    }

    let metrics_handle = init_metrics()?;

    let pipeline = build_pipeline(&config, credential.as_ref())?;
    let state = AppState::new(config, pipeline, credential.is_some());

    let addr: SocketAddr = format!("{}:{}", args.address, args.port).parse()?;

    println!();
    println!("  BreedLens — animal breed classification");
    println!("  Listening on http://{addr}");
    println!("  POST an image to http://{addr}/api/classify");
    println!();

    run_server(state, Some(metrics_handle), addr, shutdown_signal()).await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn check_image(args: CheckImageArgs) -> Result<()> {
    init_tracing(args.verbose);

    let config = ServerConfig::load(&args.config, &args.overrides())?;
    let credential = resolve_credential(&config, args.prompt_token)?;

    let pipeline = build_pipeline(&config, credential.as_ref())?;
    let bytes = std::fs::read(&args.image)?;

    let run = pipeline.process(bytes).await;
    println!("{}", run.message);

    for row in run.report.rows() {
        println!("  {} - {:.2}%", row.label, row.confidence_pct);
    }

    if let Some(path) = &args.export {
        std::fs::write(path, run.report.to_csv()?)?;
        println!("Exported {} rows to {}", run.report.len(), path.display());
    }

    if !run.succeeded() && run.state() != breedlens_pipeline::PipelineState::Suppressed {
        std::process::exit(1);
    }

    Ok(())
}

fn resolve_credential(config: &ServerConfig, allow_prompt: bool) -> Result<Option<Credential>> {
    let resolved = credential::resolve(config.secrets_file.as_deref())?;
    if let Some((credential, _source)) = resolved {
        return Ok(Some(credential));
    }

    if allow_prompt {
        if let Some((credential, _source)) = credential::prompt_for_token()? {
            return Ok(Some(credential));
        }
    }

    Ok(None)
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown signal received, stopping server...");
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("breedlens=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("breedlens=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!("breedlens_uploads_total", "Total number of uploads received");
    metrics::describe_counter!(
        "breedlens_outcomes_total",
        "Pipeline outcomes by terminal state"
    );
    metrics::describe_histogram!(
        "breedlens_pipeline_latency_ms",
        metrics::Unit::Milliseconds,
        "End-to-end pipeline latency in milliseconds"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
