//! Pulse command line: serve the dashboard, run a sync, inspect the API

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pendo_adapter::{PendoAdapterConfig, PendoClient};
use pulse_config::{init_logging, AppConfig, LogFormat};
use pulse_dashboard::DashboardServer;
use std::path::PathBuf;
use std::process::ExitCode;
use store::Store;
use sync_service::{Scheduler, SyncEngine, SyncOutcome, SyncTrigger};
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log format (pretty or json)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduler and the dashboard API
    Serve,
    /// Run one sync pass and exit
    Sync,
    /// Check connectivity and summarize the remote account
    Status,
    /// Validate configuration and print it with the key masked
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    init_logging(&config.logging)?;

    info!("Pulse {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::CheckConfig => check_config(&config),
        Command::Status => status(&config).await,
        Command::Sync => sync_once(&config).await,
        Command::Serve => serve(config).await,
    }
}

fn build_engine(config: &AppConfig) -> Result<SyncEngine> {
    config.validate()?;

    let store = Store::open(&config.database.path)
        .with_context(|| format!("Failed to open database {:?}", config.database.path))?;
    let client = PendoClient::new(PendoAdapterConfig::from(&config.pendo))?;

    Ok(SyncEngine::new(client, store, config.sync.clone()))
}

fn check_config(config: &AppConfig) -> Result<ExitCode> {
    config.validate()?;
    let scheduler = Scheduler::from_settings(&config.sync)?;

    let rendered = toml::to_string_pretty(&config.redacted())
        .context("Failed to render configuration")?;
    println!("{}", rendered);
    println!("# schedule: {}", scheduler.expression());

    Ok(ExitCode::SUCCESS)
}

async fn status(config: &AppConfig) -> Result<ExitCode> {
    config.validate()?;
    let client = PendoClient::new(PendoAdapterConfig::from(&config.pendo))?;

    let status = client.api_status().await;
    println!("{}", serde_json::to_string_pretty(&status)?);

    if !status.connected {
        return Ok(ExitCode::FAILURE);
    }

    let overview = client.data_overview().await;
    println!("{}", serde_json::to_string_pretty(&overview)?);

    let schemas = [
        ("guide", client.guide_schema().await),
        ("visitor", client.visitor_schema().await),
    ];
    for (name, schema) in schemas {
        match schema {
            Ok(schema) => println!(
                "{} metadata groups: {}",
                name,
                schema.as_object().map_or(0, |groups| groups.len())
            ),
            Err(e) => error!("Failed to read {} metadata schema: {}", name, e),
        }
    }

    Ok(if overview.error.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Exit 0 on success, 2 when some stages failed, 1 when nothing synced
async fn sync_once(config: &AppConfig) -> Result<ExitCode> {
    let engine = build_engine(config)?;
    let report = engine.run_once(SyncTrigger::Manual).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(match report.outcome {
        SyncOutcome::Success => ExitCode::SUCCESS,
        SyncOutcome::Partial => ExitCode::from(2),
        SyncOutcome::Failed | SyncOutcome::Running => ExitCode::FAILURE,
    })
}

async fn serve(config: AppConfig) -> Result<ExitCode> {
    let engine = build_engine(&config)?;
    let scheduler = Scheduler::from_settings(&config.sync)?.run_on_start(config.sync.run_on_start);

    info!(
        "Syncing {} on schedule '{}'",
        config.pendo.base_url,
        scheduler.expression()
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler_engine = engine.clone();
    let scheduler_handle =
        tokio::spawn(async move { scheduler.run(scheduler_engine, shutdown_rx).await });

    let server = DashboardServer::new(config.server.clone(), engine);
    let mut server_shutdown = shutdown_tx.subscribe();
    let server_handle = tokio::spawn(async move {
        server
            .start(async move {
                let _ = server_shutdown.changed().await;
            })
            .await
    });

    let mut exit_code = ExitCode::SUCCESS;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
        }
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Dashboard server exited"),
                Ok(Err(e)) => {
                    error!("Dashboard server error: {}", e);
                    exit_code = ExitCode::FAILURE;
                }
                Err(e) => {
                    error!("Dashboard server task failed: {}", e);
                    exit_code = ExitCode::FAILURE;
                }
            }
        }
    }

    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler_handle.await {
        error!("Scheduler task failed: {}", e);
        exit_code = ExitCode::FAILURE;
    }

    info!("Pulse stopped");
    Ok(exit_code)
}
