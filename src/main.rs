//! Cardiovascular risk service entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cardio_risk_service::api::{create_router, AppState};
use cardio_risk_service::config::Config;
use cardio_risk_service::metrics;
use cardio_risk_service::model::{ModelArtifact, ModelMode, ModelStore};
use cardio_risk_service::service::PredictionService;
use cardio_risk_service::utils::shutdown_signal;

/// Cardiovascular disease risk scoring service.
#[derive(Parser, Debug)]
#[command(name = "cardio-risk-service")]
#[command(about = "HTTP service classifying cardiovascular disease risk")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

/// Overrides for the HTTP server.
#[derive(clap::Args, Debug, Default)]
struct ServeArgs {
    /// HTTP server port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind.
    #[arg(long)]
    host: Option<String>,

    /// Path of the model artifact.
    #[arg(long)]
    model_path: Option<String>,

    /// Load the model once at startup instead of per request.
    #[arg(long)]
    preload: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve(ServeArgs),

    /// Check configuration validity.
    CheckConfig,

    /// Load the model artifact and print a summary.
    CheckModel {
        /// Artifact to check (defaults to MODEL_PATH).
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Score one request body from a file, or stdin with `-`.
    Predict {
        /// Request JSON file.
        #[arg(short, long, default_value = "-")]
        input: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging; a broken environment is reported again by load_config.
    let filter = EnvFilter::new(Config::load().unwrap_or_default().log_filter(args.verbose));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Some(Command::Serve(serve)) => cmd_serve(serve).await,
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::CheckModel { path }) => cmd_check_model(path).await,
        Some(Command::Predict { input }) => cmd_predict(input).await,
        None => cmd_serve(args.serve).await,
    }
}

/// Load and validate configuration, applying CLI overrides.
fn load_config(overrides: ServeArgs) -> anyhow::Result<Config> {
    let mut config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Some(port) = overrides.port {
        config.port = port;
    }
    if let Some(host) = overrides.host {
        config.host = host;
    }
    if let Some(path) = overrides.model_path {
        config.model_path = path;
    }
    if overrides.preload {
        config.model_mode = ModelMode::Preload;
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    Ok(config)
}

/// Run the HTTP server until shutdown.
async fn cmd_serve(overrides: ServeArgs) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let config = load_config(overrides)?;

    info!("Configuration loaded successfully");
    info!("Model path: {}", config.model_path);
    info!("Model mode: {}", config.model_mode);

    let store = ModelStore::open(&config.model_path, config.model_mode).await;
    let mut app_state = AppState::new(PredictionService::new(store));

    if config.metrics_enabled {
        match metrics::install_recorder() {
            Ok(handle) => app_state = app_state.with_metrics(handle),
            Err(e) => warn!("Metrics disabled: {}", e),
        }
    }

    let addr = config
        .socket_addr()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("CARDIO RISK SERVICE - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Model Path: {}", config.model_path);
    println!("  Model Mode: {}", config.model_mode);
    println!("  Bind: {}:{}", config.host, config.port);
    println!("  Metrics: {}", if config.metrics_enabled { "Enabled" } else { "Disabled" });
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Load the model artifact and print its structure.
async fn cmd_check_model(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = match path {
        Some(p) => p,
        None => PathBuf::from(Config::load()?.model_path),
    };

    println!("======================================================================");
    println!("CARDIO RISK SERVICE - MODEL CHECK");
    println!("======================================================================");

    print!("Loading {}... ", path.display());
    match ModelArtifact::load(&path).await {
        Ok(artifact) => {
            println!("OK");
            println!("----------------------------------------------------------------------");
            println!("{}", artifact.summary());
            if let Some(names) = artifact.feature_names() {
                println!("  Columns:    {}", names.join(", "));
            }
            println!("======================================================================");
            Ok(())
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            Err(anyhow::anyhow!("Model check failed"))
        }
    }
}

/// Score a single request locally through the same pipeline as `/predict`.
async fn cmd_predict(input: String) -> anyhow::Result<()> {
    let config = load_config(ServeArgs::default())?;

    let body = if input == "-" {
        let mut buf = Vec::new();
        tokio::io::stdin().read_to_end(&mut buf).await?;
        buf
    } else {
        tokio::fs::read(&input).await?
    };

    let service = PredictionService::new(ModelStore::reloading(&config.model_path));
    match service.predict(&body).await {
        Ok(prediction) => {
            let out = serde_json::json!({
                "prediction": prediction.label,
                "probability": prediction.probability,
            });
            println!("{}", out);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::json!({ "error": e.public_message() }));
            Err(anyhow::anyhow!("Prediction failed ({})", e.status()))
        }
    }
}
