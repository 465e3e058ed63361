use std::sync::Arc;

use clap::Parser;
use lens_core::{FeedbackStore, InferenceBackend, LensConfig, PgFeedbackStore, WorkersAiClient};
use lens_server::subsystems::{Capabilities, FeedbackIngestor};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "lens.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match LensConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    // Connect to DB
    let pool = match lens_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match lens_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ PostgreSQL connected: {}", v),
            Err(e) => {
                println!("❌ PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        }

        match lens_core::db::check_schema(&pool).await {
            Ok(true) => println!("✅ feedback table present"),
            Ok(false) => {
                println!("❌ feedback table missing (start the server once to create it)");
                std::process::exit(1);
            }
            Err(e) => {
                println!("❌ schema check failed: {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ Feedback Lens health check passed");
        return Ok(());
    }

    if let Err(e) = lens_core::db::ensure_schema(&pool).await {
        eprintln!("Failed to create feedback table: {}", e);
        std::process::exit(1);
    }

    let inference: Option<Arc<dyn InferenceBackend>> =
        match WorkersAiClient::new(&config.inference, None) {
            Ok(client) => {
                let backend: Arc<dyn InferenceBackend> = Arc::new(client);
                Some(backend)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Inference backend unavailable");
                None
            }
        };
    let store: Arc<dyn FeedbackStore> = Arc::new(PgFeedbackStore::new(pool));

    let ingestor = match FeedbackIngestor::new(
        Capabilities {
            inference,
            store: Some(store),
        },
        config.inference.extraction,
    ) {
        Ok(i) => Arc::new(i),
        Err(e) => {
            eprintln!("Refusing to start: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        model = %config.inference.model,
        extraction = ?config.inference.extraction,
        "Feedback ingestor ready"
    );

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    lens_server::http::start_http_server(ingestor, &config.http, tx.subscribe()).await?;

    Ok(())
}
