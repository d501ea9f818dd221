//! Statehouse - Discord-authenticated country backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use statehouse::{config::Args, db::CountryStore, db::MongoClient, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("statehouse={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Statehouse backend");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Frontend origin: {}", args.frontend_origin);
    info!("OAuth callback: {}", args.discord_callback_url);
    info!("Session TTL: {}s", args.session_ttl_secs);
    info!("======================================");

    // Connect to MongoDB. A failed connection is logged and the process
    // keeps running degraded: login and country operations will answer
    // with service errors until the next restart.
    let (mongo, store) = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => match CountryStore::new(&client).await {
            Ok(store) => {
                info!("MongoDB connected successfully");
                (Some(client), Some(store))
            }
            Err(e) => {
                error!("Country collection setup failed (continuing degraded): {}", e);
                (Some(client), None)
            }
        },
        Err(e) => {
            error!("MongoDB connection failed (continuing degraded): {}", e);
            (None, None)
        }
    };

    let state = Arc::new(server::AppState::new(args, mongo, store));

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
