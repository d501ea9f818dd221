//! Configuration for Statehouse
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Statehouse - Discord-authenticated country backend
#[derive(Parser, Debug, Clone)]
#[command(name = "statehouse")]
#[command(about = "Backend for per-user country records with Discord login")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3001")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "statehouse")]
    pub mongodb_db: String,

    /// Discord OAuth application client id
    #[arg(long, env = "DISCORD_CLIENT_ID")]
    pub discord_client_id: String,

    /// Discord OAuth application client secret
    #[arg(long, env = "DISCORD_CLIENT_SECRET")]
    pub discord_client_secret: String,

    /// Callback URL registered with the Discord application
    #[arg(
        long,
        env = "DISCORD_CALLBACK_URL",
        default_value = "http://localhost:3001/api/auth/discord/callback"
    )]
    pub discord_callback_url: String,

    /// Frontend origin allowed to call with credentials, and the
    /// post-login redirect target
    #[arg(long, env = "FRONTEND_ORIGIN", default_value = "http://localhost:3000")]
    pub frontend_origin: String,

    /// Session lifetime in seconds
    #[arg(long, env = "SESSION_TTL_SECS", default_value = "604800")]
    pub session_ttl_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.discord_client_id.is_empty() || self.discord_client_secret.is_empty() {
            return Err("DISCORD_CLIENT_ID and DISCORD_CLIENT_SECRET must be set".to_string());
        }

        if !self.frontend_origin.starts_with("http://") && !self.frontend_origin.starts_with("https://") {
            return Err("FRONTEND_ORIGIN must be an http(s) origin".to_string());
        }

        if self.session_ttl_secs == 0 {
            return Err("SESSION_TTL_SECS must be greater than zero".to_string());
        }

        Ok(())
    }
}
