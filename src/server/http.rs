//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one spawned task per connection. Routing
//! is a direct method/path match; every response carries CORS headers
//! for the single configured frontend origin with credentials allowed.

use hyper::body::Incoming;
use hyper::header::HeaderValue;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Args;
use crate::db::{CountryStore, MongoClient};
use crate::oauth::DiscordOAuth;
use crate::routes::{self, empty_body, BoxBody};
use crate::session::{self, SessionStore};
use crate::types::StatehouseError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Absent when the database connection failed at startup; the
    /// process keeps serving in a degraded state
    pub mongo: Option<MongoClient>,
    /// Country repository, the sole writer of country documents
    pub store: Option<CountryStore>,
    pub sessions: Arc<SessionStore>,
    pub oauth: DiscordOAuth,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, mongo: Option<MongoClient>, store: Option<CountryStore>) -> Self {
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(args.session_ttl_secs)));
        let oauth = DiscordOAuth::new(&args);

        Self {
            args,
            mongo,
            store,
            sessions,
            oauth,
            started_at: Instant::now(),
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), StatehouseError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Statehouse listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    session::spawn_cleanup_task(Arc::clone(&state.sessions));

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let origin = state.args.frontend_origin.clone();

    // CORS preflight for the configured origin
    if method == Method::OPTIONS {
        return Ok(preflight_response(&origin));
    }

    let response = match (method, path.as_str()) {
        (Method::GET, "/") => routes::root_info(),

        (Method::GET, "/healthz") | (Method::GET, "/health") => {
            routes::health_check(Arc::clone(&state))
        }

        (Method::GET, "/api/auth/discord") => routes::handle_discord_login(Arc::clone(&state)),

        (Method::GET, "/api/auth/discord/callback") => {
            routes::handle_discord_callback(req, Arc::clone(&state)).await
        }

        (Method::GET, "/api/auth/check") => {
            routes::handle_auth_check(req, Arc::clone(&state)).await
        }

        (Method::POST, p) if p.starts_with("/api/country/") => {
            routes::handle_country_update(req, Arc::clone(&state)).await
        }

        _ => routes::not_found_response(&path),
    };

    Ok(with_cors(response, &origin))
}

/// Attach credentialed CORS headers for the single trusted origin
fn with_cors(mut response: Response<BoxBody>, origin: &str) -> Response<BoxBody> {
    if let Ok(value) = HeaderValue::from_str(origin) {
        let headers = response.headers_mut();
        headers.insert("Access-Control-Allow-Origin", value);
        headers.insert(
            "Access-Control-Allow-Credentials",
            HeaderValue::from_static("true"),
        );
        headers.insert("Vary", HeaderValue::from_static("Origin"));
    }
    response
}

fn preflight_response(origin: &str) -> Response<BoxBody> {
    let response = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap();

    with_cors(response, origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::json_response;

    #[test]
    fn test_cors_headers_echo_configured_origin() {
        let response = json_response(StatusCode::OK, &serde_json::json!({"ok": true}));
        let response = with_cors(response, "http://localhost:3000");

        assert_eq!(
            response.headers()["Access-Control-Allow-Origin"],
            "http://localhost:3000"
        );
        assert_eq!(response.headers()["Access-Control-Allow-Credentials"], "true");
    }

    #[test]
    fn test_preflight_is_no_content() {
        let response = preflight_response("http://localhost:3000");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()["Access-Control-Allow-Methods"],
            "GET, POST, OPTIONS"
        );
    }
}
