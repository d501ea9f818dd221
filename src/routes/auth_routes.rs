//! Authentication routes
//!
//! - GET /api/auth/discord          - redirect to the provider
//! - GET /api/auth/discord/callback - grant exchange, session creation
//! - GET /api/auth/check            - session check + full country
//!
//! Any failure during the callback collapses to a redirect to the
//! public root; the typed cause is logged, never sent to the client.

use hyper::{body::Incoming, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::CountryView;
use crate::oauth::OAuthFailure;
use crate::routes::{
    empty_body, json_response, redirect_response, session_id_from_request, BoxBody, NotLoggedIn,
};
use crate::server::AppState;
use crate::session::SESSION_COOKIE;

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Serialize)]
struct UserInfo {
    id: String,
    username: Option<String>,
}

#[derive(Serialize)]
struct CheckResponse {
    user: UserInfo,
    country: Option<CountryView>,
}

/// GET /api/auth/discord
///
/// Issue a CSRF state token and redirect to the provider with the
/// `identify` scope.
pub fn handle_discord_login(state: Arc<AppState>) -> Response<BoxBody> {
    let login_state = state.sessions.begin_login();
    let url = state.oauth.authorize_url(&login_state);

    info!("Login initiated, redirecting to provider");
    redirect_response(&url)
}

/// GET /api/auth/discord/callback
///
/// Exchange the authorization grant for a profile, find or create the
/// country record, create the session, and redirect to the frontend.
pub async fn handle_discord_callback(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let frontend = state.args.frontend_origin.clone();

    match run_callback(&req, &state).await {
        Ok(user_id) => {
            let session_id = state.sessions.create(&user_id);
            let cookie = format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
                SESSION_COOKIE, session_id, state.args.session_ttl_secs
            );

            info!("Login completed for user {}", user_id);

            Response::builder()
                .status(StatusCode::FOUND)
                .header("Location", frontend)
                .header("Set-Cookie", cookie)
                .header("Cache-Control", "no-store")
                .body(empty_body())
                .unwrap()
        }
        Err(cause) => {
            warn!("Login failed: {}", cause);
            redirect_response("/")
        }
    }
}

/// The fallible part of the callback, with a typed failure cause
async fn run_callback(
    req: &Request<Incoming>,
    state: &Arc<AppState>,
) -> Result<String, OAuthFailure> {
    let query: CallbackQuery = serde_urlencoded::from_str(req.uri().query().unwrap_or(""))
        .map_err(|e| OAuthFailure::GrantExchange(format!("invalid query: {}", e)))?;

    let code = query
        .code
        .ok_or_else(|| OAuthFailure::GrantExchange("missing authorization code".into()))?;
    let login_state = query
        .state
        .ok_or_else(|| OAuthFailure::GrantExchange("missing state parameter".into()))?;

    if !state.sessions.take_login(&login_state) {
        return Err(OAuthFailure::GrantExchange(
            "unknown or expired state parameter".into(),
        ));
    }

    let token = state.oauth.exchange_code(&code).await?;
    let profile = state.oauth.fetch_profile(&token).await?;

    let store = state
        .store
        .as_ref()
        .ok_or_else(|| OAuthFailure::Store("database not available".into()))?;

    store
        .find_or_create(&profile.id, &profile.username)
        .await
        .map_err(|e| OAuthFailure::Store(e.to_string()))?;

    Ok(profile.id)
}

/// GET /api/auth/check
///
/// 401 with the fixed body without a live session; otherwise the
/// resolved user plus the full country record.
pub async fn handle_auth_check(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let session_id = match session_id_from_request(&req) {
        Some(sid) => sid,
        None => return json_response(StatusCode::UNAUTHORIZED, &NotLoggedIn::new()),
    };

    let ctx = match state
        .sessions
        .resolve(&session_id, state.store.as_ref())
        .await
    {
        Some(ctx) => ctx,
        None => return json_response(StatusCode::UNAUTHORIZED, &NotLoggedIn::new()),
    };

    json_response(
        StatusCode::OK,
        &CheckResponse {
            user: UserInfo {
                id: ctx.user_id,
                username: ctx.username,
            },
            country: ctx.country.as_ref().map(CountryView::from),
        },
    )
}
