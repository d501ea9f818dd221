//! HTTP routes for Statehouse

pub mod auth_routes;
pub mod country;
pub mod health;

pub use auth_routes::{handle_auth_check, handle_discord_callback, handle_discord_login};
pub use country::handle_country_update;
pub use health::{health_check, root_info};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{body::Incoming, Request, Response, StatusCode};
use serde::Serialize;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Fixed body for unauthenticated access to protected routes
#[derive(Serialize)]
pub struct NotLoggedIn {
    pub message: &'static str,
}

impl NotLoggedIn {
    pub fn new() -> Self {
        Self {
            message: "Not logged in",
        }
    }
}

impl Default for NotLoggedIn {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(full_body(json))
        .unwrap()
}

pub fn redirect_response(location: &str) -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header("Location", location)
        .header("Cache-Control", "no-store")
        .body(empty_body())
        .unwrap()
}

pub fn not_found_response(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("Not found: {}", path),
        },
    )
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

/// Extract the session id from the Cookie header
pub fn session_id_from_request(req: &Request<Incoming>) -> Option<String> {
    let header = req.headers().get(hyper::header::COOKIE)?.to_str().ok()?;
    session_id_from_cookies(header)
}

fn session_id_from_cookies(header: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == crate::session::SESSION_COOKIE && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_parsing() {
        assert_eq!(
            session_id_from_cookies("statehouse_sid=abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(
            session_id_from_cookies("other=x; statehouse_sid=abc123; theme=dark"),
            Some("abc123".to_string())
        );
        assert_eq!(session_id_from_cookies("other=x"), None);
        assert_eq!(session_id_from_cookies("statehouse_sid="), None);
        // Prefix of the cookie name must not match
        assert_eq!(session_id_from_cookies("statehouse_sid2=abc"), None);
    }

    #[test]
    fn test_not_logged_in_body_is_fixed() {
        let body = serde_json::to_string(&NotLoggedIn::new()).unwrap();
        assert_eq!(body, r#"{"message":"Not logged in"}"#);
    }
}
