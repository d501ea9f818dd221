//! Country update route
//!
//! POST /api/country/:field/:amount
//!
//! The field is an enumerated command: names outside the recognized
//! policy fields are rejected with 400 instead of being written through. The
//! amount path parameter is coerced to a number. A missing country
//! answers JSON `null` with 200, matching the check/update contract
//! the frontend already relies on.

use hyper::{body::Incoming, Request, Response, StatusCode};
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::{CountryView, PolicyField};
use crate::routes::{json_response, session_id_from_request, BoxBody, ErrorResponse, NotLoggedIn};
use crate::server::AppState;

/// POST /api/country/:field/:amount
pub async fn handle_country_update(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let session_id = session_id_from_request(&req);
    let path = req.uri().path().to_string();
    run_update(session_id, &path, &state).await
}

/// Protected route: the session guard runs before anything else is
/// read from the request, so anonymous callers always see 401 and
/// learn nothing about field names.
async fn run_update(
    session_id: Option<String>,
    path: &str,
    state: &AppState,
) -> Response<BoxBody> {
    let ctx = match session_id {
        Some(sid) => state.sessions.resolve(&sid, state.store.as_ref()).await,
        None => None,
    };
    let ctx = match ctx {
        Some(ctx) => ctx,
        None => return json_response(StatusCode::UNAUTHORIZED, &NotLoggedIn::new()),
    };

    let (field_name, amount_raw) = match parse_update_path(path) {
        Some(parts) => parts,
        None => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse {
                    error: "expected /api/country/:field/:amount".into(),
                },
            )
        }
    };

    let field: PolicyField = match field_name.parse() {
        Ok(f) => f,
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse {
                    error: e.to_string(),
                },
            )
        }
    };

    let amount: f64 = match amount_raw.parse() {
        Ok(v) => v,
        Err(_) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse {
                    error: format!("amount is not a number: {}", amount_raw),
                },
            )
        }
    };

    let store = match &state.store {
        Some(s) => s,
        None => {
            return json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &ErrorResponse {
                    error: "Database not available".into(),
                },
            )
        }
    };

    match store.update_field(&ctx.user_id, field, amount).await {
        Ok(Some(country)) => {
            info!(
                "Updated {} to {} for user {}",
                field.as_key(),
                amount,
                ctx.user_id
            );
            json_response(StatusCode::OK, &CountryView::from(&country))
        }
        // No country for this identity: null body, 200
        Ok(None) => json_response(StatusCode::OK, &serde_json::Value::Null),
        Err(e) => {
            warn!("Country update failed for {}: {}", ctx.user_id, e);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: "Update failed".into(),
                },
            )
        }
    }
}

/// Split `/api/country/:field/:amount` into its two path parameters
fn parse_update_path(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix("/api/country/")?;
    let (field, amount) = rest.split_once('/')?;
    if field.is_empty() || amount.is_empty() || amount.contains('/') {
        return None;
    }
    Some((field, amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use clap::Parser;
    use http_body_util::BodyExt;

    // AppState without a database, as after a failed Mongo connect
    fn degraded_state() -> AppState {
        let args = Args::parse_from([
            "statehouse",
            "--discord-client-id",
            "client-123",
            "--discord-client-secret",
            "secret-456",
        ]);
        AppState::new(args, None, None)
    }

    #[tokio::test]
    async fn test_unauthenticated_update_is_401_regardless_of_field() {
        let state = degraded_state();

        // No cookie: 401 with the fixed body, whether the field name is
        // valid, unknown, or the path is malformed
        for path in [
            "/api/country/funding/2000",
            "/api/country/bogus/5",
            "/api/country/funding/abc",
            "/api/country/funding",
        ] {
            let response = run_update(None, path, &state).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(body.as_ref(), br#"{"message":"Not logged in"}"#.as_slice());
        }
    }

    #[tokio::test]
    async fn test_unknown_session_update_is_401() {
        let state = degraded_state();

        let response = run_update(Some("forged".into()), "/api/country/bogus/5", &state).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_authenticated_unknown_field_is_400() {
        let state = degraded_state();
        let sid = state.sessions.create("1234");

        let response = run_update(Some(sid), "/api/country/bogus/5", &state).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_authenticated_update_without_database_is_503() {
        let state = degraded_state();
        let sid = state.sessions.create("1234");

        let response = run_update(Some(sid), "/api/country/funding/2000", &state).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_parse_update_path() {
        assert_eq!(
            parse_update_path("/api/country/funding/2000"),
            Some(("funding", "2000"))
        );
        assert_eq!(
            parse_update_path("/api/country/healthcare/12.5"),
            Some(("healthcare", "12.5"))
        );
        assert_eq!(parse_update_path("/api/country/funding"), None);
        assert_eq!(parse_update_path("/api/country//2000"), None);
        assert_eq!(parse_update_path("/api/country/funding/"), None);
        assert_eq!(parse_update_path("/api/country/funding/1/extra"), None);
        assert_eq!(parse_update_path("/api/other/funding/1"), None);
    }

    #[test]
    fn test_amount_coercion_matches_route_contract() {
        // The :amount segment is a numeric string on the wire
        assert_eq!("2000".parse::<f64>().unwrap(), 2000.0);
        assert_eq!("-3.5".parse::<f64>().unwrap(), -3.5);
        assert!("12abc".parse::<f64>().is_err());
    }
}
