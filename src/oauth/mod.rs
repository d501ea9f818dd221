//! Discord OAuth2 client
//!
//! Authorization-code flow with `identify` scope: build the authorize
//! redirect, exchange the grant for an access token, fetch the profile.
//! Failures carry a typed cause for logging; the client-visible contract
//! stays a redirect to the public root.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::Args;

const DISCORD_AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";
const DISCORD_API_BASE: &str = "https://discord.com/api";

/// Why an authentication attempt failed, for logs only
#[derive(Debug, Error)]
pub enum OAuthFailure {
    #[error("grant exchange failed: {0}")]
    GrantExchange(String),

    #[error("profile fetch failed: {0}")]
    ProfileFetch(String),

    #[error("store error: {0}")]
    Store(String),
}

/// Discord profile fields requested with the `identify` scope
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordProfile {
    /// Stable Discord user id (snowflake as string)
    pub id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Discord OAuth2 client
#[derive(Clone)]
pub struct DiscordOAuth {
    client_id: String,
    client_secret: String,
    callback_url: String,
    http: reqwest::Client,
    api_base: String,
}

impl DiscordOAuth {
    pub fn new(args: &Args) -> Self {
        Self {
            client_id: args.discord_client_id.clone(),
            client_secret: args.discord_client_secret.clone(),
            callback_url: args.discord_callback_url.clone(),
            http: reqwest::Client::new(),
            api_base: DISCORD_API_BASE.to_string(),
        }
    }

    /// Provider authorize URL for the login redirect
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=identify&state={}",
            DISCORD_AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.callback_url),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<String, OAuthFailure> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.callback_url.as_str()),
        ];

        let response = self
            .http
            .post(format!("{}/oauth2/token", self.api_base))
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthFailure::GrantExchange(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthFailure::GrantExchange(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| OAuthFailure::GrantExchange(e.to_string()))?;

        debug!("Grant exchange succeeded");
        Ok(token.access_token)
    }

    /// Fetch the authenticated user's profile
    pub async fn fetch_profile(&self, access_token: &str) -> Result<DiscordProfile, OAuthFailure> {
        let response = self
            .http
            .get(format!("{}/users/@me", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthFailure::ProfileFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthFailure::ProfileFetch(format!(
                "provider returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OAuthFailure::ProfileFetch(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn test_args() -> Args {
        Args::parse_from([
            "statehouse",
            "--discord-client-id",
            "client-123",
            "--discord-client-secret",
            "secret-456",
            "--discord-callback-url",
            "http://localhost:3001/api/auth/discord/callback",
        ])
    }

    #[test]
    fn test_authorize_url_carries_scope_and_state() {
        let oauth = DiscordOAuth::new(&test_args());
        let url = oauth.authorize_url("csrf-token");

        assert!(url.starts_with("https://discord.com/oauth2/authorize?"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=identify"));
        assert!(url.contains("state=csrf-token"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A3001%2Fapi%2Fauth%2Fdiscord%2Fcallback"
        ));
    }

    #[test]
    fn test_profile_deserializes_identify_payload() {
        let profile: DiscordProfile = serde_json::from_str(
            r#"{"id":"80351110224678912","username":"Nelly","discriminator":"0","avatar":null}"#,
        )
        .unwrap();

        assert_eq!(profile.id, "80351110224678912");
        assert_eq!(profile.username, "Nelly");
    }
}
