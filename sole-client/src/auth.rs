//! Email/password auth client
//!
//! Thin client for the hosted sign-in endpoint. The service speaks JSON with
//! the API key in the query string; a successful sign-in yields a short-lived
//! id token that the store attaches to writes.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration as StdDuration;

use crate::{ClientError, ClientResult, StoreConfig};

/// Signed-in session
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Token attached to database writes
    pub id_token: String,
    pub email: String,
    pub local_id: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    /// Whether the id token has passed its expiry
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Client for the hosted email/password auth service
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: Client,
    url: String,
    api_key: String,
    timeout: StdDuration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    email: String,
    local_id: String,
    /// Token lifetime in seconds, delivered as a string
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    error: AuthErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AuthErrorDetail {
    message: String,
}

impl AuthClient {
    /// Create an auth client sharing the store's HTTP client
    pub fn new(client: Client, config: &StoreConfig) -> Self {
        Self {
            client,
            url: config.auth_url.clone(),
            api_key: config.auth_api_key.clone(),
            timeout: StdDuration::from_secs(config.timeout),
        }
    }

    /// Sign in with email and password
    ///
    /// Any rejection surfaces as [`ClientError::Auth`] carrying the service's
    /// error code (e.g. `INVALID_LOGIN_CREDENTIALS`).
    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<AuthSession> {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct SignInRequest<'a> {
            email: &'a str,
            password: &'a str,
            return_secure_token: bool,
        }

        let request = SignInRequest {
            email,
            password,
            return_secure_token: true,
        };

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClientError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            let message = match response.json::<AuthErrorBody>().await {
                Ok(body) => body.error.message,
                Err(e) => format!("unreadable auth error: {e}"),
            };
            tracing::warn!(error = %message, "Sign-in rejected");
            return Err(ClientError::Auth(message));
        }

        let body: SignInResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Auth(e.to_string()))?;

        let lifetime = body
            .expires_in
            .parse::<i64>()
            .map(Duration::seconds)
            .unwrap_or_else(|_| Duration::seconds(3600));

        tracing::info!(email = %body.email, "Signed in");

        Ok(AuthSession {
            id_token: body.id_token,
            email: body.email,
            local_id: body.local_id,
            expires_at: Utc::now() + lifetime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expiry() {
        let mut session = AuthSession {
            id_token: "token".to_string(),
            email: "admin@sole.dev".to_string(),
            local_id: "uid-1".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        assert!(!session.is_expired());

        session.expires_at = Utc::now() - Duration::seconds(1);
        assert!(session.is_expired());
    }
}
