use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};

use crate::server::{Profile, SessionBody};
use crate::session::SessionStatus;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("not signed in")]
    Unauthorized,
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to the profile service on behalf of the journal view. Every request
/// is bounded by the client timeout.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(ApiClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.http.get(format!("{}{path}", self.base_url)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn session(&self) -> Result<SessionStatus, ClientError> {
        if self.token.is_none() {
            return Ok(SessionStatus::Unauthenticated);
        }
        let response = self.get("/api/auth/session").send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(SessionStatus::Unauthenticated);
        }
        let body: SessionBody = response.error_for_status()?.json().await?;
        debug!(email = %body.user.email, "session active");
        Ok(SessionStatus::Authenticated(body.user))
    }

    pub async fn profile(&self) -> Result<Profile, ClientError> {
        let response = self.get("/api/user/profile").send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        Ok(response.error_for_status()?.json().await?)
    }

    /// Fire-and-forget: failures are logged, never returned.
    pub async fn sign_out(&self) {
        let url = format!("{}/api/auth/signout", self.base_url);
        let result = self
            .authorize(self.http.post(url))
            .send()
            .await
            .and_then(|r| r.error_for_status());
        if let Err(e) = result {
            warn!(error = %e, "sign-out request failed");
        }
    }
}
