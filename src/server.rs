//! HTTP surface of the identity provider: session lookup, sign-out and the
//! protected profile endpoint.

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::session::{SessionRegistry, SessionUser};

pub const PROFILE_MESSAGE: &str = "This is protected data!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user: SessionUser,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBody {
    pub user: SessionUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn router(sessions: SessionRegistry) -> Router {
    Router::new()
        .route("/api/auth/session", get(session))
        .route("/api/auth/signout", post(sign_out))
        .route("/api/user/profile", get(profile))
        .with_state(sessions)
}

pub async fn serve(addr: SocketAddr, sessions: SessionRegistry) -> color_eyre::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "profile service listening");
    axum::serve(listener, router(sessions))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn current_user(sessions: &SessionRegistry, headers: &HeaderMap) -> Option<SessionUser> {
    sessions.resolve(bearer_token(headers)?).await
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            error: "Unauthorized".to_string(),
        }),
    )
        .into_response()
}

async fn session(State(sessions): State<SessionRegistry>, headers: HeaderMap) -> Response {
    match current_user(&sessions, &headers).await {
        Some(user) => Json(SessionBody { user }).into_response(),
        None => unauthorized(),
    }
}

async fn sign_out(State(sessions): State<SessionRegistry>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer_token(&headers) {
        if sessions.revoke(token).await {
            debug!("session revoked");
        }
    }
    StatusCode::NO_CONTENT
}

async fn profile(State(sessions): State<SessionRegistry>, headers: HeaderMap) -> Response {
    match current_user(&sessions, &headers).await {
        Some(user) => Json(Profile {
            user,
            message: PROFILE_MESSAGE.to_string(),
        })
        .into_response(),
        None => unauthorized(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(HashMap::from([(
            "good".to_string(),
            SessionUser {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                image: Some("https://example.com/ada.png".into()),
            },
        )]))
    }

    fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn profile_with_session_returns_user_and_message() {
        let response = router(registry())
            .oneshot(request("GET", "/api/user/profile", Some("good")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["user"]["name"], "Ada");
        assert_eq!(body["user"]["email"], "ada@example.com");
        assert_eq!(body["message"], PROFILE_MESSAGE);
    }

    #[tokio::test]
    async fn profile_without_session_is_unauthorized() {
        for token in [None, Some("bad")] {
            let response = router(registry())
                .oneshot(request("GET", "/api/user/profile", token))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(json(response).await["error"], "Unauthorized");
        }
    }

    #[tokio::test]
    async fn sign_out_revokes_the_session() {
        let sessions = registry();
        let app = router(sessions.clone());

        let response = app
            .clone()
            .oneshot(request("GET", "/api/auth/session", Some("good")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request("POST", "/api/auth/signout", Some("good")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(request("GET", "/api/auth/session", Some("good")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));
    }
}
