use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

/// The signed-in user as the identity provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Authenticated(SessionUser),
    Unauthenticated,
}

impl SessionStatus {
    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            SessionStatus::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Live sessions keyed by bearer token.
///
/// Tokens are issued by the identity provider; this registry only answers
/// "who holds this token" and forgets tokens on sign-out.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionUser>>>,
}

impl SessionRegistry {
    pub fn new(sessions: HashMap<String, SessionUser>) -> Self {
        SessionRegistry {
            sessions: Arc::new(RwLock::new(sessions)),
        }
    }

    /// Reads a JSON object mapping tokens to users.
    pub fn from_file(path: &Path) -> color_eyre::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let sessions: HashMap<String, SessionUser> = serde_json::from_str(&raw)?;
        info!(path = %path.display(), count = sessions.len(), "loaded sessions");
        Ok(Self::new(sessions))
    }

    pub async fn resolve(&self, token: &str) -> Option<SessionUser> {
        self.sessions.read().await.get(token).cloned()
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}
