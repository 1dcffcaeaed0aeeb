use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Principal
///
/// What a successful credential exchange hands back: the subject and the claims
/// that end up signed into the session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The provider rejected the username/password pair.
    #[error("invalid username or password")]
    Rejected,
    /// The provider could not be reached or answered with something unusable.
    #[error("authentication provider unavailable: {0}")]
    Unavailable(String),
}

// 1. CredentialProvider Contract
/// CredentialProvider
///
/// The opaque authentication backend. This crate never inspects how credentials
/// are verified; it only issues a session once the provider accepts them.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn exchange(&self, username: &str, password: &str) -> Result<Principal, CredentialError>;
}

// 2. The Real Implementation (remote identity service)
/// HttpCredentialProvider
///
/// Posts `{ "username", "password" }` to the configured provider URL. A `2xx` response must
/// carry `{ "id", "username" }`. `400`, `401` and `403` count as a rejection; any other
/// status, including other `4xx` answers, is an outage.
#[derive(Clone)]
pub struct HttpCredentialProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpCredentialProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for HttpCredentialProvider {
    async fn exchange(&self, username: &str, password: &str) -> Result<Principal, CredentialError> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(|e| CredentialError::Unavailable(e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(CredentialError::Rejected);
            }
            status if !status.is_success() => {
                return Err(CredentialError::Unavailable(format!(
                    "provider answered {status}"
                )));
            }
            _ => {}
        }

        response
            .json::<Principal>()
            .await
            .map_err(|e| CredentialError::Unavailable(e.to_string()))
    }
}

// 3. The Local Implementation (development and tests)
/// StaticCredentialProvider
///
/// An in-memory user table. Only wired up in `Env::Local` or tests.
#[derive(Clone, Default)]
pub struct StaticCredentialProvider {
    users: HashMap<String, (String, Uuid)>,
    should_fail: bool,
}

impl StaticCredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a provider outage on every exchange.
    pub fn new_failing() -> Self {
        Self {
            users: HashMap::new(),
            should_fail: true,
        }
    }

    pub fn with_user(mut self, username: &str, password: &str, id: Uuid) -> Self {
        self.users
            .insert(username.to_string(), (password.to_string(), id));
        self
    }

    /// Builds the table from `username:password` pairs, assigning each a fresh subject id.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        pairs.iter().fold(Self::new(), |provider, (user, pass)| {
            provider.with_user(user, pass, Uuid::new_v4())
        })
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn exchange(&self, username: &str, password: &str) -> Result<Principal, CredentialError> {
        if self.should_fail {
            return Err(CredentialError::Unavailable(
                "simulated provider outage".to_string(),
            ));
        }

        match self.users.get(username) {
            Some((expected, id)) if expected == password => Ok(Principal {
                id: *id,
                username: username.to_string(),
            }),
            _ => Err(CredentialError::Rejected),
        }
    }
}

/// CredentialState
///
/// Shared handle to whichever provider the application was configured with.
pub type CredentialState = Arc<dyn CredentialProvider>;
