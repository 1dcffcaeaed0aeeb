use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

use crate::{
    models::{ErrorBody, LoginRequest, LoginResponse, SessionView},
    routes::public::{LOGIN_ENDPOINT, LOGOUT_ENDPOINT, SESSION_ENDPOINT},
    session::{Session, SessionState},
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server refused the sign-in; the message is meant for the login form.
    #[error("{0}")]
    Rejected(String),
    #[error("session request failed: {0}")]
    Transport(String),
}

/// SessionSource
///
/// Where the client session store learns about the session transport. The cookie itself
/// is never visible to the client; it only ever sees the server's view of it.
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// `Ok(None)` means the server answered and there is no session.
    async fn fetch_session(&self) -> Result<Option<Session>, ClientError>;

    /// Returns the issued session and where the login screen should go next.
    async fn sign_in(
        &self,
        username: &str,
        password: &str,
        callback: Option<&str>,
    ) -> Result<(Session, String), ClientError>;

    async fn sign_out(&self) -> Result<(), ClientError>;
}

/// HttpSessionSource
///
/// Talks to this service's `/api/auth/*` endpoints. The `reqwest::Client` handed in must
/// keep cookies between calls (e.g. a browser fetch client or a client built with a cookie store).
#[derive(Clone)]
pub struct HttpSessionSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl SessionSource for HttpSessionSource {
    async fn fetch_session(&self) -> Result<Option<Session>, ClientError> {
        let response = self
            .client
            .get(self.url(SESSION_ENDPOINT))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::Transport(format!(
                "session endpoint answered {}",
                response.status()
            )));
        }

        let view = response
            .json::<SessionView>()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(view.into_session())
    }

    async fn sign_in(
        &self,
        username: &str,
        password: &str,
        callback: Option<&str>,
    ) -> Result<(Session, String), ClientError> {
        let payload = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
            callback_url: callback.map(str::to_string),
        };

        let response = self
            .client
            .post(self.url(LOGIN_ENDPOINT))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| format!("sign-in failed ({status})"));
            return Err(ClientError::Rejected(message));
        }

        let login = response
            .json::<LoginResponse>()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(login.into_session())
    }

    async fn sign_out(&self) -> Result<(), ClientError> {
        self.client
            .post(self.url(LOGOUT_ENDPOINT))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// SessionStore
///
/// The client's observable session state. Starts at `Loading` and is settled by
/// `hydrate`. Guards subscribe to it and re-evaluate on every change.
///
/// Writes are whole-value replacements: sign-in swaps in a new session, sign-out
/// swaps in `Unauthenticated`.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Loading);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn set(&self, state: SessionState) {
        self.tx.send_replace(state);
    }

    /// hydrate
    ///
    /// Settles `Loading` by asking the server. An unreachable server settles to
    /// `Unauthenticated`; the store never stays stuck loading.
    pub async fn hydrate(&self, source: &dyn SessionSource) {
        let state = match source.fetch_session().await {
            Ok(Some(session)) => SessionState::Authenticated(session),
            Ok(None) => SessionState::Unauthenticated,
            Err(err) => {
                tracing::warn!(error = %err, "session check failed, treating as signed out");
                SessionState::Unauthenticated
            }
        };
        self.set(state);
    }

    /// sign_in
    ///
    /// On success the store becomes `Authenticated` and the post-login target is
    /// returned. On failure the state is left as it was.
    pub async fn sign_in(
        &self,
        source: &dyn SessionSource,
        username: &str,
        password: &str,
        callback: Option<&str>,
    ) -> Result<String, ClientError> {
        let (session, redirect_to) = source.sign_in(username, password, callback).await?;
        self.set(SessionState::Authenticated(session));
        Ok(redirect_to)
    }

    /// sign_out
    ///
    /// Clears the local state even when the server call fails, so every mounted
    /// protected guard redirects straight away.
    pub async fn sign_out(&self, source: &dyn SessionSource) -> Result<(), ClientError> {
        let result = source.sign_out().await;
        self.set(SessionState::Unauthenticated);
        result
    }
}
