use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Session
///
/// Read-only view of one authenticated principal, derived from the signed session token.
/// Neither the server nor the client ever mutates it; a new sign-in replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Subject identifier of the principal.
    pub subject: Uuid,
    /// Opaque profile claim shown by the dashboard.
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session is valid strictly before its expiry instant. Expiry is lazy:
    /// it is only ever evaluated here, at read time.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// SessionState
///
/// The caller's authentication state. `Loading` only exists on the client while the
/// initial check is in flight; the server resolver settles synchronously.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Loading,
    Authenticated(Session),
    Unauthenticated,
}

impl SessionState {
    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self, SessionState::Authenticated(session) if session.is_valid_at(now))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }
}

/// Clock
///
/// Source of "now" for every expiry decision, injected so expiry can be tested
/// without waiting on wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type ClockState = Arc<dyn Clock>;

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// ManualClock
///
/// A clock that only moves when told to. Used by tests and local tooling.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.lock() = instant;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.lock();
        *now += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A poisoned clock still holds a usable instant.
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}
