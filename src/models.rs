use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::session::{Session, SessionState};

// --- Session Schemas (Output) ---

/// SessionUser
///
/// The principal as exposed to the dashboard frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SessionUser {
    pub id: Uuid,
    pub username: String,
}

/// SessionView
///
/// Output schema for GET /api/auth/session. This is what the client-side session store
/// hydrates from; it never contains the token itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SessionView {
    pub authenticated: bool,
    pub user: Option<SessionUser>,
    #[ts(type = "string | null")]
    pub issued_at: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionView {
    pub fn from_state(state: &SessionState) -> Self {
        match state {
            SessionState::Authenticated(session) => Self {
                authenticated: true,
                user: Some(SessionUser {
                    id: session.subject,
                    username: session.username.clone(),
                }),
                issued_at: Some(session.issued_at),
                expires_at: Some(session.expires_at),
            },
            _ => Self::default(),
        }
    }

    /// Rebuilds the read-only `Session` on the client. Anything incomplete counts as no session.
    pub fn into_session(self) -> Option<Session> {
        if !self.authenticated {
            return None;
        }
        match (self.user, self.issued_at, self.expires_at) {
            (Some(user), Some(issued_at), Some(expires_at)) => Some(Session {
                subject: user.id,
                username: user.username,
                issued_at,
                expires_at,
            }),
            _ => None,
        }
    }
}

// --- Sign-in Schemas ---

/// LoginRequest
///
/// Input payload for POST /api/auth/login.
/// The password is handed straight to the credential provider and never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    #[schema(example = "admin")]
    pub username: String,
    pub password: String,
    /// The callback path the login screen was opened with, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "/dashboard")]
    pub callback_url: Option<String>,
}

/// LoginResponse
///
/// Output schema for a successful sign-in. `redirect_to` is where the login screen
/// should navigate next: the sanitized callback or the home route.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub user: SessionUser,
    #[ts(type = "string")]
    pub issued_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
    pub redirect_to: String,
}

impl LoginResponse {
    pub fn into_session(self) -> (Session, String) {
        let session = Session {
            subject: self.user.id,
            username: self.user.username,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        };
        (session, self.redirect_to)
    }
}

/// ErrorBody
///
/// JSON body for every error this service returns. For sign-in failures `error` is meant
/// to be shown as-is on the login form.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorBody {
    pub error: String,
}
