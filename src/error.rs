use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{auth::SessionError, credentials::CredentialError, models::ErrorBody};

/// LoginError
///
/// Everything that can stop a sign-in. These are login-form messages, not faults:
/// a rejected password is a `401` the form displays, a provider outage a `503`.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl LoginError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LoginError::Credentials(CredentialError::Rejected) => StatusCode::UNAUTHORIZED,
            LoginError::Credentials(CredentialError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            LoginError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown on the login form. Never includes provider internals.
    pub fn form_message(&self) -> &'static str {
        match self {
            LoginError::Credentials(CredentialError::Rejected) => "Invalid username or password",
            LoginError::Credentials(CredentialError::Unavailable(_)) => {
                "Sign-in is temporarily unavailable, please try again"
            }
            LoginError::Session(_) => "Could not start a session, please try again",
        }
    }
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        match &self {
            LoginError::Credentials(CredentialError::Rejected) => {
                tracing::info!("sign-in rejected by credential provider");
            }
            other => tracing::warn!(error = %other, "sign-in failed"),
        }

        let body = Json(ErrorBody {
            error: self.form_message().to_string(),
        });
        (self.status_code(), body).into_response()
    }
}
