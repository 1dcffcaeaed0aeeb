use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{ClockState, Session, SessionState};

/// Name of the cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "session";

/// Tokens issued further in the future than this are treated as clock-skewed.
const CLOCK_SKEW_LEEWAY_SECS: i64 = 60;

/// Claims
///
/// The payload signed into every session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the principal's identifier.
    pub sub: Uuid,
    /// Username claim carried through to the dashboard.
    pub username: String,
    /// Issued At (iat), seconds since the epoch.
    pub iat: i64,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: i64,
}

/// Reasons a session token is rejected. None of these ever reach a caller;
/// the resolver folds them all into `SessionState::Unauthenticated`.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session token is malformed")]
    Malformed,
    #[error("session token signature is invalid")]
    InvalidSignature,
    #[error("session expired at {0}")]
    Expired(DateTime<Utc>),
    #[error("session issued in the future ({0})")]
    IssuedInFuture(DateTime<Utc>),
    #[error("session lifetime runs past the representable calendar")]
    ExpiryOutOfRange,
    #[error("failed to sign session token: {0}")]
    Signing(String),
}

/// SessionCodec
///
/// Issues and verifies the signed, time-bounded session transport (HS256 JWT).
///
/// Expiry is evaluated against the instant passed in by the caller (from the injected
/// `Clock`), never by `jsonwebtoken` against the wall clock.
#[derive(Clone)]
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionCodec {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// issue
    ///
    /// Signs a new session for `subject` with `issued_at = now` and
    /// `expires_at = now + ttl`. Sessions are never renewed; a new sign-in issues a new token.
    ///
    /// Both instants are whole seconds, matching what the token itself can carry.
    pub fn issue(
        &self,
        subject: Uuid,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<(String, Session), SessionError> {
        let issued_at = now.trunc_subsecs(0);
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(SessionError::ExpiryOutOfRange)?;

        let session = Session {
            subject,
            username: username.to_string(),
            issued_at,
            expires_at,
        };

        let claims = Claims {
            sub: session.subject,
            username: session.username.clone(),
            iat: session.issued_at.timestamp(),
            exp: session.expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| SessionError::Signing(e.to_string()))?;

        Ok((token, session))
    }

    /// decode
    ///
    /// Verifies the signature, then checks issue and expiry instants against `now`.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<Session, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => SessionError::InvalidSignature,
                _ => SessionError::Malformed,
            })?
            .claims;

        let issued_at = DateTime::from_timestamp(claims.iat, 0).ok_or(SessionError::Malformed)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(SessionError::Malformed)?;

        if issued_at > now + Duration::seconds(CLOCK_SKEW_LEEWAY_SECS) {
            return Err(SessionError::IssuedInFuture(issued_at));
        }

        let session = Session {
            subject: claims.sub,
            username: claims.username,
            issued_at,
            expires_at,
        };

        if !session.is_valid_at(now) {
            return Err(SessionError::Expired(expires_at));
        }

        Ok(session)
    }

    /// resolve
    ///
    /// The server-side Session Resolver. Reads the session cookie, falling back to an
    /// `Authorization: Bearer` header for API clients. Never returns `Loading`, and never
    /// fails: absent, malformed, forged or expired tokens all resolve to `Unauthenticated`.
    pub fn resolve(&self, headers: &HeaderMap, now: DateTime<Utc>) -> SessionState {
        let Some(token) = token_from_headers(headers) else {
            return SessionState::Unauthenticated;
        };

        match self.decode(&token, now) {
            Ok(session) => SessionState::Authenticated(session),
            Err(err) => {
                tracing::debug!(reason = %err, "rejecting session token");
                SessionState::Unauthenticated
            }
        }
    }

    /// Builds the `Set-Cookie` value carrying a freshly issued token.
    pub fn session_cookie(&self, token: String, secure: bool) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.ttl.num_seconds()))
            .build()
    }
}

/// Removal cookie for sign-out. Path must match the issued cookie for browsers to drop it.
pub fn cleared_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// CurrentSession Extractor
///
/// Hands the caller's valid `Session` to a handler. The edge gate attaches the session it
/// resolved to the request extensions; when a handler is reached some other way the
/// extractor resolves the transport itself.
///
/// Rejection: `StatusCode::UNAUTHORIZED` when there is no valid session.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    SessionCodec: FromRef<S>,
    ClockState: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let clock = ClockState::from_ref(state);
        let now = clock.now();

        if let Some(session) = parts.extensions.get::<Session>() {
            if session.is_valid_at(now) {
                return Ok(CurrentSession(session.clone()));
            }
        }

        let codec = SessionCodec::from_ref(state);
        match codec.resolve(&parts.headers, now) {
            SessionState::Authenticated(session) => Ok(CurrentSession(session)),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }
}
