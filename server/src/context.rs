//! Per-request session context.
//!
//! [`SessionContext`] is an axum extractor. It resolves the caller's session
//! from the `listkeeper_session` cookie and hands the handler an owned
//! [`SessionData`] to work on. A missing, unknown, or expired cookie yields
//! empty data and no store entry. [`SessionContext::commit`] writes the data
//! back; a new session is only stored there, once the handler has produced
//! its response, and gets its `Set-Cookie` header at the same time.
//!
//! ```rust,ignore
//! async fn handler(mut session: SessionContext) -> Response {
//!     session.data.lists.create_list("Groceries").ok();
//!     session.commit(Redirect::to("/lists"))
//! }
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, warn};

use crate::routes::{AppState, ErrorResponse};
use crate::session::{SessionData, SessionError, SessionStore};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "listkeeper_session";

/// The caller's session, checked out for the duration of one request.
pub struct SessionContext {
    /// The session's lists and flash messages.
    pub data: SessionData,

    store: Arc<SessionStore>,
    /// `None` until a new session is stored by [`SessionContext::commit`].
    token: Option<String>,
    secure_cookie: bool,
}

impl SessionContext {
    /// Loads the session named by the request's cookie, or starts empty
    /// data for a new one. Nothing is written to the store.
    pub fn resolve(state: &AppState, headers: &HeaderMap) -> Self {
        let store = Arc::clone(&state.sessions);
        let secure_cookie = state.config.secure_cookie;

        if let Some(token) = session_token(headers) {
            if let Some(data) = store.load(token) {
                return Self {
                    data,
                    store,
                    token: Some(token.to_string()),
                    secure_cookie,
                };
            }
            debug!("Session cookie did not match a live session");
        }

        Self {
            data: SessionData::default(),
            store,
            token: None,
            secure_cookie,
        }
    }

    /// Persists the session data and finishes the response.
    ///
    /// A new session that does not fit in the store replaces the response
    /// with `503 Service Unavailable`.
    pub fn commit(self, response: impl IntoResponse) -> Response {
        let Some(token) = self.token else {
            return match self.store.create_session(self.data) {
                Ok(token) => {
                    debug!("Started new session");
                    with_session_cookie(response.into_response(), &token, self.secure_cookie)
                }
                Err(err) => session_unavailable(&err),
            };
        };

        if let Err(err) = self.store.save(&token, self.data) {
            warn!(error = %err, "Failed to persist session data");
        }
        response.into_response()
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("data", &self.data)
            .finish()
    }
}

impl<S> FromRequestParts<S> for SessionContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(Self::resolve(&state, &parts.headers))
    }
}

/// Answer for a visitor whose session could not be stored.
fn session_unavailable(err: &SessionError) -> Response {
    warn!(error = %err, "Unable to start session");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse::new("too many active sessions").with_code("session_capacity")),
    )
        .into_response()
}

fn with_session_cookie(mut response: Response, token: &str, secure: bool) -> Response {
    match HeaderValue::from_str(&session_cookie(token, secure)) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(err) => warn!(error = %err, "Session cookie is not a valid header value"),
    }
    response
}

/// Extracts the session token from the request's `Cookie` headers.
fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token)
}

/// Builds the `Set-Cookie` value for a session token.
fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
