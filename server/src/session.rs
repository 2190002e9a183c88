//! In-memory session store holding each visitor's todo lists.
//!
//! Sessions are keyed by an opaque token carried in a cookie. Each session
//! owns a [`SessionData`]: the visitor's [`ListStore`] plus any pending
//! flash messages. Nothing is persisted; a session disappears when it
//! expires or the process stops.
//!
//! # Token Format
//!
//! Session tokens are 32 bytes of cryptographically secure random data,
//! base64-url encoded without padding, resulting in 43 character tokens.
//!
//! # Expiry
//!
//! Sessions expire after an idle TTL. Every successful [`SessionStore::load`]
//! pushes the expiry forward. Expired sessions are dropped lazily when
//! accessed and in bulk by [`SessionStore::cleanup_expired`], which
//! [`SessionStore::spawn_cleanup_task`] runs periodically.
//!
//! # Example
//!
//! ```rust
//! use listkeeper_server::session::{SessionData, SessionStore, SessionStoreConfig};
//!
//! let store = SessionStore::new(SessionStoreConfig::default());
//! let mut data = SessionData::default();
//! data.lists.create_list("Groceries").unwrap();
//! let token = store.create_session(data).expect("store has capacity");
//!
//! let mut data = store.load(&token).expect("live session");
//! data.lists.create_list("Chores").unwrap();
//! store.save(&token, data).unwrap();
//!
//! assert_eq!(store.load(&token).unwrap().lists.len(), 2);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::store::ListStore;

/// Default idle session TTL (24 hours).
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Default maximum number of sessions.
pub const DEFAULT_MAX_CAPACITY: usize = 10_000;

/// Size of the random token in bytes.
const TOKEN_BYTES: usize = 32;

/// Expected length of base64-url encoded token (43 characters).
const TOKEN_LENGTH: usize = 43;

/// Errors that can occur during session operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session store has reached maximum capacity.
    #[error("session store at maximum capacity ({max_capacity} sessions)")]
    AtCapacity {
        /// The maximum number of sessions allowed.
        max_capacity: usize,
    },

    /// The session token was not found or has expired.
    #[error("session not found or expired")]
    NotFound,
}

/// Configuration for the session store.
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    /// Maximum number of concurrent sessions.
    pub max_capacity: usize,

    /// Idle time after which a session expires.
    pub ttl: Duration,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: DEFAULT_MAX_CAPACITY,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }
}

impl SessionStoreConfig {
    /// Creates a new configuration with custom values.
    pub fn new(max_capacity: usize, ttl: Duration) -> Self {
        Self { max_capacity, ttl }
    }
}

/// One-shot messages shown by the next rendered view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Flash {
    /// Returns `true` if no message is pending.
    pub fn is_empty(&self) -> bool {
        self.success.is_none() && self.error.is_none()
    }

    /// Takes the pending messages, leaving the flash empty.
    pub fn take(&mut self) -> Flash {
        std::mem::take(self)
    }
}

/// Everything a session remembers between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// The visitor's todo lists.
    pub lists: ListStore,

    /// Messages queued for the next view.
    pub flash: Flash,
}

/// A stored session and its expiry bookkeeping.
#[derive(Debug, Clone)]
struct Session {
    data: SessionData,
    created_at: Instant,
    expires_at: Instant,
}

impl Session {
    fn new(data: SessionData, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            data,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Pushes expiry to `ttl` from now.
    fn touch(&mut self, ttl: Duration) {
        self.expires_at = Instant::now() + ttl;
    }
}

/// Thread-safe in-memory session store.
///
/// Handlers never hold a lock across a request: they copy a session's data
/// out with [`SessionStore::load`] and write it back with
/// [`SessionStore::save`]. Two concurrent requests for the same session
/// therefore race, and the later save wins.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    config: SessionStoreConfig,
}

impl SessionStore {
    /// Creates a new session store with the given configuration.
    pub fn new(config: SessionStoreConfig) -> Self {
        debug!(
            max_capacity = config.max_capacity,
            ttl_secs = config.ttl.as_secs(),
            "Creating new session store"
        );
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `data` under a fresh session and returns its token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AtCapacity`] if the store is full.
    pub fn create_session(&self, data: SessionData) -> Result<String, SessionError> {
        // Generate token first (outside of lock)
        let token = generate_session_token();

        let mut sessions = self.write();

        if sessions.len() >= self.config.max_capacity {
            warn!(
                capacity = sessions.len(),
                max_capacity = self.config.max_capacity,
                "Session store at capacity, rejecting new session"
            );
            return Err(SessionError::AtCapacity {
                max_capacity: self.config.max_capacity,
            });
        }

        trace!(ttl_secs = self.config.ttl.as_secs(), "Creating new session");
        sessions.insert(token.clone(), Session::new(data, self.config.ttl));

        Ok(token)
    }

    /// Returns a copy of the session's data and refreshes its expiry.
    ///
    /// Returns `None` for malformed, unknown, or expired tokens. Expired
    /// sessions are removed on the way.
    pub fn load(&self, token: &str) -> Option<SessionData> {
        if token.len() != TOKEN_LENGTH {
            trace!(token_len = token.len(), "Invalid token length");
            return None;
        }

        let mut sessions = self.write();
        let Some(session) = sessions.get_mut(token) else {
            trace!("Session token not found");
            return None;
        };

        if session.is_expired() {
            sessions.remove(token);
            trace!("Removed expired session during load");
            return None;
        }

        session.touch(self.config.ttl);
        trace!(
            age_secs = session.created_at.elapsed().as_secs(),
            list_count = session.data.lists.len(),
            "Session loaded"
        );
        Some(session.data.clone())
    }

    /// Replaces the data of an existing session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] if the session no longer exists.
    pub fn save(&self, token: &str, data: SessionData) -> Result<(), SessionError> {
        let mut sessions = self.write();
        let session = sessions.get_mut(token).ok_or(SessionError::NotFound)?;
        session.data = data;
        Ok(())
    }

    /// Returns the current number of sessions, including expired ones not
    /// yet cleaned up.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Removes all expired sessions and returns how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.write();
        let initial_len = sessions.len();

        sessions.retain(|_, session| !session.is_expired());

        let removed = initial_len - sessions.len();
        if removed > 0 {
            debug!(
                removed_count = removed,
                remaining_count = sessions.len(),
                "Cleaned up expired sessions"
            );
        }
        removed
    }

    /// Spawns a background task that removes expired sessions every
    /// `cleanup_interval`.
    ///
    /// The task runs until the returned handle is aborted.
    pub fn spawn_cleanup_task(
        self: &Arc<Self>,
        cleanup_interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_interval);

            loop {
                interval.tick().await;
                store.cleanup_expired();
            }
        })
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionStoreConfig::default())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session_count", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Generates a cryptographically secure session token.
fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
