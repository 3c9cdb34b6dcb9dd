//! Session Store
//!
//! The only durable client-side state: the access token and the cached
//! profile mirror. The store is constructed once at process start and shared
//! between the API client (sole writer of the token) and the session manager
//! (writer of the user mirror).
//!
//! The access token is client-managed state with a fixed expiry, the analog
//! of the frontend's script-set cookie. The HttpOnly refresh cookie never
//! passes through here; it lives in the HTTP client's cookie store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::users::User;

/// Default lifetime of a stored access token, matching the cookie expiry the
/// frontend used
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

/// Snapshot of the persisted session state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub access_token: Option<String>,

    /// Fixed expiry stamped when the token is saved
    #[serde(default)]
    pub token_expires_at: Option<DateTime<Utc>>,

    /// Last known profile mirror, kept for the stale-read fallback
    #[serde(default)]
    pub user: Option<User>,

    #[serde(default)]
    pub authenticated: bool,
}

impl SessionSnapshot {
    /// Drop the token if its expiry has passed. The cached user survives; it
    /// only feeds the stale-read fallback.
    pub fn expire_stale_token(&mut self, now: DateTime<Utc>) {
        if let Some(expires_at) = self.token_expires_at {
            if expires_at <= now {
                self.access_token = None;
                self.token_expires_at = None;
                self.authenticated = false;
            }
        }
    }
}

/// Session store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read session state {path:?}: {error}")]
    Read { path: PathBuf, error: String },

    #[error("Failed to write session state {path:?}: {error}")]
    Write { path: PathBuf, error: String },

    #[error("Corrupt session state: {0}")]
    Corrupt(String),
}

/// Persistence seam for the session snapshot.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<SessionSnapshot, StoreError>;

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError>;

    /// Clear token, cached profile and auth flag in one step
    async fn clear(&self) -> Result<(), StoreError>;

    /// Token lifetime applied when a new access token is saved
    fn token_ttl(&self) -> Duration {
        Duration::days(DEFAULT_TOKEN_TTL_DAYS)
    }

    async fn access_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.load().await?.access_token)
    }

    async fn set_access_token(&self, token: &str) -> Result<(), StoreError> {
        let mut snapshot = self.load().await?;
        snapshot.access_token = Some(token.to_string());
        snapshot.token_expires_at = Some(Utc::now() + self.token_ttl());
        snapshot.authenticated = true;
        self.save(&snapshot).await
    }

    async fn cached_user(&self) -> Result<Option<User>, StoreError> {
        Ok(self.load().await?.user)
    }

    async fn set_user(&self, user: Option<&User>) -> Result<(), StoreError> {
        let mut snapshot = self.load().await?;
        snapshot.user = user.cloned();
        self.save(&snapshot).await
    }
}

// ============================================
// File-backed store
// ============================================

/// Session store persisted as JSON under the platform state directory.
pub struct FileSessionStore {
    path: PathBuf,
    token_ttl: Duration,
}

impl FileSessionStore {
    /// Create a store writing to `<state_dir>/session.json`
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join("session.json"),
            token_ttl: Duration::days(DEFAULT_TOKEN_TTL_DAYS),
        }
    }

    pub fn with_token_ttl_days(mut self, days: i64) -> Self {
        self.token_ttl = Duration::days(days);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<SessionSnapshot, StoreError> {
        if !self.path.exists() {
            return Ok(SessionSnapshot::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| StoreError::Read {
            path: self.path.clone(),
            error: e.to_string(),
        })?;

        let mut snapshot: SessionSnapshot =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        snapshot.expire_stale_token(Utc::now());
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Write {
                path: self.path.clone(),
                error: e.to_string(),
            })?;
        }

        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        std::fs::write(&self.path, content).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            error: e.to_string(),
        })
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.save(&SessionSnapshot::default()).await
    }

    fn token_ttl(&self) -> Duration {
        self.token_ttl
    }
}

// ============================================
// In-memory store
// ============================================

/// In-memory session store, used by tests and short-lived tooling.
#[derive(Default)]
pub struct MemorySessionStore {
    snapshot: RwLock<SessionSnapshot>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<SessionSnapshot, StoreError> {
        let mut snapshot = self.snapshot.read().await.clone();
        snapshot.expire_stale_token(Utc::now());
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        *self.snapshot.write().await = snapshot.clone();
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.snapshot.write().await = SessionSnapshot::default();
        Ok(())
    }
}
