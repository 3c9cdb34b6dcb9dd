//! # CodeArena Client
//!
//! Rust SDK and operations console for the CodeArena coding-competition
//! platform.
//!
//! ## Features
//!
//! - **Session lifecycle**: explicit session manager with login, signup,
//!   logout and startup rehydration
//! - **Silent recovery**: one refresh-and-retry on an expired access token,
//!   single-flight across concurrent requests
//! - **Two-factor step-up**: email/SMS code flow after a challenged login
//! - **Typed roles**: closed role enumeration driving the landing policy
//! - **Back office**: admin user listing, CSV export, platform telemetry
//!
//! ## Modules
//!
//! - [`api`]: request wrapper over the platform REST API
//! - [`session`]: session store, manager, roles, two-factor flow
//! - [`users`]: profile records and the user service
//! - [`monitor`]: health and active-session telemetry
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use codearena::api::{ApiClient, ApiClientConfig};
//! use codearena::session::{FileSessionStore, LoginOutcome, SessionManager, SessionStore};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // One store, shared by the client (token) and the manager (profile)
//!     let store: Arc<dyn SessionStore> =
//!         Arc::new(FileSessionStore::new(Path::new("/tmp/codearena")));
//!     let client = Arc::new(ApiClient::new(ApiClientConfig::default(), store));
//!     let session = SessionManager::new(client.clone());
//!
//!     match session.login("ada", "hunter2!A").await? {
//!         LoginOutcome::LoggedIn(user) => println!("Signed in as {}", user.username),
//!         LoginOutcome::TwoFactorRequired(_) => println!("Two-factor verification required"),
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod export;
pub mod monitor;
pub mod session;
pub mod users;
pub mod validate;

// Re-export top-level types for convenience
pub use api::{
    decode, ApiClient, ApiClientConfig, ApiError, ApiResult, FilePayload, RequestBody,
    RequestOptions,
};

pub use session::{
    landing_destination, Destination, FileSessionStore, LoginOutcome, MemorySessionStore, Role,
    SessionManager, SessionSnapshot, SessionStore, StoreError, TwoFactorFlow, TwoFactorMethod,
    TwoFactorState,
};

pub use users::{User, UserListFilter, UserPatch, UserService};

pub use monitor::{ActiveSession, ActiveSessions, HealthMonitor, OpsSnapshot, SystemHealth};

pub use export::{users_to_csv, write_users_csv, ExportError};

pub use validate::{password_strength, PasswordStrength};

pub use config::{
    ApiConfig as ConfigApiConfig, Config, ConfigError, LoggingConfig, MonitorConfig, SessionConfig,
};
