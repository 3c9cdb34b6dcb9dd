//! Session & Authentication
//!
//! This module owns the client-side session lifecycle:
//! - [`SessionStore`]: the durable token + profile mirror
//! - [`SessionManager`]: login, signup, logout, rehydration
//! - [`Role`] and the pure landing policy
//! - [`TwoFactorFlow`]: the step-up verification states

mod manager;
mod role;
mod store;
mod two_factor;

pub use manager::{LoginOutcome, SessionManager};
pub use role::{landing_destination, Destination, Role};
pub use store::{
    FileSessionStore, MemorySessionStore, SessionSnapshot, SessionStore, StoreError,
    DEFAULT_TOKEN_TTL_DAYS,
};
pub use two_factor::{TwoFactorFlow, TwoFactorMethod, TwoFactorState};
