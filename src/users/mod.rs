//! Users
//!
//! The profile record mirrored from the server and the service wrappers
//! over the profile/admin endpoints.

mod model;
mod service;

pub use model::{User, UserPatch};
pub use service::{UserListFilter, UserService};
