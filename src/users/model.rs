//! User Records
//!
//! The canonical profile record mirrored from the server, and the partial
//! patch used for shallow merges. Wire field names match the platform API
//! exactly, including its mixed camel/snake casing.

use crate::session::Role;
use serde::{Deserialize, Serialize};

/// The authenticated user's profile as declared by the server.
///
/// The client never computes this record, it only caches what the server
/// returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,

    pub email: String,

    /// Avatar URL, if one has been uploaded
    #[serde(default)]
    pub avatar: Option<String>,

    #[serde(default)]
    pub bio: Option<String>,

    /// Server-declared role; absent for accounts created before roles existed
    #[serde(default)]
    pub role: Option<Role>,

    #[serde(default, rename = "emailVerified")]
    pub email_verified: bool,

    #[serde(default)]
    pub two_factor_enabled: bool,
}

impl User {
    /// Shallow-merge a partial patch into this record.
    ///
    /// Only fields present in the patch are touched; the password field is
    /// write-only and never lands on the cached record.
    pub fn apply(&mut self, patch: &UserPatch) {
        if let Some(username) = &patch.username {
            self.username = username.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(avatar) = &patch.avatar {
            self.avatar = Some(avatar.clone());
        }
        if let Some(bio) = &patch.bio {
            self.bio = Some(bio.clone());
        }
    }
}

/// Partial user update sent to the profile PATCH endpoints.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// Write-only; set by password-change calls, never mirrored locally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.avatar.is_none()
            && self.bio.is_none()
            && self.password.is_none()
    }
}
