//! User Service
//!
//! Typed wrappers over the profile and admin endpoints. Update calls return
//! the server's merged record; callers adopt that, not the patch they sent.

use std::sync::Arc;

use crate::api::dto::ChangePasswordRequest;
use crate::api::{decode, ApiClient, ApiError, ApiResult, FilePayload};
use crate::session::Role;
use crate::validate;

use super::model::{User, UserPatch};

const ME_PATH: &str = "/user/me";
const USERS_PATH: &str = "/user";

/// Filters for the admin user listing
#[derive(Debug, Clone, Default)]
pub struct UserListFilter {
    pub search: Option<String>,
    pub role: Option<Role>,
}

impl UserListFilter {
    fn to_query(&self) -> String {
        let mut parts = Vec::new();
        if let Some(search) = &self.search {
            parts.push(format!("search={}", urlencoding::encode(search)));
        }
        if let Some(role) = &self.role {
            parts.push(format!("role={}", role.as_str()));
        }
        parts.join("&")
    }
}

/// Profile and admin operations
pub struct UserService {
    client: Arc<ApiClient>,
}

impl UserService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Fetch the canonical profile of the signed-in user
    pub async fn me(&self) -> ApiResult<User> {
        decode(self.client.get(ME_PATH).await?)
    }

    pub async fn get(&self, id: &str) -> ApiResult<User> {
        decode(self.client.get(&format!("{}/{}", USERS_PATH, id)).await?)
    }

    /// Patch the signed-in user's profile; returns the server-merged record
    pub async fn update_me(&self, patch: &UserPatch) -> ApiResult<User> {
        self.validate_patch(patch)?;
        decode(self.client.patch_json(ME_PATH, patch).await?)
    }

    pub async fn update(&self, id: &str, patch: &UserPatch) -> ApiResult<User> {
        self.validate_patch(patch)?;
        decode(
            self.client
                .patch_json(&format!("{}/{}", USERS_PATH, id), patch)
                .await?,
        )
    }

    pub async fn delete_me(&self) -> ApiResult<()> {
        self.client.delete(ME_PATH).await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.client.delete(&format!("{}/{}", USERS_PATH, id)).await?;
        Ok(())
    }

    /// Change the signed-in user's password through the profile endpoint
    pub async fn change_password(&self, current: &str, new: &str) -> ApiResult<()> {
        validate::validate_password(new)?;
        self.client
            .patch_json(
                ME_PATH,
                &ChangePasswordRequest {
                    current_password: current.to_string(),
                    password: new.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    /// Upload an avatar for the signed-in user; returns the updated record
    pub async fn upload_avatar_me(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> ApiResult<User> {
        self.upload_avatar_to(&format!("{}/avatar", ME_PATH), file_name, mime, bytes)
            .await
    }

    pub async fn upload_avatar(
        &self,
        id: &str,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> ApiResult<User> {
        self.upload_avatar_to(
            &format!("{}/{}/avatar", USERS_PATH, id),
            file_name,
            mime,
            bytes,
        )
        .await
    }

    /// Admin listing of platform users
    pub async fn list(&self, filter: &UserListFilter) -> ApiResult<Vec<User>> {
        let query = filter.to_query();
        let path = if query.is_empty() {
            USERS_PATH.to_string()
        } else {
            format!("{}?{}", USERS_PATH, query)
        };
        decode(self.client.get(&path).await?)
    }

    async fn upload_avatar_to(
        &self,
        path: &str,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> ApiResult<User> {
        let payload = FilePayload {
            field: "avatar".to_string(),
            file_name: file_name.to_string(),
            mime: mime.to_string(),
            bytes,
        };
        decode(self.client.patch_multipart(path, payload).await?)
    }

    fn validate_patch(&self, patch: &UserPatch) -> ApiResult<()> {
        if patch.is_empty() {
            return Err(ApiError::Validation("Nothing to update".to_string()));
        }
        if let Some(username) = &patch.username {
            validate::validate_username(username)?;
        }
        if let Some(email) = &patch.email {
            validate::validate_email(email)?;
        }
        Ok(())
    }
}
