//! Session Manager
//!
//! Owns the in-memory current user and its mirror in the session store.
//! Constructed once at process start and handed to consumers by reference;
//! there is no ambient global state.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::api::dto::{LoginRequest, LoginResponse, RegisterRequest};
use crate::api::{decode, ApiClient, ApiError, ApiResult, LOGIN_PATH};
use crate::session::role::{landing_destination, Destination, Role};
use crate::session::store::SessionStore;
use crate::session::two_factor::TwoFactorFlow;
use crate::users::{User, UserPatch};
use crate::validate;

const REGISTER_PATH: &str = "/auth/register";
const ME_PATH: &str = "/user/me";

/// Result of a credential exchange
pub enum LoginOutcome {
    /// Tokens were issued and the profile adopted
    LoggedIn(User),
    /// The account requires a second factor; drive the returned flow, then
    /// call [`SessionManager::complete_two_factor`]
    TwoFactorRequired(TwoFactorFlow),
}

impl std::fmt::Debug for LoginOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginOutcome::LoggedIn(user) => f.debug_tuple("LoggedIn").field(user).finish(),
            LoginOutcome::TwoFactorRequired(_) => {
                f.debug_tuple("TwoFactorRequired").finish_non_exhaustive()
            }
        }
    }
}

/// The process-wide session state, explicitly constructed and shared.
pub struct SessionManager {
    client: Arc<ApiClient>,
    store: Arc<dyn SessionStore>,
    current: RwLock<Option<User>>,
}

impl SessionManager {
    /// Create a manager sharing the client's session store.
    pub fn new(client: Arc<ApiClient>) -> Self {
        let store = client.store().clone();
        Self {
            client,
            store,
            current: RwLock::new(None),
        }
    }

    pub async fn current_user(&self) -> Option<User> {
        self.current.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Where the current session lands, per the role policy.
    pub async fn landing_destination(&self) -> Destination {
        landing_destination(self.current.read().await.as_ref())
    }

    /// Restore the session at startup.
    ///
    /// With a stored token, the canonical profile is fetched and adopted.
    /// If the fetch fails for anything short of an expired session, the last
    /// stored snapshot is served instead; availability over freshness.
    pub async fn rehydrate(&self) -> ApiResult<Option<User>> {
        if self.store.access_token().await?.is_none() {
            *self.current.write().await = None;
            return Ok(None);
        }

        match self.fetch_me().await {
            Ok(user) => {
                self.adopt_user(user.clone()).await?;
                Ok(Some(user))
            }
            Err(ApiError::SessionExpired) => {
                *self.current.write().await = None;
                Ok(None)
            }
            Err(e) => match self.store.cached_user().await? {
                Some(user) => {
                    tracing::warn!("Profile fetch failed, serving cached session: {}", e);
                    *self.current.write().await = Some(user.clone());
                    Ok(Some(user))
                }
                None => Err(e),
            },
        }
    }

    /// Exchange credentials for a session.
    ///
    /// On success the access token is persisted, the full profile fetched,
    /// and the server-declared role merged in before the composite user is
    /// adopted. Accounts with a second factor get a challenge instead.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<LoginOutcome> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let payload = match self.client.post_json(LOGIN_PATH, &request).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Login failed for {}: {}", username, e);
                return Err(e);
            }
        };

        let response: LoginResponse = decode(payload)?;

        if response.two_factor_required {
            tracing::info!("Two-factor verification required for {}", username);
            return Ok(LoginOutcome::TwoFactorRequired(TwoFactorFlow::new(
                self.client.clone(),
            )));
        }

        let token = response.access_token.ok_or_else(|| {
            ApiError::UnexpectedResponse(
                "login response carried neither tokens nor a challenge".to_string(),
            )
        })?;
        self.store.set_access_token(&token).await?;

        let mut user = self.fetch_me().await?;
        if let Some(role) = &response.role {
            user.role = Some(Role::parse(role));
        }

        self.adopt_user(user.clone()).await?;
        tracing::info!("Signed in as {}", user.username);
        Ok(LoginOutcome::LoggedIn(user))
    }

    /// Create an account. Does not authenticate; the caller signs in
    /// separately.
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> ApiResult<()> {
        validate::validate_username(username)?;
        validate::validate_email(email)?;
        validate::validate_password(password)?;

        self.client
            .post_json(
                REGISTER_PATH,
                &RegisterRequest {
                    username: username.to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                },
            )
            .await?;

        tracing::info!("Account {} registered", username);
        Ok(())
    }

    /// Finish a two-factor login with the token the flow produced.
    pub async fn complete_two_factor(&self, access_token: &str) -> ApiResult<User> {
        self.store.set_access_token(access_token).await?;
        match self.rehydrate().await? {
            Some(user) => Ok(user),
            None => Err(ApiError::SessionExpired),
        }
    }

    /// Drop the session locally. Token invalidation is implicit; no server
    /// call is made.
    pub async fn logout(&self) -> ApiResult<()> {
        *self.current.write().await = None;
        self.store.clear().await?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Shallow-merge a partial user into the current session and re-persist
    /// the mirror. Service-layer updates should prefer [`adopt_user`] with
    /// the server's response.
    ///
    /// [`adopt_user`]: SessionManager::adopt_user
    pub async fn update_current_user(&self, patch: &UserPatch) -> ApiResult<User> {
        let updated = {
            let mut current = self.current.write().await;
            let user = current.as_mut().ok_or(ApiError::NotAuthenticated)?;
            user.apply(patch);
            user.clone()
        };

        self.store.set_user(Some(&updated)).await?;
        Ok(updated)
    }

    /// Adopt a server-declared user record as the current session.
    pub async fn adopt_user(&self, user: User) -> ApiResult<()> {
        self.store.set_user(Some(&user)).await?;
        *self.current.write().await = Some(user);
        Ok(())
    }

    async fn fetch_me(&self) -> ApiResult<User> {
        decode(self.client.get(ME_PATH).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClientConfig;
    use crate::session::MemorySessionStore;
    use serde_json::json;
    use wiremock::matchers::{method as http_method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager_for(server: &MockServer) -> SessionManager {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let client = Arc::new(ApiClient::new(
            ApiClientConfig {
                base_url: format!("{}/api", server.uri()),
                request_timeout_ms: 5_000,
            },
            store,
        ));
        SessionManager::new(client)
    }

    fn me_body() -> serde_json::Value {
        json!({
            "username": "ada",
            "email": "ada@example.com",
            "bio": "compiler enthusiast",
            "emailVerified": true,
            "two_factor_enabled": false
        })
    }

    #[tokio::test]
    async fn test_login_persists_token_and_merges_role() {
        let server = MockServer::start().await;

        Mock::given(http_method("POST"))
            .and(url_path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"access_token": "tok-1", "role": "ADMIN"}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(http_method("GET"))
            .and(url_path("/api/user/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(me_body()))
            .expect(1)
            .mount(&server)
            .await;

        let manager = manager_for(&server);
        let outcome = manager.login("ada", "pw").await.unwrap();

        let LoginOutcome::LoggedIn(user) = outcome else {
            panic!("expected a completed login");
        };
        assert_eq!(user.role, Some(Role::Admin));
        assert_eq!(
            manager.landing_destination().await,
            Destination::AdminDashboard
        );

        let snapshot = manager.store.load().await.unwrap();
        assert_eq!(snapshot.access_token.as_deref(), Some("tok-1"));
        assert_eq!(snapshot.user.unwrap().role, Some(Role::Admin));
    }

    #[tokio::test]
    async fn test_login_surfaces_two_factor_challenge() {
        let server = MockServer::start().await;

        Mock::given(http_method("POST"))
            .and(url_path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"two_factor_required": true})),
            )
            .mount(&server)
            .await;

        let manager = manager_for(&server);
        let outcome = manager.login("ada", "pw").await.unwrap();

        assert!(matches!(outcome, LoginOutcome::TwoFactorRequired(_)));
        assert!(!manager.is_authenticated().await);
        assert!(manager.store.access_token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_login_leaves_no_session() {
        let server = MockServer::start().await;

        Mock::given(http_method("POST"))
            .and(url_path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "bad credentials"})),
            )
            .mount(&server)
            .await;

        let manager = manager_for(&server);
        let err = manager.login("ada", "wrong").await.unwrap_err();

        assert!(matches!(err, ApiError::Api { status: 401, .. }));
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_rehydrate_serves_cached_user_when_fetch_fails() {
        let server = MockServer::start().await;

        Mock::given(http_method("GET"))
            .and(url_path("/api/user/me"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let manager = manager_for(&server);
        manager.store.set_access_token("tok-1").await.unwrap();
        let cached: User = serde_json::from_value(me_body()).unwrap();
        manager.store.set_user(Some(&cached)).await.unwrap();

        let user = manager.rehydrate().await.unwrap().unwrap();
        assert_eq!(user.username, "ada");
        assert!(manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_rehydrate_without_token_is_signed_out() {
        let server = MockServer::start().await;
        let manager = manager_for(&server);

        assert!(manager.rehydrate().await.unwrap().is_none());
        assert_eq!(manager.landing_destination().await, Destination::SignIn);
    }

    #[tokio::test]
    async fn test_rehydrate_expired_session_clears_state() {
        let server = MockServer::start().await;

        Mock::given(http_method("GET"))
            .and(url_path("/api/user/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        Mock::given(http_method("POST"))
            .and(url_path("/api/auth/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let manager = manager_for(&server);
        manager.store.set_access_token("stale").await.unwrap();
        let cached: User = serde_json::from_value(me_body()).unwrap();
        manager.store.set_user(Some(&cached)).await.unwrap();

        assert!(manager.rehydrate().await.unwrap().is_none());
        assert!(!manager.is_authenticated().await);

        let snapshot = manager.store.load().await.unwrap();
        assert!(snapshot.access_token.is_none());
        assert!(snapshot.user.is_none());
    }

    #[tokio::test]
    async fn test_update_current_user_merges_and_mirrors() {
        let server = MockServer::start().await;
        let manager = manager_for(&server);

        let user: User = serde_json::from_value(me_body()).unwrap();
        manager.adopt_user(user).await.unwrap();

        let patch = UserPatch {
            bio: Some("x".to_string()),
            ..Default::default()
        };
        let updated = manager.update_current_user(&patch).await.unwrap();

        assert_eq!(updated.bio.as_deref(), Some("x"));
        assert_eq!(updated.username, "ada");
        assert_eq!(updated.email, "ada@example.com");
        assert!(updated.email_verified);

        let mirrored = manager.store.cached_user().await.unwrap().unwrap();
        assert_eq!(mirrored, updated);
    }

    #[tokio::test]
    async fn test_update_current_user_requires_session() {
        let server = MockServer::start().await;
        let manager = manager_for(&server);

        let patch = UserPatch {
            bio: Some("x".to_string()),
            ..Default::default()
        };
        let err = manager.update_current_user(&patch).await.unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_signup_does_not_authenticate() {
        let server = MockServer::start().await;

        Mock::given(http_method("POST"))
            .and(url_path("/api/auth/register"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let manager = manager_for(&server);
        manager
            .signup("grace", "grace@example.com", "S3cret!pw")
            .await
            .unwrap();

        assert!(!manager.is_authenticated().await);
        assert!(manager.store.access_token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_signup_validates_before_the_wire() {
        let server = MockServer::start().await;
        let manager = manager_for(&server);

        let err = manager
            .signup("grace", "not-an-email", "S3cret!pw")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_logout_clears_memory_and_store() {
        let server = MockServer::start().await;
        let manager = manager_for(&server);

        manager.store.set_access_token("tok-1").await.unwrap();
        let user: User = serde_json::from_value(me_body()).unwrap();
        manager.adopt_user(user).await.unwrap();

        manager.logout().await.unwrap();

        assert!(!manager.is_authenticated().await);
        let snapshot = manager.store.load().await.unwrap();
        assert!(snapshot.access_token.is_none());
        assert!(snapshot.user.is_none());
        assert!(!snapshot.authenticated);
    }
}
