//! Two-Factor Step-Up Flow
//!
//! Secondary login path: after primary credential verification the server
//! may answer with a challenge instead of tokens. The flow is three states:
//! select a delivery method, await the dispatched code, verify it. Code
//! expiry and resend throttling are server concerns.

use std::sync::Arc;

use crate::api::dto::{TokenResponse, TwoFactorSendRequest, TwoFactorVerifyRequest};
use crate::api::{decode, ApiClient, ApiError, ApiResult};
use crate::validate;

const SEND_PATH: &str = "/auth/2fa/send";
const VERIFY_PATH: &str = "/auth/2fa/verify";

/// Delivery channel for the verification code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoFactorMethod {
    Email,
    Sms,
}

impl TwoFactorMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TwoFactorMethod::Email => "email",
            TwoFactorMethod::Sms => "sms",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Some(TwoFactorMethod::Email),
            "sms" => Some(TwoFactorMethod::Sms),
            _ => None,
        }
    }
}

impl std::fmt::Display for TwoFactorMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the flow currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoFactorState {
    SelectingMethod,
    CodeSent { method: TwoFactorMethod },
    Verified,
}

/// A single step-up attempt following a challenged login.
pub struct TwoFactorFlow {
    client: Arc<ApiClient>,
    state: TwoFactorState,
}

impl TwoFactorFlow {
    pub(crate) fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: TwoFactorState::SelectingMethod,
        }
    }

    pub fn state(&self) -> TwoFactorState {
        self.state
    }

    /// Request a code dispatch over the chosen channel.
    ///
    /// Re-sending while awaiting a code is allowed; the server owns any
    /// throttling.
    pub async fn send_code(&mut self, method: TwoFactorMethod) -> ApiResult<()> {
        if self.state == TwoFactorState::Verified {
            return Err(ApiError::Validation(
                "Verification already completed".to_string(),
            ));
        }

        self.client
            .post_json(
                SEND_PATH,
                &TwoFactorSendRequest {
                    method: method.as_str().to_string(),
                },
            )
            .await?;

        self.state = TwoFactorState::CodeSent { method };
        Ok(())
    }

    /// Submit the collected 6-digit code; returns the access token.
    pub async fn verify(&mut self, code: &str) -> ApiResult<String> {
        let TwoFactorState::CodeSent { method } = self.state else {
            return Err(ApiError::Validation(
                "Request a verification code first".to_string(),
            ));
        };

        validate::validate_two_factor_code(code)?;

        let payload = self
            .client
            .post_json(
                VERIFY_PATH,
                &TwoFactorVerifyRequest {
                    method: method.as_str().to_string(),
                    code: code.to_string(),
                },
            )
            .await?;

        let token: TokenResponse = decode(payload)?;
        self.state = TwoFactorState::Verified;
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClientConfig;
    use crate::session::{MemorySessionStore, SessionStore};
    use serde_json::json;
    use wiremock::matchers::{body_json, method as http_method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn flow_for(server: &MockServer) -> TwoFactorFlow {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let client = Arc::new(ApiClient::new(
            ApiClientConfig {
                base_url: format!("{}/api", server.uri()),
                request_timeout_ms: 5_000,
            },
            store,
        ));
        TwoFactorFlow::new(client)
    }

    #[tokio::test]
    async fn test_happy_path_send_then_verify() {
        let server = MockServer::start().await;

        Mock::given(http_method("POST"))
            .and(url_path("/api/auth/2fa/send"))
            .and(body_json(json!({"method": "email"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(http_method("POST"))
            .and(url_path("/api/auth/2fa/verify"))
            .and(body_json(json!({"method": "email", "code": "123456"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": "stepped-up"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut flow = flow_for(&server);
        assert_eq!(flow.state(), TwoFactorState::SelectingMethod);

        flow.send_code(TwoFactorMethod::Email).await.unwrap();
        assert_eq!(
            flow.state(),
            TwoFactorState::CodeSent {
                method: TwoFactorMethod::Email
            }
        );

        let token = flow.verify("123456").await.unwrap();
        assert_eq!(token, "stepped-up");
        assert_eq!(flow.state(), TwoFactorState::Verified);
    }

    #[tokio::test]
    async fn test_verify_before_send_is_rejected() {
        let server = MockServer::start().await;
        let mut flow = flow_for(&server);

        let err = flow.verify("123456").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(flow.state(), TwoFactorState::SelectingMethod);
    }

    #[tokio::test]
    async fn test_malformed_code_never_reaches_the_wire() {
        let server = MockServer::start().await;

        Mock::given(http_method("POST"))
            .and(url_path("/api/auth/2fa/send"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        Mock::given(http_method("POST"))
            .and(url_path("/api/auth/2fa/verify"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut flow = flow_for(&server);
        flow.send_code(TwoFactorMethod::Sms).await.unwrap();

        let err = flow.verify("12ab56").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_resend_keeps_awaiting_code() {
        let server = MockServer::start().await;

        Mock::given(http_method("POST"))
            .and(url_path("/api/auth/2fa/send"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let mut flow = flow_for(&server);
        flow.send_code(TwoFactorMethod::Email).await.unwrap();
        flow.send_code(TwoFactorMethod::Sms).await.unwrap();

        assert_eq!(
            flow.state(),
            TwoFactorState::CodeSent {
                method: TwoFactorMethod::Sms
            }
        );
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!(TwoFactorMethod::parse("Email"), Some(TwoFactorMethod::Email));
        assert_eq!(TwoFactorMethod::parse("SMS"), Some(TwoFactorMethod::Sms));
        assert_eq!(TwoFactorMethod::parse("carrier pigeon"), None);
    }
}
