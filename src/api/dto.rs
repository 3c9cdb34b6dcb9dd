//! Data Transfer Objects
//!
//! Request and response types for the platform's auth endpoints. Profile
//! and telemetry types live with their services.

use serde::{Deserialize, Serialize};

// ============================================
// AUTH DTOs
// ============================================

/// Credential exchange request
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response from `/auth/login`: either tokens or a two-factor challenge
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,

    /// Set when the account requires a second factor before tokens are issued
    #[serde(default)]
    pub two_factor_required: bool,

    /// Server-declared role, merged into the fetched profile
    #[serde(default)]
    pub role: Option<String>,
}

/// Account creation request
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Response from `/auth/refresh` and `/auth/2fa/verify`
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

// ============================================
// TWO-FACTOR DTOs
// ============================================

/// Request a verification code dispatch
#[derive(Debug, Serialize)]
pub struct TwoFactorSendRequest {
    pub method: String,
}

/// Submit a collected verification code
#[derive(Debug, Serialize)]
pub struct TwoFactorVerifyRequest {
    pub method: String,
    pub code: String,
}

// ============================================
// PASSWORD DTOs
// ============================================

/// Password change, sent through the profile PATCH endpoint
#[derive(Debug, Serialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub password: String,
}
