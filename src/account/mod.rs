/// Account management system
///
/// Handles account provisioning, the referral-gated login state machine,
/// session token minting, and password/onboarding state changes.

mod manager;

pub use manager::AccountManager;

use crate::db::models::{AccountStatus, OnboardingStatus, Role};
use serde::{Deserialize, Serialize};

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub first_login: bool,
    pub role: Role,
    pub onboarding_status: OnboardingStatus,
}

/// Password change request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Account creation request (admin / referrer initiated)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Session token claims
///
/// The token is the only thing downstream routes see; it carries the account
/// state snapshot taken at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// Account id
    pub sub: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub first_login: bool,
    pub is_super_admin: bool,
    pub onboarding_status: OnboardingStatus,
    pub status: AccountStatus,
    /// Issued-at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}
