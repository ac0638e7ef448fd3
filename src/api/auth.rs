/// Authentication endpoints
use crate::{
    account::{ChangePasswordRequest, CreateAccountRequest, LoginRequest, LoginResponse},
    auth::{AdminAuthContext, AuthContext},
    context::AppContext,
    error::{PortalError, PortalResult},
};
use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use serde_json::json;

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/change-password", post(change_password))
        .route("/api/auth/complete-onboarding", post(complete_onboarding))
        .route("/api/accounts", post(create_account))
}

/// Login endpoint
///
/// Runs credential verification and the referral gate; all failure modes
/// collapse into a generic response in the error mapping.
async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> PortalResult<Json<LoginResponse>> {
    let (account, token) = ctx
        .account_manager
        .login(&ctx.access_code_manager, &req.email, &req.password)
        .await
        .map_err(|e| {
            // Internally distinct for audit; the response stays generic
            tracing::info!(email = %req.email, error = %e, "login rejected");
            e
        })?;

    Ok(Json(LoginResponse {
        token,
        first_login: account.first_login,
        role: account.role,
        onboarding_status: account.onboarding_status,
    }))
}

/// Change password; clears the first-login flag
async fn change_password(
    auth: AuthContext,
    State(ctx): State<AppContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> PortalResult<Json<serde_json::Value>> {
    ctx.account_manager
        .change_password(&auth.account_id, &req.current_password, &req.new_password)
        .await?;

    Ok(Json(json!({ "success": true })))
}

/// Mark onboarding as completed for the calling seeker
async fn complete_onboarding(
    auth: AuthContext,
    State(ctx): State<AppContext>,
) -> PortalResult<Json<serde_json::Value>> {
    ctx.account_manager
        .complete_onboarding(&auth.account_id)
        .await?;

    Ok(Json(json!({ "success": true })))
}

/// Create an account (admin only)
async fn create_account(
    admin: AdminAuthContext,
    State(ctx): State<AppContext>,
    Json(req): Json<CreateAccountRequest>,
) -> PortalResult<Json<serde_json::Value>> {
    if req.password.len() < 8 {
        return Err(PortalError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let account = ctx
        .account_manager
        .create_account(
            &req.email,
            &req.username,
            &req.password,
            req.role,
            Some(&admin.account_id),
        )
        .await?;

    Ok(Json(json!({
        "id": account.id,
        "email": account.email,
        "role": account.role,
    })))
}
