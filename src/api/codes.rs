/// Access code endpoints
use crate::{
    auth::{AdminAuthContext, AuthContext},
    context::AppContext,
    db::models::{AccessCode, Role},
    error::{PortalError, PortalResult},
};
use axum::{extract::State, routing::post, Json, Router};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

/// Build access code routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/admin/access-codes", post(issue_code).get(list_codes))
}

/// Issue request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCodeRequest {
    pub candidate_email: String,
    /// Overrides the configured default validity window
    pub validity_days: Option<i64>,
}

/// Access code as exposed to administrative listings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCodeView {
    pub code: String,
    pub candidate_email: String,
    pub expires_at: chrono::DateTime<Utc>,
    pub generated_by_admin_id: String,
    pub is_used: bool,
    pub used_by: Option<String>,
    pub used_at: Option<chrono::DateTime<Utc>>,
    /// Recomputed from is_used and expires_at at read time, never stored
    pub status: String,
}

impl AccessCodeView {
    fn from_record(record: AccessCode, now: chrono::DateTime<Utc>) -> Self {
        let status = record.status_label(now).to_string();
        Self {
            code: record.code,
            candidate_email: record.candidate_email,
            expires_at: record.expires_at,
            generated_by_admin_id: record.generated_by,
            is_used: record.is_used,
            used_by: record.used_by,
            used_at: record.used_at,
            status,
        }
    }
}

/// Issue an access code (admin or referrer)
async fn issue_code(
    auth: AuthContext,
    State(ctx): State<AppContext>,
    Json(req): Json<IssueCodeRequest>,
) -> PortalResult<Json<AccessCodeView>> {
    if auth.claims.role != Role::Admin && auth.claims.role != Role::Referrer {
        return Err(PortalError::Authorization(
            "Only admins and referrers can issue access codes".to_string(),
        ));
    }

    let validity_days = req
        .validity_days
        .unwrap_or(ctx.config.access_codes.default_validity_days);
    if validity_days <= 0 {
        return Err(PortalError::Validation(
            "Validity must be positive".to_string(),
        ));
    }

    let (code, temp_password) = ctx
        .access_code_manager
        .issue(
            &ctx.account_manager,
            &req.candidate_email,
            &auth.account_id,
            Duration::days(validity_days),
        )
        .await?;

    // Delivery is best-effort; issuance already committed
    if ctx.mailer.is_configured() {
        if let Err(e) = ctx
            .mailer
            .send_access_code_email(
                &req.candidate_email,
                &code.code,
                code.expires_at,
                temp_password.as_deref(),
            )
            .await
        {
            tracing::warn!(email = %req.candidate_email, "failed to send access code email: {}", e);
        }
    }

    Ok(Json(AccessCodeView::from_record(code, Utc::now())))
}

/// List all access codes (admin only)
async fn list_codes(
    _admin: AdminAuthContext,
    State(ctx): State<AppContext>,
) -> PortalResult<Json<Vec<AccessCodeView>>> {
    let now = Utc::now();
    let codes = ctx
        .access_code_manager
        .list_codes()
        .await?
        .into_iter()
        .map(|record| AccessCodeView::from_record(record, now))
        .collect();

    Ok(Json(codes))
}
