/// Job and application endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    db::models::{Application, ApplicationStatus, Job, Role},
    error::{PortalError, PortalResult},
};
use axum::{
    extract::{Path, State},
    routing::{delete, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build job and application routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/jobs", post(create_job))
        .route("/api/jobs/:job_id/apply", post(apply))
        .route("/api/jobs/:job_id/save", post(save_job))
        .route("/api/jobs/:job_id/openings", put(set_openings))
        .route("/api/applications/:id", delete(withdraw))
        .route("/api/applications/:id/status", put(update_status))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: String,
    pub number_of_openings: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetOpeningsRequest {
    pub number_of_openings: i64,
}

/// Status comes in as the raw label so anything outside the closed set is
/// rejected at the boundary with a validation error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Create a job posting (poster or admin)
async fn create_job(
    auth: AuthContext,
    State(ctx): State<AppContext>,
    Json(req): Json<CreateJobRequest>,
) -> PortalResult<Json<Job>> {
    if auth.claims.role != Role::Poster && auth.claims.role != Role::Admin {
        return Err(PortalError::Authorization(
            "Only posters and admins can create jobs".to_string(),
        ));
    }

    if req.title.trim().is_empty() {
        return Err(PortalError::Validation("Title cannot be empty".to_string()));
    }

    let job = ctx
        .job_manager
        .create_job(&auth.account_id, req.title.trim(), req.number_of_openings)
        .await?;

    Ok(Json(job))
}

/// Apply to a job (calling seeker is the applicant)
async fn apply(
    auth: AuthContext,
    Path(job_id): Path<String>,
    State(ctx): State<AppContext>,
) -> PortalResult<Json<Application>> {
    if auth.claims.role != Role::Seeker {
        return Err(PortalError::Authorization(
            "Only seekers can apply to jobs".to_string(),
        ));
    }

    let application = ctx
        .application_manager
        .create(&job_id, &auth.account_id)
        .await?;

    Ok(Json(application))
}

/// Bookmark a job for later
async fn save_job(
    auth: AuthContext,
    Path(job_id): Path<String>,
    State(ctx): State<AppContext>,
) -> PortalResult<Json<serde_json::Value>> {
    ctx.job_manager.get_job(&job_id).await?;
    ctx.job_manager.save_job(&auth.account_id, &job_id).await?;

    Ok(Json(serde_json::json!({ "saved": true })))
}

/// Adjust a job's openings (job's poster or admin); reopens or closes the job
async fn set_openings(
    auth: AuthContext,
    Path(job_id): Path<String>,
    State(ctx): State<AppContext>,
    Json(req): Json<SetOpeningsRequest>,
) -> PortalResult<Json<Job>> {
    let job = ctx.job_manager.get_job(&job_id).await?;
    authorize_job_mutation(&auth, &job)?;

    let job = ctx
        .job_manager
        .set_openings(&job_id, req.number_of_openings)
        .await?;

    Ok(Json(job))
}

/// Withdraw an application (the applicant or an admin)
async fn withdraw(
    auth: AuthContext,
    Path(application_id): Path<String>,
    State(ctx): State<AppContext>,
) -> PortalResult<Json<serde_json::Value>> {
    let application = ctx.application_manager.get(&application_id).await?;
    if auth.claims.role != Role::Admin && application.applicant_id != auth.account_id {
        return Err(PortalError::Authorization(
            "Only the applicant or an admin may withdraw an application".to_string(),
        ));
    }

    ctx.application_manager.delete(&application_id).await?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Transition an application's status (job's poster or admin)
async fn update_status(
    auth: AuthContext,
    Path(application_id): Path<String>,
    State(ctx): State<AppContext>,
    Json(req): Json<UpdateStatusRequest>,
) -> PortalResult<Json<Application>> {
    let new_status = ApplicationStatus::parse(&req.status)?;

    let application = ctx.application_manager.get(&application_id).await?;
    let job = ctx.job_manager.get_job(&application.job_id).await?;
    authorize_job_mutation(&auth, &job)?;

    let application = ctx
        .application_manager
        .transition(&application_id, new_status)
        .await?;

    Ok(Json(application))
}

fn authorize_job_mutation(auth: &AuthContext, job: &Job) -> PortalResult<()> {
    if auth.claims.role == Role::Admin || job.posted_by == auth.account_id {
        return Ok(());
    }

    Err(PortalError::Authorization(
        "Only the job's poster or an admin may do this".to_string(),
    ))
}
