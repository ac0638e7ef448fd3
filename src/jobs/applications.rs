/// Application lifecycle state machine
///
/// Received -> Interview Scheduled | Rejected | Hired
/// Interview Scheduled -> Rejected | Hired
///
/// The transition into Hired carries a side effect on the job's openings
/// counter; that side effect fires at most once per application no matter how
/// often Hired is re-entered, and it commits atomically with the status write.
use crate::{
    db::models::{Application, ApplicationStatus},
    error::{PortalError, PortalResult},
    jobs::JobManager,
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Application manager
#[derive(Clone)]
pub struct ApplicationManager {
    db: SqlitePool,
}

impl ApplicationManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Apply to a job
    ///
    /// Requires a resume on file. The (job, applicant) pair is unique; a
    /// second application surfaces as `DuplicateApplication`. Applying also
    /// removes any saved-job bookmark for the pair in the same transaction:
    /// saving and applying are mutually exclusive end states.
    pub async fn create(&self, job_id: &str, applicant_id: &str) -> PortalResult<Application> {
        let resume_url: Option<Option<String>> =
            sqlx::query_scalar("SELECT resume_url FROM account WHERE id = ?1")
                .bind(applicant_id)
                .fetch_optional(&self.db)
                .await?;

        match resume_url {
            None => return Err(PortalError::NotFound("Account not found".to_string())),
            Some(None) => return Err(PortalError::ResumeRequired),
            Some(Some(ref url)) if url.is_empty() => return Err(PortalError::ResumeRequired),
            Some(Some(_)) => {}
        }

        let job_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job WHERE id = ?1")
            .bind(job_id)
            .fetch_one(&self.db)
            .await?;
        if job_exists == 0 {
            return Err(PortalError::NotFound("Job not found".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO application (id, job_id, applicant_id, status, applied_at)
            VALUES (?1, ?2, ?3, 'Received', ?4)
            "#,
        )
        .bind(&id)
        .bind(job_id)
        .bind(applicant_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if crate::db::is_unique_violation(&e) {
                PortalError::DuplicateApplication
            } else {
                PortalError::Database(e)
            }
        })?;

        sqlx::query("DELETE FROM saved_job WHERE account_id = ?1 AND job_id = ?2")
            .bind(applicant_id)
            .bind(job_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Application {
            id,
            job_id: job_id.to_string(),
            applicant_id: applicant_id.to_string(),
            status: ApplicationStatus::Received,
            applied_at: now,
        })
    }

    /// Withdraw an application
    pub async fn delete(&self, application_id: &str) -> PortalResult<()> {
        let result = sqlx::query("DELETE FROM application WHERE id = ?1")
            .bind(application_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PortalError::NotFound("Application not found".to_string()));
        }

        Ok(())
    }

    /// Get an application by id
    pub async fn get(&self, application_id: &str) -> PortalResult<Application> {
        sqlx::query_as::<_, Application>("SELECT * FROM application WHERE id = ?1")
            .bind(application_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| PortalError::NotFound("Application not found".to_string()))
    }

    /// Transition an application to a new status
    ///
    /// Moving into Hired from any non-Hired status decrements the job's
    /// openings inside the same transaction as the status write; both land or
    /// neither does. The status write is conditional on the status we read,
    /// so a concurrent transition surfaces as a retryable `Conflict` instead
    /// of silently double-firing the decrement.
    ///
    /// Hiring into a job with zero openings left still succeeds; the
    /// decrement is skipped and a warning logged.
    pub async fn transition(
        &self,
        application_id: &str,
        new_status: ApplicationStatus,
    ) -> PortalResult<Application> {
        let current = self.get(application_id).await?;

        let mut tx = self.db.begin().await?;

        // Optimistic guard: write only if the stored status is still the one
        // we based the decision on.
        let result = sqlx::query("UPDATE application SET status = ?1 WHERE id = ?2 AND status = ?3")
            .bind(new_status)
            .bind(application_id)
            .bind(current.status)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PortalError::Conflict(
                "Application was modified concurrently, retry".to_string(),
            ));
        }

        if new_status == ApplicationStatus::Hired && current.status != ApplicationStatus::Hired {
            match JobManager::decrement_if_positive(&mut tx, &current.job_id).await? {
                Some((remaining, closed_now)) => {
                    if closed_now {
                        tracing::info!(job_id = %current.job_id, "last opening filled, job closed");
                    } else {
                        tracing::debug!(job_id = %current.job_id, remaining, "opening filled");
                    }
                }
                None => {
                    tracing::warn!(
                        job_id = %current.job_id,
                        application_id,
                        "hire recorded for a job with no openings remaining"
                    );
                }
            }
        }

        tx.commit().await?;

        Ok(Application {
            status: new_status,
            ..current
        })
    }
}
