/// Job postings and the openings tracker
///
/// `number_of_openings` is a finite shared resource raced over by concurrent
/// hires. Every mutation of it is a conditional update keyed on the current
/// value still satisfying the precondition, never a blind overwrite.

pub mod applications;

pub use applications::ApplicationManager;

use crate::{
    db::models::{Job, JobStatus},
    error::{PortalError, PortalResult},
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Job manager
#[derive(Clone)]
pub struct JobManager {
    db: SqlitePool,
}

impl JobManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a job posting
    pub async fn create_job(
        &self,
        posted_by: &str,
        title: &str,
        number_of_openings: i64,
    ) -> PortalResult<Job> {
        if number_of_openings < 0 {
            return Err(PortalError::Validation(
                "Number of openings cannot be negative".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let status = if number_of_openings == 0 {
            JobStatus::Closed
        } else {
            JobStatus::Active
        };

        sqlx::query(
            r#"
            INSERT INTO job (id, posted_by, title, status, number_of_openings, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&id)
        .bind(posted_by)
        .bind(title)
        .bind(status)
        .bind(number_of_openings)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(Job {
            id,
            posted_by: posted_by.to_string(),
            title: title.to_string(),
            status,
            number_of_openings,
            created_at: now,
        })
    }

    /// Get a job by id
    pub async fn get_job(&self, job_id: &str) -> PortalResult<Job> {
        sqlx::query_as::<_, Job>("SELECT * FROM job WHERE id = ?1")
            .bind(job_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| PortalError::NotFound("Job not found".to_string()))
    }

    /// Set the openings count, keeping status consistent with it
    ///
    /// Raising openings above zero on a closed job reopens it; setting zero
    /// closes it. One statement so the count and status never drift apart.
    pub async fn set_openings(&self, job_id: &str, openings: i64) -> PortalResult<Job> {
        if openings < 0 {
            return Err(PortalError::Validation(
                "Number of openings cannot be negative".to_string(),
            ));
        }

        let result = sqlx::query(
            r#"
            UPDATE job
            SET number_of_openings = ?1,
                status = CASE
                    WHEN ?1 = 0 THEN 'closed'
                    WHEN status = 'closed' AND ?1 > 0 THEN 'active'
                    ELSE status
                END
            WHERE id = ?2
            "#,
        )
        .bind(openings)
        .bind(job_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PortalError::NotFound("Job not found".to_string()));
        }

        self.get_job(job_id).await
    }

    /// Decrement openings if any remain, closing the job when the last one
    /// goes
    ///
    /// Runs on the caller's open transaction so the decrement and the related
    /// application-status write commit or roll back together. The `WHERE
    /// number_of_openings > 0` predicate is the race guard: two concurrent
    /// hires past a single remaining opening cannot both match it.
    ///
    /// Returns None when no openings remained (decrement skipped).
    pub async fn decrement_if_positive(
        conn: &mut sqlx::SqliteConnection,
        job_id: &str,
    ) -> PortalResult<Option<(i64, bool)>> {
        let result = sqlx::query(
            "UPDATE job SET number_of_openings = number_of_openings - 1
             WHERE id = ?1 AND number_of_openings > 0",
        )
        .bind(job_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let remaining: i64 =
            sqlx::query_scalar("SELECT number_of_openings FROM job WHERE id = ?1")
                .bind(job_id)
                .fetch_one(&mut *conn)
                .await?;

        let closed_now = remaining == 0;
        if closed_now {
            sqlx::query("UPDATE job SET status = 'closed' WHERE id = ?1")
                .bind(job_id)
                .execute(&mut *conn)
                .await?;
        }

        Ok(Some((remaining, closed_now)))
    }

    /// Bookmark a job for later
    pub async fn save_job(&self, account_id: &str, job_id: &str) -> PortalResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO saved_job (account_id, job_id, saved_at) VALUES (?1, ?2, ?3)",
        )
        .bind(account_id)
        .bind(job_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Whether the account has this job bookmarked
    pub async fn is_job_saved(&self, account_id: &str, job_id: &str) -> PortalResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM saved_job WHERE account_id = ?1 AND job_id = ?2",
        )
        .bind(account_id)
        .bind(job_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_account_manager, test_pool};

    #[tokio::test]
    async fn test_openings_and_status_stay_consistent() {
        let (pool, _dir) = test_pool().await;
        let accounts = test_account_manager(&pool);
        let jobs = JobManager::new(pool.clone());
        let poster = accounts.seed_poster().await;

        let job = jobs.create_job(&poster.id, "Backend Engineer", 2).await.unwrap();
        assert_eq!(job.status, JobStatus::Active);

        // Closing by draining openings
        let job = jobs.set_openings(&job.id, 0).await.unwrap();
        assert_eq!(job.status, JobStatus::Closed);
        assert_eq!(job.number_of_openings, 0);

        // Reopening by raising openings above zero
        let job = jobs.set_openings(&job.id, 3).await.unwrap();
        assert_eq!(job.status, JobStatus::Active);
        assert_eq!(job.number_of_openings, 3);
    }

    #[tokio::test]
    async fn test_create_job_with_zero_openings_starts_closed() {
        let (pool, _dir) = test_pool().await;
        let accounts = test_account_manager(&pool);
        let jobs = JobManager::new(pool.clone());
        let poster = accounts.seed_poster().await;

        let job = jobs.create_job(&poster.id, "Filled Role", 0).await.unwrap();
        assert_eq!(job.status, JobStatus::Closed);
    }

    #[tokio::test]
    async fn test_decrement_if_positive_floors_at_zero() {
        let (pool, _dir) = test_pool().await;
        let accounts = test_account_manager(&pool);
        let jobs = JobManager::new(pool.clone());
        let poster = accounts.seed_poster().await;

        let job = jobs.create_job(&poster.id, "Solo Role", 1).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let first = JobManager::decrement_if_positive(&mut conn, &job.id)
            .await
            .unwrap();
        assert_eq!(first, Some((0, true)));

        let second = JobManager::decrement_if_positive(&mut conn, &job.id)
            .await
            .unwrap();
        assert_eq!(second, None);

        let job = jobs.get_job(&job.id).await.unwrap();
        assert_eq!(job.number_of_openings, 0);
        assert_eq!(job.status, JobStatus::Closed);
    }
}
