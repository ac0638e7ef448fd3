/// Access code issuance and consumption
///
/// Referral codes gate a seeker's first login. A code is tied to a candidate
/// email, time-boxed, and single-use: it is consumed by exactly one login and
/// kept forever for audit. Expired-but-unused codes are logically dead.
use crate::{
    account::AccountManager,
    db::models::AccessCode,
    error::{PortalError, PortalResult},
};
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sqlx::SqlitePool;

/// Fixed code length over the 62-character alphanumeric alphabet
pub const CODE_LENGTH: usize = 10;

/// Bounded retry budget for the uniqueness loop
const MAX_GENERATION_ATTEMPTS: u32 = 10;

/// Generate a candidate access code
///
/// Uniform over [a-zA-Z0-9]^CODE_LENGTH. Pure; uniqueness is enforced by the
/// store, not here.
pub fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

/// Access code manager
#[derive(Clone)]
pub struct AccessCodeManager {
    db: SqlitePool,
}

impl AccessCodeManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Issue a new access code for a candidate email
    ///
    /// Side effect on the account table first: if no account exists for the
    /// email, a shell seeker account is provisioned with a temporary password
    /// (returned so the caller can mail it); if one exists but has not
    /// completed onboarding and is past its first login, the gate is re-opened
    /// for the fresh code. An account that already completed onboarding is
    /// left untouched.
    ///
    /// The code itself is inserted inside a bounded retry loop. The primary
    /// key on `code` is the uniqueness check against the full persisted code
    /// population; a collision surfaces as a unique violation and is retried
    /// silently, up to `MAX_GENERATION_ATTEMPTS`.
    ///
    /// The account side effect and the code insert share one transaction: a
    /// failed issuance leaves no half-provisioned account behind.
    pub async fn issue(
        &self,
        accounts: &AccountManager,
        candidate_email: &str,
        issued_by: &str,
        validity: Duration,
    ) -> PortalResult<(AccessCode, Option<String>)> {
        let now = Utc::now();
        let expires_at = now + validity;

        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, crate::db::models::Account>(
            "SELECT * FROM account WHERE email = ?1",
        )
        .bind(candidate_email)
        .fetch_optional(&mut *tx)
        .await?;

        let temp_password = match existing {
            None => {
                let (account, temp_password) = accounts
                    .provision_shell_account(&mut tx, candidate_email, issued_by)
                    .await?;
                tracing::info!(
                    account_id = %account.id,
                    email = %candidate_email,
                    "provisioned shell account for access code"
                );
                Some(temp_password)
            }
            Some(account) => {
                if account.onboarding_status != crate::db::models::OnboardingStatus::Completed
                    && !account.first_login
                {
                    // Re-open the first-login gate for the fresh code
                    accounts.reset_first_login_gate(&mut tx, &account.id).await?;
                }
                None
            }
        };

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let code = generate_code();

            let result = sqlx::query(
                r#"
                INSERT INTO access_code (code, candidate_email, expires_at, generated_by, is_used, created_at)
                VALUES (?1, ?2, ?3, ?4, 0, ?5)
                "#,
            )
            .bind(&code)
            .bind(candidate_email)
            .bind(expires_at)
            .bind(issued_by)
            .bind(now)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {
                    tx.commit().await?;
                    return Ok((
                        AccessCode {
                            code,
                            candidate_email: candidate_email.to_string(),
                            expires_at,
                            generated_by: issued_by.to_string(),
                            is_used: false,
                            used_by: None,
                            used_at: None,
                            created_at: now,
                        },
                        temp_password,
                    ));
                }
                Err(e) if crate::db::is_unique_violation(&e) => {
                    tracing::debug!(attempt, "access code collision, retrying");
                    continue;
                }
                Err(e) => return Err(PortalError::Database(e)),
            }
        }

        Err(PortalError::CodeGenerationExhausted)
    }

    /// Consume the oldest valid unused code for an email, marking it used
    ///
    /// The lookup and the mark-used write are one conditional UPDATE so two
    /// concurrent first logins can never both consume the same code: the
    /// `is_used = 0` predicate makes the loser's write match zero rows.
    /// Returns the consumed code, or None when no valid unused code exists.
    pub async fn consume_for_first_login(
        &self,
        candidate_email: &str,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> PortalResult<Option<AccessCode>> {
        let result = sqlx::query(
            r#"
            UPDATE access_code
            SET is_used = 1, used_by = ?1, used_at = ?2
            WHERE code = (
                SELECT code FROM access_code
                WHERE candidate_email = ?3 AND is_used = 0 AND expires_at >= ?2
                ORDER BY created_at ASC
                LIMIT 1
            )
            AND is_used = 0
            "#,
        )
        .bind(account_id)
        .bind(now)
        .bind(candidate_email)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let code = sqlx::query_as::<_, AccessCode>(
            "SELECT * FROM access_code WHERE used_by = ?1 AND used_at = ?2",
        )
        .bind(account_id)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        Ok(Some(code))
    }

    /// Find the code a returning account consumed at its first login
    ///
    /// A re-opened gate can leave an account with more than one consumed
    /// code; the most recent grant governs revocation.
    pub async fn find_linked_code(&self, account_id: &str) -> PortalResult<Option<AccessCode>> {
        let code = sqlx::query_as::<_, AccessCode>(
            "SELECT * FROM access_code WHERE used_by = ?1 ORDER BY used_at DESC LIMIT 1",
        )
        .bind(account_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(code)
    }

    /// Get a code by its value
    pub async fn get_code(&self, code: &str) -> PortalResult<Option<AccessCode>> {
        let record = sqlx::query_as::<_, AccessCode>("SELECT * FROM access_code WHERE code = ?1")
            .bind(code)
            .fetch_optional(&self.db)
            .await?;

        Ok(record)
    }

    /// List all codes, newest first (admin listing)
    pub async fn list_codes(&self) -> PortalResult<Vec<AccessCode>> {
        let codes = sqlx::query_as::<_, AccessCode>(
            "SELECT * FROM access_code ORDER BY created_at DESC",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_account_manager, test_pool};
    use std::collections::HashSet;

    #[test]
    fn test_generate_code_shape() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_codes_are_distinct() {
        let mut codes = HashSet::new();
        for _ in 0..1000 {
            codes.insert(generate_code());
        }
        // 62^10 keyspace; 1000 draws colliding would mean a broken generator
        assert_eq!(codes.len(), 1000);
    }

    #[tokio::test]
    async fn test_issued_codes_are_pairwise_distinct() {
        let (pool, _dir) = test_pool().await;
        let accounts = test_account_manager(&pool);
        let manager = AccessCodeManager::new(pool.clone());
        let admin = accounts.seed_admin().await;

        let mut codes = HashSet::new();
        for i in 0..50 {
            let (code, _) = manager
                .issue(
                    &accounts,
                    &format!("candidate{}@example.com", i),
                    &admin.id,
                    Duration::days(60),
                )
                .await
                .unwrap();
            assert!(!code.is_used);
            assert!(codes.insert(code.code));
        }
    }

    #[tokio::test]
    async fn test_issue_provisions_shell_account() {
        let (pool, _dir) = test_pool().await;
        let accounts = test_account_manager(&pool);
        let manager = AccessCodeManager::new(pool.clone());
        let admin = accounts.seed_admin().await;

        let (code, temp_password) = manager
            .issue(&accounts, "newbie@example.com", &admin.id, Duration::days(60))
            .await
            .unwrap();

        assert!(temp_password.is_some());
        assert_eq!(code.candidate_email, "newbie@example.com");

        let account = accounts
            .get_account_by_email_opt("newbie@example.com")
            .await
            .unwrap()
            .expect("shell account should exist");
        assert_eq!(account.role, crate::db::models::Role::Seeker);
        assert!(account.first_login);
        assert_eq!(
            account.onboarding_status,
            crate::db::models::OnboardingStatus::NotStarted
        );
        assert_eq!(account.created_by.as_deref(), Some(admin.id.as_str()));
    }

    #[tokio::test]
    async fn test_issue_reopens_gate_for_stalled_account() {
        let (pool, _dir) = test_pool().await;
        let accounts = test_account_manager(&pool);
        let manager = AccessCodeManager::new(pool.clone());
        let admin = accounts.seed_admin().await;

        // Shell account that got past first login but never finished onboarding
        let (_, _) = manager
            .issue(&accounts, "stalled@example.com", &admin.id, Duration::days(60))
            .await
            .unwrap();
        let account = accounts
            .get_account_by_email_opt("stalled@example.com")
            .await
            .unwrap()
            .unwrap();
        sqlx::query("UPDATE account SET first_login = 0 WHERE id = ?1")
            .bind(&account.id)
            .execute(&pool)
            .await
            .unwrap();

        let (_, temp_password) = manager
            .issue(&accounts, "stalled@example.com", &admin.id, Duration::days(60))
            .await
            .unwrap();

        // Existing account: no fresh temp password, but the gate re-opens
        assert!(temp_password.is_none());
        let account = accounts
            .get_account_by_email_opt("stalled@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(account.first_login);
        assert_eq!(
            account.onboarding_status,
            crate::db::models::OnboardingStatus::NotStarted
        );
    }

    #[tokio::test]
    async fn test_issue_leaves_onboarded_account_untouched() {
        let (pool, _dir) = test_pool().await;
        let accounts = test_account_manager(&pool);
        let manager = AccessCodeManager::new(pool.clone());
        let admin = accounts.seed_admin().await;

        manager
            .issue(&accounts, "done@example.com", &admin.id, Duration::days(60))
            .await
            .unwrap();
        let account = accounts
            .get_account_by_email_opt("done@example.com")
            .await
            .unwrap()
            .unwrap();
        sqlx::query(
            "UPDATE account SET first_login = 0, onboarding_status = 'completed' WHERE id = ?1",
        )
        .bind(&account.id)
        .execute(&pool)
        .await
        .unwrap();

        manager
            .issue(&accounts, "done@example.com", &admin.id, Duration::days(60))
            .await
            .unwrap();

        let account = accounts
            .get_account_by_email_opt("done@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(!account.first_login);
        assert_eq!(
            account.onboarding_status,
            crate::db::models::OnboardingStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_failed_issue_rolls_back_shell_account() {
        let (pool, _dir) = test_pool().await;
        let accounts = test_account_manager(&pool);
        let manager = AccessCodeManager::new(pool.clone());

        // Nonexistent issuer trips the generated_by foreign key on the code
        // insert, after the shell account was already written in the same
        // transaction
        let result = manager
            .issue(
                &accounts,
                "orphan@example.com",
                "no-such-issuer",
                Duration::days(60),
            )
            .await;
        assert!(result.is_err());

        let account = accounts
            .get_account_by_email_opt("orphan@example.com")
            .await
            .unwrap();
        assert!(account.is_none(), "shell account must roll back with the failed issuance");
    }

    #[tokio::test]
    async fn test_consume_is_single_use_under_concurrency() {
        let (pool, _dir) = test_pool().await;
        let accounts = test_account_manager(&pool);
        let manager = AccessCodeManager::new(pool.clone());
        let admin = accounts.seed_admin().await;

        let (code, _) = manager
            .issue(&accounts, "racer@example.com", &admin.id, Duration::days(1))
            .await
            .unwrap();
        let account = accounts
            .get_account_by_email_opt("racer@example.com")
            .await
            .unwrap()
            .unwrap();

        let now = Utc::now();
        let (a, b) = tokio::join!(
            manager.consume_for_first_login("racer@example.com", &account.id, now),
            manager.consume_for_first_login("racer@example.com", &account.id, now),
        );

        let consumed = [a.unwrap(), b.unwrap()];
        assert_eq!(consumed.iter().filter(|c| c.is_some()).count(), 1);

        let stored = manager.get_code(&code.code).await.unwrap().unwrap();
        assert!(stored.is_used);
        assert_eq!(stored.used_by.as_deref(), Some(account.id.as_str()));
        assert!(stored.used_at.is_some());
    }

    #[tokio::test]
    async fn test_consume_skips_expired_codes() {
        let (pool, _dir) = test_pool().await;
        let accounts = test_account_manager(&pool);
        let manager = AccessCodeManager::new(pool.clone());
        let admin = accounts.seed_admin().await;

        let (code, _) = manager
            .issue(&accounts, "late@example.com", &admin.id, Duration::days(-1))
            .await
            .unwrap();
        let account = accounts
            .get_account_by_email_opt("late@example.com")
            .await
            .unwrap()
            .unwrap();

        let consumed = manager
            .consume_for_first_login("late@example.com", &account.id, Utc::now())
            .await
            .unwrap();
        assert!(consumed.is_none());

        // Expired code stays unused; it never transitions
        let stored = manager.get_code(&code.code).await.unwrap().unwrap();
        assert!(!stored.is_used);
        assert!(stored.used_by.is_none());
    }

    #[tokio::test]
    async fn test_list_codes_newest_first() {
        let (pool, _dir) = test_pool().await;
        let accounts = test_account_manager(&pool);
        let manager = AccessCodeManager::new(pool.clone());
        let admin = accounts.seed_admin().await;

        for i in 0..3 {
            manager
                .issue(
                    &accounts,
                    &format!("list{}@example.com", i),
                    &admin.id,
                    Duration::days(60),
                )
                .await
                .unwrap();
        }

        let codes = manager.list_codes().await.unwrap();
        assert_eq!(codes.len(), 3);
    }
}
