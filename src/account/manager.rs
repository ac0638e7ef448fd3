/// Account manager implementation using runtime queries
use crate::{
    access_code::AccessCodeManager,
    account::SessionClaims,
    config::ServerConfig,
    db::models::{Account, AccountStatus, OnboardingStatus, Role},
    error::{PortalError, PortalResult},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Where a login attempt landed after the referral gate
///
/// `AccessCodeRequired` and `AccessRevoked` are the failure exits and are
/// raised as errors instead of variants here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginGate {
    /// Poster / referrer / admin; the gate never applies
    NonSeekerBypass,
    /// First login consumed an unused, unexpired code
    FirstLoginGranted,
    /// Returning seeker whose linked code is still valid
    ReturningValid,
    /// Returning seeker with no linked code at all; allowed through
    ReturningUnlinked,
}

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Create a new account (admin or referrer initiated)
    pub async fn create_account(
        &self,
        email: &str,
        username: &str,
        password: &str,
        role: Role,
        created_by: Option<&str>,
    ) -> PortalResult<Account> {
        self.validate_email(email)?;

        if self.email_exists(email).await? {
            return Err(PortalError::Conflict("Email already registered".to_string()));
        }

        let password_hash = Self::hash_password(password)?;
        let first_login = role == Role::Seeker;

        let mut conn = self.db.acquire().await?;
        self.insert_account(&mut conn, email, username, &password_hash, role, first_login, created_by)
            .await
    }

    /// Provision a shell seeker account for a not-yet-registered candidate
    ///
    /// Called by access code issuance on its open transaction, so a failed
    /// issuance rolls the account back too. Returns the account and the
    /// plaintext temporary password so the issuer can mail it; the password
    /// is never stored outside its hash.
    pub async fn provision_shell_account(
        &self,
        conn: &mut sqlx::SqliteConnection,
        email: &str,
        created_by: &str,
    ) -> PortalResult<(Account, String)> {
        self.validate_email(email)?;

        let temp_password: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        let password_hash = Self::hash_password(&temp_password)?;

        // Username defaults to the email local part until onboarding
        let username = email.split('@').next().unwrap_or(email);

        let account = self
            .insert_account(conn, email, username, &password_hash, Role::Seeker, true, Some(created_by))
            .await?;

        Ok((account, temp_password))
    }

    async fn insert_account(
        &self,
        conn: &mut sqlx::SqliteConnection,
        email: &str,
        username: &str,
        password_hash: &str,
        role: Role,
        first_login: bool,
        created_by: Option<&str>,
    ) -> PortalResult<Account> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO account (id, email, username, password_hash, role, is_super_admin,
                                 first_login, onboarding_status, status, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, 'not_started', 'active', ?7, ?8)
            "#,
        )
        .bind(&id)
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .bind(first_login)
        .bind(created_by)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if crate::db::is_unique_violation(&e) {
                PortalError::Conflict("Email already registered".to_string())
            } else {
                PortalError::Database(e)
            }
        })?;

        Ok(Account {
            id,
            email: email.to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
            is_super_admin: false,
            first_login,
            onboarding_status: OnboardingStatus::NotStarted,
            status: AccountStatus::Active,
            resume_url: None,
            created_by: created_by.map(str::to_string),
            created_at: now,
        })
    }

    /// Authenticate and run the referral gate, minting a session token
    ///
    /// Unknown email and wrong password fail identically so callers cannot
    /// enumerate accounts. The gate runs only after the password check.
    pub async fn login(
        &self,
        codes: &AccessCodeManager,
        email: &str,
        password: &str,
    ) -> PortalResult<(Account, String)> {
        let account = self
            .get_account_by_email_opt(email)
            .await?
            .ok_or(PortalError::InvalidCredentials)?;

        if !Self::verify_password(password, &account.password_hash)? {
            return Err(PortalError::InvalidCredentials);
        }

        if account.status == AccountStatus::Inactive {
            return Err(PortalError::Authorization("Account is inactive".to_string()));
        }

        let gate = self.evaluate_gate(codes, &account).await?;
        tracing::info!(account_id = %account.id, ?gate, "login granted");

        let token = self.mint_session_token(&account)?;

        Ok((account, token))
    }

    /// Referral gate state machine (runs after password verification)
    async fn evaluate_gate(
        &self,
        codes: &AccessCodeManager,
        account: &Account,
    ) -> PortalResult<LoginGate> {
        if account.role != Role::Seeker {
            return Ok(LoginGate::NonSeekerBypass);
        }

        let now = Utc::now();

        if account.first_login {
            // The conditional update consumes the code exactly once even if
            // two first logins race. first_login itself is left set; only the
            // password-change flow clears it. The code gates the first
            // session, not the first password change.
            match codes
                .consume_for_first_login(&account.email, &account.id, now)
                .await?
            {
                Some(code) => {
                    tracing::info!(account_id = %account.id, code = %code.code, "access code consumed");
                    Ok(LoginGate::FirstLoginGranted)
                }
                None => {
                    tracing::warn!(account_id = %account.id, "first login without a valid access code");
                    Err(PortalError::AccessCodeRequired)
                }
            }
        } else {
            match codes.find_linked_code(&account.id).await? {
                // Seekers not provisioned through the code path carry no
                // linked code and are allowed through.
                None => Ok(LoginGate::ReturningUnlinked),
                Some(code) if code.expires_at < now => {
                    tracing::warn!(account_id = %account.id, code = %code.code, "linked access code expired, revoking");
                    Err(PortalError::AccessRevoked)
                }
                Some(_) => Ok(LoginGate::ReturningValid),
            }
        }
    }

    /// Mint a signed session token carrying the account state snapshot
    pub fn mint_session_token(&self, account: &Account) -> PortalResult<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.config.authentication.token_validity_hours);

        let claims = SessionClaims {
            sub: account.id.clone(),
            email: account.email.clone(),
            username: account.username.clone(),
            role: account.role,
            first_login: account.first_login,
            is_super_admin: account.is_super_admin,
            onboarding_status: account.onboarding_status,
            status: account.status,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(
                self.config.authentication.jwt_secret.as_bytes(),
            ),
        )
        .map_err(|e| PortalError::Jwt(format!("Token signing failed: {}", e)))
    }

    /// Change password, clearing the first-login flag
    pub async fn change_password(
        &self,
        account_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> PortalResult<()> {
        if new_password.len() < 8 {
            return Err(PortalError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let account = self.get_account(account_id).await?;

        if !Self::verify_password(current_password, &account.password_hash)? {
            return Err(PortalError::Authentication(
                "Current password is incorrect".to_string(),
            ));
        }

        let password_hash = Self::hash_password(new_password)?;

        sqlx::query("UPDATE account SET password_hash = ?1, first_login = 0 WHERE id = ?2")
            .bind(&password_hash)
            .bind(account_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Mark a seeker's onboarding as completed
    pub async fn complete_onboarding(&self, account_id: &str) -> PortalResult<()> {
        let result =
            sqlx::query("UPDATE account SET onboarding_status = 'completed' WHERE id = ?1")
                .bind(account_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(PortalError::NotFound("Account not found".to_string()));
        }

        Ok(())
    }

    /// Re-open the first-login gate (fresh code issued for a stalled account)
    ///
    /// Runs on the issuer's transaction for the same rollback reason as
    /// `provision_shell_account`.
    pub async fn reset_first_login_gate(
        &self,
        conn: &mut sqlx::SqliteConnection,
        account_id: &str,
    ) -> PortalResult<()> {
        sqlx::query(
            "UPDATE account SET first_login = 1, onboarding_status = 'not_started' WHERE id = ?1",
        )
        .bind(account_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Toggle account active/inactive status
    pub async fn set_account_status(
        &self,
        account_id: &str,
        status: AccountStatus,
    ) -> PortalResult<()> {
        let result = sqlx::query("UPDATE account SET status = ?1 WHERE id = ?2")
            .bind(status)
            .bind(account_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PortalError::NotFound("Account not found".to_string()));
        }

        Ok(())
    }

    /// Attach a resume to the account
    pub async fn set_resume(&self, account_id: &str, resume_url: &str) -> PortalResult<()> {
        let result = sqlx::query("UPDATE account SET resume_url = ?1 WHERE id = ?2")
            .bind(resume_url)
            .bind(account_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PortalError::NotFound("Account not found".to_string()));
        }

        Ok(())
    }

    /// Get account by id
    pub async fn get_account(&self, account_id: &str) -> PortalResult<Account> {
        sqlx::query_as::<_, Account>("SELECT * FROM account WHERE id = ?1")
            .bind(account_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| PortalError::NotFound("Account not found".to_string()))
    }

    /// Get account by email, if any
    pub async fn get_account_by_email_opt(&self, email: &str) -> PortalResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM account WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        Ok(account)
    }

    /// Check if email exists
    async fn email_exists(&self, email: &str) -> PortalResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await?;

        Ok(count > 0)
    }

    fn validate_email(&self, email: &str) -> PortalResult<()> {
        let valid = email.contains('@')
            && !email.starts_with('@')
            && !email.ends_with('@')
            && !email.contains(char::is_whitespace);

        if !valid {
            return Err(PortalError::Validation(format!("Invalid email: {}", email)));
        }

        Ok(())
    }

    /// Hash a password with Argon2id
    pub fn hash_password(password: &str) -> PortalResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PortalError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against its stored hash
    pub fn verify_password(password: &str, hash: &str) -> PortalResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| PortalError::Internal(format!("Corrupt password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
