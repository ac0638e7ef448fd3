/// Authentication extractors and utilities
use crate::{
    account::SessionClaims,
    api::middleware::extract_bearer_token,
    context::AppContext,
    db::models::Role,
    error::PortalError,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated context - extracts and validates the session token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: String,
    pub claims: SessionClaims,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = PortalError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| PortalError::Authentication("Missing authorization header".to_string()))?;

        let claims = verify_session_token(&token, &state.config.authentication.jwt_secret)?;
        let account_id = claims.sub.clone();

        Ok(AuthContext { account_id, claims })
    }
}

/// Admin authentication context - requires admin role
#[derive(Debug, Clone)]
pub struct AdminAuthContext {
    pub account_id: String,
    pub claims: SessionClaims,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminAuthContext {
    type Rejection = PortalError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;

        if auth.claims.role != Role::Admin {
            tracing::warn!(account_id = %auth.account_id, "admin route denied");
            return Err(PortalError::Authorization("Admin role required".to_string()));
        }

        Ok(AdminAuthContext {
            account_id: auth.account_id,
            claims: auth.claims,
        })
    }
}

/// Verify a session token with full validation
///
/// This performs:
/// 1. Signature verification (HS256)
/// 2. Expiration checking
/// 3. Claims deserialization into the typed claim set
pub fn verify_session_token(token: &str, jwt_secret: &str) -> Result<SessionClaims, PortalError> {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    // Allow some clock skew (5 minutes)
    validation.leeway = 300;

    decode::<SessionClaims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("token verification failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    PortalError::Authentication("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    PortalError::Authentication("Invalid token signature".to_string())
                }
                _ => PortalError::Authentication(format!("Invalid token: {}", e)),
            }
        })
}
