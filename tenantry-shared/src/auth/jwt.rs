/// Signed session tokens
///
/// Sessions are stateless HS256 JWTs carrying the user id, e-mail and the
/// active company at issuance. The active company in the token is a hint for
/// clients only; the server always re-reads it from the user row.
///
/// # Claims
///
/// - `sub`: user id
/// - `email`: user e-mail
/// - `activeCompanyId`: active company at issuance, or null
/// - `iss`: always "tenantry"
/// - `iat`, `nbf`, `exp`: Unix timestamps
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use tenantry_shared::auth::jwt::SessionKeys;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let keys = SessionKeys::new("a-secret-of-at-least-thirty-two-bytes!", Duration::days(7));
/// let user_id = Uuid::new_v4();
///
/// let token = keys.issue(user_id, "ada@example.com", None)?;
/// let claims = keys.verify(&token)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ISSUER: &str = "tenantry";

/// Default session lifetime
pub fn default_session_ttl() -> Duration {
    Duration::days(7)
}

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid issuer")]
    InvalidIssuer,
}

/// Session token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// User id
    pub sub: Uuid,

    pub email: String,

    pub active_company_id: Option<Uuid>,

    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(user_id: Uuid, email: &str, active_company_id: Option<Uuid>, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            email: email.to_string(),
            active_company_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &SessionClaims, secret: &str) -> Result<String, JwtError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::CreateError(e.to_string()))
}

/// Checks signature, expiry, not-before and issuer, then returns the claims
pub fn validate_token(token: &str, secret: &str) -> Result<SessionClaims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    decode::<SessionClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
            _ => JwtError::ValidationError(e.to_string()),
        })
}

/// Secret and lifetime used to issue and verify sessions
#[derive(Clone)]
pub struct SessionKeys {
    secret: String,
    ttl: Duration,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("secret", &"[redacted]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionKeys {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a session for the given identity
    pub fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        active_company_id: Option<Uuid>,
    ) -> Result<String, JwtError> {
        let claims = SessionClaims::new(user_id, email, active_company_id, self.ttl);
        create_token(&claims, &self.secret)
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, JwtError> {
        validate_token(token, &self.secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_issue_and_verify() {
        let keys = SessionKeys::new(SECRET, default_session_ttl());
        let user_id = Uuid::new_v4();
        let company_id = Uuid::new_v4();

        let token = keys.issue(user_id, "ada@example.com", Some(company_id)).unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.active_company_id, Some(company_id));
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, Duration::days(7).num_seconds());
    }

    #[test]
    fn test_wrong_secret_fails() {
        let token = SessionKeys::new(SECRET, Duration::hours(1))
            .issue(Uuid::new_v4(), "a@x.com", None)
            .unwrap();

        let other = SessionKeys::new("another-secret-key-at-least-32-bytes", Duration::hours(1));
        assert!(matches!(other.verify(&token), Err(JwtError::ValidationError(_))));
    }

    #[test]
    fn test_expired_token() {
        let claims = SessionClaims::new(Uuid::new_v4(), "a@x.com", None, Duration::seconds(-3600));
        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let mut claims = SessionClaims::new(Uuid::new_v4(), "a@x.com", None, Duration::hours(1));
        claims.iss = "someone-else".to_string();

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::InvalidIssuer)));
    }

    #[test]
    fn test_claims_are_camel_case() {
        let claims = SessionClaims::new(Uuid::new_v4(), "a@x.com", None, Duration::hours(1));
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("activeCompanyId").is_some());
    }
}
