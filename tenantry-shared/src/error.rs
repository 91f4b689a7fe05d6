/// Error taxonomy for the tenancy core
///
/// Every authority returns [`CoreError`]. The variants are kinds, not causes:
/// the HTTP layer maps each kind to one status code and shows the message to
/// the caller, except for [`CoreError::Internal`] whose detail is only logged.
///
/// # Example
///
/// ```
/// use tenantry_shared::error::CoreError;
///
/// let err = CoreError::forbidden("You are not a member of this company");
/// assert_eq!(err.to_string(), "You are not a member of this company");
/// ```

use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::store::StoreError;

/// Result alias used by the authorities
pub type CoreResult<T> = Result<T, CoreError>;

/// Failure kinds surfaced by the tenancy core
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Missing or invalid caller identity, or a credential mismatch
    #[error("{0}")]
    Unauthorized(String),

    /// Caller is known but lacks the membership or role required
    #[error("{0}")]
    Forbidden(String),

    /// Referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Well-formed request that violates a business rule
    #[error("{0}")]
    BadRequest(String),

    /// A role value outside OWNER/ADMIN/MEMBER was encountered
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// A unique constraint was hit despite the pre-checks
    #[error("{0}")]
    Conflict(String),

    /// Unexpected failure; the detail never reaches the caller
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        CoreError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        CoreError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        CoreError::BadRequest(message.into())
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) => {
                CoreError::Conflict(format!("Resource already exists ({})", constraint))
            }
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for CoreError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Weak(msg) => CoreError::BadRequest(msg),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<JwtError> for CoreError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => CoreError::Internal(msg),
            _ => CoreError::Unauthorized("Invalid or expired session".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_maps_to_conflict() {
        let err: CoreError = StoreError::Conflict("companies_slug_key".to_string()).into();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert!(err.to_string().contains("companies_slug_key"));
    }

    #[test]
    fn test_jwt_validation_maps_to_unauthorized() {
        let err: CoreError = JwtError::Expired.into();
        assert!(matches!(err, CoreError::Unauthorized(_)));
    }

    #[test]
    fn test_weak_password_is_bad_request() {
        let err: CoreError = PasswordError::Weak("too short".to_string()).into();
        assert!(matches!(err, CoreError::BadRequest(ref m) if m == "too short"));
    }

    #[test]
    fn test_invalid_role_message() {
        let err = CoreError::InvalidRole("SUPERUSER".to_string());
        assert_eq!(err.to_string(), "Invalid role: SUPERUSER");
    }
}
