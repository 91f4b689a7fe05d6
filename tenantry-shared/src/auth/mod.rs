/// Authentication and authorization primitives
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and the password policy
/// - [`jwt`]: HS256 session tokens
/// - [`invite_token`]: unguessable invite tokens
/// - [`authorization`]: membership and role checks
/// - [`context`]: per-request caller and tenant context
///
/// # Example
///
/// ```no_run
/// use chrono::Duration;
/// use tenantry_shared::auth::jwt::SessionKeys;
/// use tenantry_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Secret123!")?;
/// assert!(verify_password("Secret123!", &hash)?);
///
/// let keys = SessionKeys::new("a-secret-of-at-least-thirty-two-bytes!", Duration::days(7));
/// let token = keys.issue(Uuid::new_v4(), "ada@example.com", None)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod context;
pub mod invite_token;
pub mod jwt;
pub mod password;
