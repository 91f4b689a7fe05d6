/// Password hashing and password policy
///
/// Hashes are Argon2id PHC strings (m=64 MiB, t=3, p=4, 32-byte output).
/// Verification reads the parameters back out of the stored hash, so older
/// hashes keep verifying if the parameters change.
///
/// # Example
///
/// ```
/// use tenantry_shared::auth::password::{hash_password, verify_password, validate_password_strength};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// validate_password_strength("Secret123!")?;
/// let hash = hash_password("Secret123!")?;
/// assert!(verify_password("Secret123!", &hash)?);
/// assert!(!verify_password("secret123!", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Minimum accepted password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Error type for password operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),

    /// Password does not meet the policy; the message is user-facing
    #[error("{0}")]
    Weak(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC hash
///
/// `Ok(false)` means a mismatch; `Err` means the stored hash is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Checks the account password policy
///
/// At least [`MIN_PASSWORD_LENGTH`] characters with an upper-case letter, a
/// lower-case letter, a digit and a special character.
pub fn validate_password_strength(password: &str) -> Result<(), PasswordError> {
    let weak = |msg: &str| Err(PasswordError::Weak(msg.to_string()));

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return weak("Password must be at least 8 characters long");
    }
    if !password.chars().any(char::is_uppercase) {
        return weak("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(char::is_lowercase) {
        return weak("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return weak("Password must contain at least one digit");
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return weak("Password must contain at least one special character");
    }

    Ok(())
}
