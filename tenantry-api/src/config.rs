/// Configuration management for the API server
///
/// Configuration is read from environment variables, with a `.env` file
/// loaded first when present.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 3000)
/// - `APP_ENV`: `production` turns on JSON logs and hides error detail (default: development)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: *)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Session signing secret, at least 32 characters (required)
/// - `JWT_EXPIRES_IN_SECS`: Session lifetime (default: 604800, seven days)
/// - `FRONTEND_URL`: Base URL used in invite links (default: http://localhost:5173)
/// - `RESEND_API_KEY`: Enables invite e-mails through Resend (optional)
/// - `EMAIL_FROM`: Sender address for invite e-mails (default: onboarding@resend.dev)
///
/// # Example
///
/// ```no_run
/// use tenantry_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use tenantry_shared::auth::jwt::default_session_ttl;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// `APP_ENV=production`
    pub production: bool,

    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for session signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,

    pub expires_in_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// None disables delivery; invites are still created
    #[serde(skip_serializing)]
    pub resend_api_key: Option<String>,

    pub from: String,
    pub frontend_url: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does not
    /// parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_port = var("API_PORT", "3000").parse::<u16>()?;

        let cors_origins = var("CORS_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS", "10").parse::<u32>()?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let expires_in_secs = match lookup("JWT_EXPIRES_IN_SECS") {
            Some(secs) => secs.parse::<i64>()?,
            None => default_session_ttl().num_seconds(),
        };
        if expires_in_secs <= 0 {
            anyhow::bail!("JWT_EXPIRES_IN_SECS must be positive");
        }

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST", "0.0.0.0"),
                port: api_port,
                production: var("APP_ENV", "development").eq_ignore_ascii_case("production"),
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expires_in_secs,
            },
            email: EmailConfig {
                resend_api_key: lookup("RESEND_API_KEY").filter(|key| !key.is_empty()),
                from: var("EMAIL_FROM", "onboarding@resend.dev"),
                frontend_url: var("FRONTEND_URL", "http://localhost:5173"),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.jwt.expires_in_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgresql://localhost/test"), ("JWT_SECRET", SECRET)]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert!(!config.api.production);
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.session_ttl(), chrono::Duration::days(7));
        assert!(config.email.resend_api_key.is_none());
        assert_eq!(config.email.frontend_url, "http://localhost:5173");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "8080"),
            ("APP_ENV", "production"),
            ("CORS_ORIGINS", "https://app.example.com, https://admin.example.com"),
            ("RESEND_API_KEY", "re_123"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert!(config.api.production);
        assert_eq!(config.api.cors_origins.len(), 2);
        assert_eq!(config.email.resend_api_key.as_deref(), Some("re_123"));
    }

    #[test]
    fn test_required_and_invalid_values() {
        assert!(load(&[("JWT_SECRET", SECRET)]).is_err());
        assert!(load(&[("DATABASE_URL", "postgresql://localhost/test")]).is_err());
        assert!(load(&[("DATABASE_URL", "postgresql://localhost/test"), ("JWT_SECRET", "short")]).is_err());
        assert!(load(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
            ("API_PORT", "not-a-port"),
        ])
        .is_err());
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
            ("RESEND_API_KEY", "re_123"),
        ])
        .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains(SECRET));
        assert!(!json.contains("re_123"));
    }
}
