//! Process configuration read from the environment (`.env` is loaded first).

use std::net::SocketAddr;
use thiserror::Error;

use crate::routes::auth::INSECURE_DEFAULT_SECRET;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid HOST/PORT configuration `{0}`")]
    InvalidAddress(String),

    #[error(
        "JWT_SECRET must be set to a secure, unique value in production; refusing to start with the default secret"
    )]
    InsecureJwtSecret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
}

impl ServerConfig {
    /// `HOST` (127.0.0.1), `PORT` (3001), `ENVIRONMENT` (development).
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3001),
            environment: Environment::parse(&std::env::var("ENVIRONMENT").unwrap_or_default()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::InvalidAddress(raw))
    }

    /// Refuses the default JWT secret in production and warns about
    /// default admin fallback credentials.
    pub fn check_secrets(&self, jwt_secret: &str) -> Result<(), ConfigError> {
        if !self.is_production() {
            return Ok(());
        }
        if jwt_secret.is_empty() || jwt_secret == INSECURE_DEFAULT_SECRET {
            return Err(ConfigError::InsecureJwtSecret);
        }

        let admin_email = std::env::var("ADMIN_EMAIL").unwrap_or_default();
        if admin_email.is_empty() || admin_email == "admin@example.com" {
            tracing::warn!("SECURITY: ADMIN_EMAIL is using an insecure default");
        }
        let admin_password_set =
            std::env::var("ADMIN_HASH_PASSWORD").is_ok() || std::env::var("ADMIN_PASSWORD").is_ok();
        if !admin_password_set {
            tracing::warn!(
                "SECURITY: neither ADMIN_HASH_PASSWORD nor ADMIN_PASSWORD is set, the no-database login fallback uses an insecure default"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(environment: Environment) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3001,
            environment,
        }
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("PRODUCTION"), Environment::Production);
        assert_eq!(Environment::parse(""), Environment::Development);
        assert_eq!(Environment::parse("staging"), Environment::Development);
    }

    #[test]
    fn test_socket_addr() {
        assert_eq!(config(Environment::Development).socket_addr().unwrap().port(), 3001);
        let bad = ServerConfig {
            host: "not a host".to_string(),
            ..config(Environment::Development)
        };
        assert!(matches!(bad.socket_addr(), Err(ConfigError::InvalidAddress(_))));
    }

    #[test]
    fn test_production_refuses_default_secret() {
        let prod = config(Environment::Production);
        assert!(matches!(
            prod.check_secrets(INSECURE_DEFAULT_SECRET),
            Err(ConfigError::InsecureJwtSecret)
        ));
        assert!(matches!(prod.check_secrets(""), Err(ConfigError::InsecureJwtSecret)));
        assert!(prod.check_secrets("a-long-random-secret").is_ok());
        assert!(config(Environment::Development)
            .check_secrets(INSECURE_DEFAULT_SECRET)
            .is_ok());
    }
}
