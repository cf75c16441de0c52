use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

use crate::auth::{decode_secret_key, AuthConfig};

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    /// `None` disables the admin gate (development mode).
    pub auth: Option<AuthConfig>,
    pub log_format: String,
}

fn request_timeout(raw: &str) -> anyhow::Result<Duration> {
    let millis: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("Invalid CURATOR_REQUEST_TIMEOUT_MS '{raw}'"))?;
    Ok(Duration::from_millis(millis))
}

fn token_ttl(minutes: u64) -> anyhow::Result<Duration> {
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .context("CURATOR_AUTH_TOKEN_TTL_MINUTES is too large")
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = std::env::var("CURATOR_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("Invalid CURATOR_LISTEN_ADDR")?;
        let db_path = curator_storage_sqlite::get_db_path(
            &std::env::var("CURATOR_DB_PATH").unwrap_or_else(|_| "./db/app.db".into()),
        );
        let cors_allow = std::env::var("CURATOR_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let request_timeout = request_timeout(
            &std::env::var("CURATOR_REQUEST_TIMEOUT_MS").unwrap_or_else(|_| "30000".into()),
        )?;
        let log_format = std::env::var("CURATOR_LOG_FORMAT").unwrap_or_else(|_| "text".into());

        let auth = match std::env::var("CURATOR_AUTH_PASSWORD_HASH") {
            Ok(hash) if !hash.trim().is_empty() => {
                let secret = std::env::var("CURATOR_SECRET_KEY").context(
                    "CURATOR_SECRET_KEY is required when CURATOR_AUTH_PASSWORD_HASH is set",
                )?;
                let ttl_minutes: u64 = std::env::var("CURATOR_AUTH_TOKEN_TTL_MINUTES")
                    .unwrap_or_else(|_| "60".into())
                    .parse()
                    .context("Invalid CURATOR_AUTH_TOKEN_TTL_MINUTES")?;
                Some(AuthConfig {
                    password_hash: hash.trim().to_string(),
                    jwt_secret: decode_secret_key(&secret)?,
                    access_token_ttl: token_ttl(ttl_minutes)?,
                })
            }
            _ => None,
        };

        Ok(Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout,
            auth,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_timeout_rejects_garbage() {
        assert_eq!(request_timeout("1500").unwrap(), Duration::from_millis(1500));
        assert!(request_timeout("30s").is_err());
        assert!(request_timeout("").is_err());
    }

    #[test]
    fn test_token_ttl_rejects_overflow() {
        assert_eq!(token_ttl(60).unwrap(), Duration::from_secs(3600));
        assert!(token_ttl(u64::MAX).is_err());
    }
}
