// src/config.rs

use std::{env, error::Error, net::SocketAddr};

use dotenvy::dotenv;
use url::Url;

/// Reset links handed to the mailer stay valid for this long.
pub const RESET_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Upper bound for integer rating answers accepted at submission time.
pub const MAX_RATING: u64 = 100;

pub const DEFAULT_THANK_YOU: &str = "Thank you for completing the survey!";

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    /// Front-end base URL used to build password reset links.
    pub client_url: Url,
    pub cors_origins: Vec<String>,
    pub bind_addr: SocketAddr,
    /// Use the first `X-Forwarded-For` entry as the respondent address.
    pub trust_forwarded_for: bool,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn Error>> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set")?;

        let jwt_expiration = match env::var("JWT_EXPIRATION") {
            Ok(v) => v.parse::<u64>()?,
            Err(_) => 60 * 60 * 24,
        };

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let client_url = Url::parse(
            &env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:5173".to_string()),
        )?;

        let cors_origins = match env::var("CORS_ORIGINS") {
            Ok(v) => v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        };

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:5000".to_string())
            .parse::<SocketAddr>()?;

        let trust_forwarded_for = env::var("TRUST_FORWARDED_FOR")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            client_url,
            cors_origins,
            bind_addr,
            trust_forwarded_for,
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        })
    }

    /// Builds `<client_url>/reset-password/<token>`.
    pub fn reset_link(&self, token: &str) -> String {
        let base = self.client_url.as_str().trim_end_matches('/');
        format!("{}/reset-password/{}", base, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_link_has_no_double_slash() {
        let config = Config {
            database_url: None,
            jwt_secret: "s".to_string(),
            jwt_expiration: 60,
            rust_log: "error".to_string(),
            client_url: Url::parse("http://localhost:5173").unwrap(),
            cors_origins: vec![],
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            trust_forwarded_for: false,
            admin_email: None,
            admin_password: None,
        };
        assert_eq!(
            config.reset_link("abc"),
            "http://localhost:5173/reset-password/abc"
        );
    }
}
