use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    /// Mail gateway that renders and delivers OTP emails. When unset the
    /// server falls back to a log-only notifier (development).
    pub mail_gateway_url: Option<String>,
    pub mail_gateway_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session = SessionConfig {
            ttl_hours: std::env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };
        let mail_gateway_url = std::env::var("MAIL_GATEWAY_URL").ok();
        let mail_gateway_timeout_secs = std::env::var("MAIL_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10);
        Ok(Self {
            database_url,
            session,
            mail_gateway_url,
            mail_gateway_timeout_secs,
        })
    }
}
