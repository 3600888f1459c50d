use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Out-of-band delivery of reset codes. Injected into the OTP engine so tests
/// can substitute a recording fake.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_otp(&self, email: &str, code: &str) -> anyhow::Result<()>;
}

/// Posts the code to an external mail gateway which renders and sends the
/// actual email. The request is bounded by a timeout; a timeout surfaces as a
/// delivery failure and leaves the stored OTP untouched, so the caller can
/// retry.
pub struct MailGatewayNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl MailGatewayNotifier {
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for MailGatewayNotifier {
    async fn send_otp(&self, email: &str, code: &str) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "to": email,
                "template": "password-reset-otp",
                "params": { "code": code },
            }))
            .send()
            .await?;
        response.error_for_status()?;
        info!(%email, "reset OTP dispatched");
        Ok(())
    }
}

/// Development fallback when no gateway is configured. Logs that a code was
/// issued without revealing it.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_otp(&self, email: &str, _code: &str) -> anyhow::Result<()> {
        info!(%email, "reset OTP issued (no mail gateway configured)");
        Ok(())
    }
}
