use std::time::Duration;

use anyhow::Context as _;
use serde::Serialize;

use crate::domain::repository::NotificationDispatcher;
use crate::domain::types::Notification;
use crate::error::DispatchError;

#[derive(Serialize)]
struct SendMailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Delivers notifications through a transactional mail HTTP API.
#[derive(Clone)]
pub struct HttpMailDispatcher {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailDispatcher {
    pub fn new(
        api_url: String,
        api_key: String,
        from: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build mail HTTP client")?;
        Ok(Self {
            client,
            api_url,
            api_key,
            from,
        })
    }
}

impl NotificationDispatcher for HttpMailDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError> {
        let body = SendMailRequest {
            from: &self.from,
            to: [notification.recipient.as_str()],
            subject: &notification.subject,
            text: &notification.body,
        };
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DispatchError::TimedOut
                } else {
                    DispatchError::Transport(anyhow::Error::new(e).context("send mail request"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(status = status.as_u16(), "mail accepted");
        Ok(())
    }
}
