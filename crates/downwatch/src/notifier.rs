//! Best-effort webhook delivery of outage and recovery notifications.

use crate::metrics::MetricsRegistry;
use crate::types::Notification;
use async_trait::async_trait;
use common::Error;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Notification channel
///
/// Delivery is fire-and-forget: implementations swallow and log their own
/// failures, so callers never branch on the outcome.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notify: Send + Sync {
    async fn notify(&self, notification: &Notification);
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Posts `{"text": "..."}` to a chat webhook
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl WebhookNotifier {
    /// Create a new webhook notifier
    pub fn new(
        url: impl Into<String>,
        request_timeout: Duration,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> common::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(Error::notify)?;

        Ok(Self {
            url: url.into(),
            client,
            metrics,
        })
    }

    async fn post(&self, message: &str) -> common::Result<()> {
        let body = serde_json::to_vec(&WebhookPayload { text: message })?;

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(Error::notify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::notify(format!("webhook returned {}", status)));
        }

        debug!(status = status.as_u16(), "Webhook accepted notification");
        Ok(())
    }
}

#[async_trait]
impl Notify for WebhookNotifier {
    async fn notify(&self, notification: &Notification) {
        let message = notification.message();

        let result = match self.post(&message).await {
            Ok(()) => {
                info!(
                    endpoint = %notification.endpoint,
                    kind = notification.kind.as_str(),
                    "Notification sent"
                );
                "sent"
            }
            Err(e) => {
                warn!(
                    endpoint = %notification.endpoint,
                    kind = notification.kind.as_str(),
                    error = %e,
                    "Failed to send notification"
                );
                "failed"
            }
        };

        if let Some(ref m) = self.metrics {
            m.record_notification(notification.kind, result);
        }
    }
}

/// Notifier that only logs; used when no webhook is configured
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notify for LogNotifier {
    async fn notify(&self, notification: &Notification) {
        info!(
            endpoint = %notification.endpoint,
            kind = notification.kind.as_str(),
            message = %notification,
            "Notification (webhook disabled)"
        );
    }
}
