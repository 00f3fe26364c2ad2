//! Generic HTTP webhook notifier.
//!
//! Delivers notifications as JSON payloads to a configured endpoint, with
//! the target class id injected into the payload.

use serde::Serialize;
use uuid::Uuid;

use crate::traits::{Notification, Notifier, NotifyError};

#[derive(Serialize)]
struct WebhookPayload<'a> {
    class_id: Uuid,
    #[serde(flatten)]
    notification: &'a Notification,
}

/// Delivers notifications as JSON over HTTP to a configured endpoint.
#[derive(Debug)]
pub struct WebhookNotifier {
    url: String,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Result<Self, NotifyError> {
        if url.is_empty() {
            return Err(NotifyError::Config("webhook URL is empty".to_string()));
        }
        Ok(Self {
            url,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_class(
        &self,
        class_id: Uuid,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            class_id,
            notification,
        };

        let response = self.client.post(&self.url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_url_is_a_config_error() {
        assert!(matches!(
            WebhookNotifier::new(String::new()),
            Err(NotifyError::Config(_))
        ));
    }

    #[test]
    fn payload_flattens_notification_fields() {
        let n = Notification::new("Exam opened", "now open").with_meta("duration", "90");
        let payload = WebhookPayload {
            class_id: Uuid::nil(),
            notification: &n,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["subject"], "Exam opened");
        assert_eq!(json["metadata"]["duration"], "90");
        assert!(json["class_id"].is_string());
    }
}
