//! Notifier trait definition and shared error types.

use std::collections::HashMap;

use uuid::Uuid;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned status {0}")]
    Status(u16),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("no live subscribers for class {0}")]
    NoSubscribers(Uuid),
}

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Notification {
    /// The rendered subject/title.
    pub subject: String,
    /// The rendered body content.
    pub body: String,
    /// Additional metadata (e.g., exam name, subject, duration).
    pub metadata: HashMap<String, String>,
}

impl Notification {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Trait for notification channel implementations.
///
/// All channels are best-effort: callers log failures and move on.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification to every member of a class.
    async fn notify_class(
        &self,
        class_id: Uuid,
        notification: &Notification,
    ) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "webhook", "log").
    fn channel_name(&self) -> &str;
}
