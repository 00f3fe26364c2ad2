//! Routes notifications to configured channels.
//!
//! The dispatcher receives a class-targeted notification and delivers it to
//! every configured channel. Individual channel failures don't block other
//! channels.

use uuid::Uuid;

use crate::traits::{Notification, Notifier, NotifyError};

/// Result of dispatching a notification to a single channel.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Dispatches notifications to multiple channels.
pub struct Dispatcher {
    channels: Vec<Box<dyn Notifier>>,
}

impl Dispatcher {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    pub fn empty() -> Self {
        Self { channels: Vec::new() }
    }

    /// Dispatch a notification to all channels.
    ///
    /// Returns results for each channel delivery. Individual failures
    /// don't block other channels.
    pub async fn dispatch(
        &self,
        class_id: Uuid,
        notification: &Notification,
    ) -> Vec<DispatchResult> {
        if self.channels.is_empty() {
            tracing::debug!(class_id = %class_id, "no notification channels configured");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let start = std::time::Instant::now();
            let result = channel.notify_class(class_id, notification).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match result {
                Ok(()) => {
                    tracing::info!(
                        class_id = %class_id,
                        channel = channel.channel_name(),
                        duration_ms,
                        "notification delivered"
                    );
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(
                        class_id = %class_id,
                        channel = channel.channel_name(),
                        error = %e,
                        duration_ms,
                        "notification delivery failed"
                    );
                    (false, Some(e.to_string()))
                }
            };

            results.push(DispatchResult {
                channel: channel.channel_name().to_string(),
                success,
                error,
                duration_ms,
            });
        }

        results
    }
}

/// Treat the dispatcher itself as a channel so the lifecycle core only ever
/// sees one [`Notifier`]. Reports failure only when every channel failed.
#[async_trait::async_trait]
impl Notifier for Dispatcher {
    async fn notify_class(
        &self,
        class_id: Uuid,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        let results = self.dispatch(class_id, notification).await;
        if !results.is_empty() && results.iter().all(|r| !r.success) {
            return Err(NotifyError::Config("all channels failed".to_string()));
        }
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "dispatcher"
    }
}
