//! Tracing-only notification sink, the default when no delivery channel is
//! configured.

use uuid::Uuid;

use crate::traits::{Notification, Notifier, NotifyError};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify_class(
        &self,
        class_id: Uuid,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            class_id = %class_id,
            subject = %notification.subject,
            body = %notification.body,
            "class notification"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}
