//! Explicit in-process delivery registry.
//!
//! Keyed by class id: each registered member holds the receiving half of an
//! unbounded channel. Registration and removal are explicit operations with
//! no lifecycle tied to process globals; dead receivers are pruned on the
//! next send to their class.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::traits::{Notification, Notifier, NotifyError};

type Subscribers = HashMap<Uuid, Vec<(Uuid, mpsc::UnboundedSender<Notification>)>>;

/// Registry of in-process notification subscribers, keyed by class id.
#[derive(Default)]
pub struct DeliveryRegistry {
    subscribers: RwLock<Subscribers>,
}

impl DeliveryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class member; returns the receiving end of their channel.
    /// Re-registering a user replaces their previous channel.
    pub fn register(&self, class_id: Uuid, user_id: Uuid) -> mpsc::UnboundedReceiver<Notification> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subs = self.subscribers.write().unwrap();
        let entries = subs.entry(class_id).or_default();
        entries.retain(|(uid, _)| *uid != user_id);
        entries.push((user_id, tx));
        rx
    }

    /// Remove a member's registration. Unknown ids are a no-op.
    pub fn unregister(&self, class_id: Uuid, user_id: Uuid) {
        let mut subs = self.subscribers.write().unwrap();
        if let Some(entries) = subs.get_mut(&class_id) {
            entries.retain(|(uid, _)| *uid != user_id);
            if entries.is_empty() {
                subs.remove(&class_id);
            }
        }
    }

    /// Ids of currently registered members of a class.
    pub fn subscribers(&self, class_id: Uuid) -> Vec<Uuid> {
        self.subscribers
            .read()
            .unwrap()
            .get(&class_id)
            .map(|entries| entries.iter().map(|(uid, _)| *uid).collect())
            .unwrap_or_default()
    }

    /// Send to every live member of a class, pruning dead receivers.
    /// Returns the number of successful deliveries.
    pub fn send_to_class(&self, class_id: Uuid, notification: &Notification) -> usize {
        let mut subs = self.subscribers.write().unwrap();
        let Some(entries) = subs.get_mut(&class_id) else {
            return 0;
        };

        let mut delivered = 0;
        entries.retain(|(user_id, tx)| match tx.send(notification.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                tracing::debug!(class_id = %class_id, user_id = %user_id, "pruning dead subscriber");
                false
            }
        });
        if entries.is_empty() {
            subs.remove(&class_id);
        }
        delivered
    }
}

/// [`Notifier`] delivering through a shared [`DeliveryRegistry`].
pub struct ChannelNotifier {
    registry: std::sync::Arc<DeliveryRegistry>,
}

impl ChannelNotifier {
    pub fn new(registry: std::sync::Arc<DeliveryRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait::async_trait]
impl Notifier for ChannelNotifier {
    async fn notify_class(
        &self,
        class_id: Uuid,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        let delivered = self.registry.send_to_class(class_id, notification);
        if delivered == 0 {
            return Err(NotifyError::NoSubscribers(class_id));
        }
        tracing::debug!(class_id = %class_id, delivered, "in-process notification delivered");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "channel"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn register_and_send() {
        let registry = DeliveryRegistry::new();
        let class_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let mut rx = registry.register(class_id, user_id);
        let n = Notification::new("Exam opened", "Mathematics midterm is now open");

        assert_eq!(registry.send_to_class(class_id, &n), 1);
        assert_eq!(rx.try_recv().unwrap().subject, "Exam opened");
    }

    #[test]
    fn dead_receiver_is_pruned() {
        let registry = DeliveryRegistry::new();
        let class_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let rx = registry.register(class_id, user_id);
        drop(rx);

        let n = Notification::new("s", "b");
        assert_eq!(registry.send_to_class(class_id, &n), 0);
        assert!(registry.subscribers(class_id).is_empty());
    }

    #[test]
    fn reregistration_replaces_channel() {
        let registry = DeliveryRegistry::new();
        let class_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let mut stale = registry.register(class_id, user_id);
        let mut fresh = registry.register(class_id, user_id);

        assert_eq!(registry.subscribers(class_id).len(), 1);
        registry.send_to_class(class_id, &Notification::new("s", "b"));
        assert!(stale.try_recv().is_err());
        assert!(fresh.try_recv().is_ok());
    }

    #[test]
    fn unregister_removes_member() {
        let registry = DeliveryRegistry::new();
        let class_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let _rx = registry.register(class_id, user_id);
        registry.unregister(class_id, user_id);
        assert!(registry.subscribers(class_id).is_empty());
    }

    #[tokio::test]
    async fn channel_notifier_errors_with_no_subscribers() {
        let registry = Arc::new(DeliveryRegistry::new());
        let notifier = ChannelNotifier::new(registry);
        let err = notifier
            .notify_class(Uuid::new_v4(), &Notification::new("s", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::NoSubscribers(_)));
    }
}
