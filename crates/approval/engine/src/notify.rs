//! Notifier implementations

use crate::traits::{Notifier, NotifyError};
use approval_types::{ApprovalEvent, ApprovalInstance, Identity, InstanceId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

/// Logs every delivery and never fails
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(
        &self,
        recipients: &[Identity],
        event: ApprovalEvent,
        instance: &ApprovalInstance,
    ) -> Result<(), NotifyError> {
        for recipient in recipients {
            tracing::info!(
                event = %event,
                instance_id = %instance.id,
                recipient = %recipient.id,
                email = recipient.email.as_deref().unwrap_or(""),
                "Approval notification"
            );
        }
        Ok(())
    }
}

/// One recorded notification
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Delivery {
    pub event: ApprovalEvent,
    pub instance_id: InstanceId,
    pub recipients: Vec<UserId>,
    pub at: DateTime<Utc>,
}

/// Collects deliveries in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, oldest first
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Recipients of every delivery of `event`
    pub fn recipients_of(&self, event: ApprovalEvent) -> Vec<UserId> {
        self.deliveries()
            .into_iter()
            .filter(|d| d.event == event)
            .flat_map(|d| d.recipients)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.deliveries.lock() {
            guard.clear();
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        recipients: &[Identity],
        event: ApprovalEvent,
        instance: &ApprovalInstance,
    ) -> Result<(), NotifyError> {
        let delivery = Delivery {
            event,
            instance_id: instance.id.clone(),
            recipients: recipients.iter().map(|r| r.id.clone()).collect(),
            at: Utc::now(),
        };
        self.deliveries
            .lock()
            .map_err(|_| NotifyError::Unavailable("recording lock poisoned".to_string()))?
            .push(delivery);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approval_types::WorkflowId;

    #[tokio::test]
    async fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        let instance = ApprovalInstance::new(
            WorkflowId::new("wf"),
            "payment",
            "p-1",
            UserId::new("alice"),
        );
        let recipients = vec![Identity::new("bob", "Bob"), Identity::new("cat", "Cat")];

        notifier
            .notify(&recipients, ApprovalEvent::Submitted, &instance)
            .await
            .unwrap();
        notifier
            .notify(&recipients[..1], ApprovalEvent::Approved, &instance)
            .await
            .unwrap();

        assert_eq!(notifier.deliveries().len(), 2);
        assert_eq!(
            notifier.recipients_of(ApprovalEvent::Submitted),
            vec![UserId::new("bob"), UserId::new("cat")]
        );
        notifier.clear();
        assert!(notifier.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_tracing_notifier_never_fails() {
        let instance = ApprovalInstance::new(
            WorkflowId::new("wf"),
            "payment",
            "p-1",
            UserId::new("alice"),
        );
        assert!(TracingNotifier
            .notify(&[Identity::new("bob", "Bob")], ApprovalEvent::Rejected, &instance)
            .await
            .is_ok());
    }
}
