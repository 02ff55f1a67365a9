//! Notification Dispatcher boundary
//!
//! The core decides *that* and *what* to notify, persists the decision, and
//! hands it off here. Channel delivery (email/chat/webhook fan-out) is an
//! external collaborator; a dispatcher failure never rolls back the state
//! transition that produced the decision.

use async_trait::async_trait;
use shared::models::{ActionKind, Product, Rule};
use std::sync::Mutex;

/// Delivery hand-off failure. Logged, never propagated into transitions.
#[derive(Debug, thiserror::Error)]
#[error("Notification dispatch failed: {0}")]
pub struct DispatchError(pub String);

/// Fire-and-forget hand-off to the external notification system.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(
        &self,
        store_id: i64,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), DispatchError>;
}

/// Default dispatcher: structured log line per decision. Stands in for the
/// external delivery pipeline in single-binary deployments.
#[derive(Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn notify(
        &self,
        store_id: i64,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), DispatchError> {
        tracing::info!(store_id, event_type, %payload, "Notification decision");
        Ok(())
    }
}

/// One captured notification decision.
#[derive(Debug, Clone)]
pub struct RecordedNotification {
    pub store_id: i64,
    pub event_type: String,
    pub payload: serde_json::Value,
}

/// Test dispatcher that records every decision, optionally failing each
/// call to exercise the "dispatcher failure does not roll back" contract.
#[derive(Default)]
pub struct RecordingDispatcher {
    recorded: Mutex<Vec<RecordedNotification>>,
    pub fail: std::sync::atomic::AtomicBool,
}

impl RecordingDispatcher {
    pub fn take(&self) -> Vec<RecordedNotification> {
        let mut recorded = self.recorded.lock().unwrap();
        std::mem::take(&mut *recorded)
    }

    pub fn count(&self) -> usize {
        self.recorded.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn notify(
        &self,
        store_id: i64,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), DispatchError> {
        if self.fail.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(DispatchError("recording dispatcher set to fail".into()));
        }
        self.recorded.lock().unwrap().push(RecordedNotification {
            store_id,
            event_type: event_type.to_string(),
            payload,
        });
        Ok(())
    }
}

/// Build the decision object for a rule application event.
pub fn rule_applied_payload(rule: &Rule, product: &Product, action: ActionKind) -> serde_json::Value {
    serde_json::json!({
        "rule_id": rule.id,
        "rule_name": rule.name,
        "product_id": product.id,
        "product_title": product.title,
        "action": action.as_str(),
    })
}
