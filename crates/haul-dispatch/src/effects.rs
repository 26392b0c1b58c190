//! # Side-Effect Collaborators
//!
//! Audit logging, conversation messages, and driver notifications are
//! delivered by external systems. The engine calls them through the traits
//! below and never lets a failure reach the caller: [`Effects`] logs the
//! error with `tracing::warn!` and moves on. Nothing is retried.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use haul_core::{DriverId, LoadId, TripId};

/// Structured audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub entity_kind: String,
    pub entity_id: String,
    pub action: String,
    pub performed_by: Option<String>,
    pub metadata: serde_json::Value,
}

/// A human-readable line posted into a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemMessage {
    pub thread: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TripAssigned,
    TripUnassigned,
    LoadAdded,
    LoadRemoved,
    DeliveryOrderChanged,
}

/// A push/in-app notification for a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: DriverId,
    pub kind: NotificationKind,
    pub trip_id: Option<TripId>,
    pub load_id: Option<LoadId>,
    pub message: String,
}

/// A collaborator failed to accept a side effect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EffectError(pub String);

pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent) -> Result<(), EffectError>;
}

pub trait MessageSink: Send + Sync {
    fn post(&self, message: SystemMessage) -> Result<(), EffectError>;
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), EffectError>;
}

/// Writes every side effect to the tracing log. The default collaborator
/// when nothing external is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEffects;

impl AuditSink for TracingEffects {
    fn record(&self, event: AuditEvent) -> Result<(), EffectError> {
        tracing::info!(
            target: "haul::audit",
            entity_kind = %event.entity_kind,
            entity_id = %event.entity_id,
            action = %event.action,
            performed_by = event.performed_by.as_deref().unwrap_or("-"),
            metadata = %event.metadata,
            "audit"
        );
        Ok(())
    }
}

impl MessageSink for TracingEffects {
    fn post(&self, message: SystemMessage) -> Result<(), EffectError> {
        tracing::info!(target: "haul::messages", thread = %message.thread, "{}", message.body);
        Ok(())
    }
}

impl Notifier for TracingEffects {
    fn notify(&self, notification: Notification) -> Result<(), EffectError> {
        tracing::info!(
            target: "haul::notifications",
            recipient = %notification.recipient,
            kind = ?notification.kind,
            "{}",
            notification.message
        );
        Ok(())
    }
}

/// Captures side effects in memory. Useful for tests and for inspecting
/// what an operation emitted.
#[derive(Debug, Default)]
pub struct MemoryEffects {
    pub audit: Mutex<Vec<AuditEvent>>,
    pub messages: Mutex<Vec<SystemMessage>>,
    pub notifications: Mutex<Vec<Notification>>,
    /// When set, every call fails after recording.
    pub fail: bool,
}

impl MemoryEffects {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn outcome(&self) -> Result<(), EffectError> {
        if self.fail {
            Err(EffectError("collaborator unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl AuditSink for MemoryEffects {
    fn record(&self, event: AuditEvent) -> Result<(), EffectError> {
        self.audit.lock().push(event);
        self.outcome()
    }
}

impl MessageSink for MemoryEffects {
    fn post(&self, message: SystemMessage) -> Result<(), EffectError> {
        self.messages.lock().push(message);
        self.outcome()
    }
}

impl Notifier for MemoryEffects {
    fn notify(&self, notification: Notification) -> Result<(), EffectError> {
        self.notifications.lock().push(notification);
        self.outcome()
    }
}

/// The collaborators the dispatcher fires into.
#[derive(Clone)]
pub struct Effects {
    audit: Arc<dyn AuditSink>,
    messages: Arc<dyn MessageSink>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for Effects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effects").finish_non_exhaustive()
    }
}

impl Default for Effects {
    fn default() -> Self {
        Self::tracing()
    }
}

impl Effects {
    pub fn new(
        audit: Arc<dyn AuditSink>,
        messages: Arc<dyn MessageSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            audit,
            messages,
            notifier,
        }
    }

    /// Log-only collaborators.
    pub fn tracing() -> Self {
        let sink = Arc::new(TracingEffects);
        Self::new(sink.clone(), sink.clone(), sink)
    }

    /// Route all three channels into one [`MemoryEffects`].
    pub fn memory(sink: Arc<MemoryEffects>) -> Self {
        Self::new(sink.clone(), sink.clone(), sink)
    }

    pub fn audit(&self, event: AuditEvent) {
        let action = event.action.clone();
        if let Err(err) = self.audit.record(event) {
            tracing::warn!(%action, error = %err, "audit sink failed; continuing");
        }
    }

    pub fn message(&self, thread: impl Into<String>, body: impl Into<String>) {
        let message = SystemMessage {
            thread: thread.into(),
            body: body.into(),
        };
        if let Err(err) = self.messages.post(message) {
            tracing::warn!(error = %err, "message sink failed; continuing");
        }
    }

    pub fn notify(&self, notification: Notification) {
        let recipient = notification.recipient;
        if let Err(err) = self.notifier.notify(notification) {
            tracing::warn!(%recipient, error = %err, "notifier failed; continuing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> AuditEvent {
        AuditEvent {
            entity_kind: "load".into(),
            entity_id: "load:1".into(),
            action: "load.accepted".into(),
            performed_by: None,
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn failures_are_swallowed() {
        let sink = Arc::new(MemoryEffects::failing());
        let effects = Effects::memory(sink.clone());
        effects.audit(event());
        effects.message("load:1", "Load accepted");
        effects.notify(Notification {
            recipient: DriverId::new(),
            kind: NotificationKind::LoadAdded,
            trip_id: None,
            load_id: None,
            message: "added".into(),
        });
        assert_eq!(sink.audit.lock().len(), 1);
        assert_eq!(sink.messages.lock().len(), 1);
        assert_eq!(sink.notifications.lock().len(), 1);
    }

    #[test]
    fn tracing_effects_accept_everything() {
        let effects = Effects::tracing();
        effects.audit(event());
        effects.message("trip:1", "Trip activated");
    }
}
