//! Transition log entries shared by the load and trip machines.

use serde::{Deserialize, Serialize};

use haul_core::Timestamp;

/// Record of one accepted status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord<S> {
    /// Status before the transition.
    pub from_state: S,
    /// Status after the transition.
    pub to_state: S,
    /// When the transition occurred.
    pub timestamp: Timestamp,
    /// Who performed it, if known.
    #[serde(default)]
    pub actor: Option<String>,
    /// Free-form note (cancellation reason, storage location).
    #[serde(default)]
    pub note: Option<String>,
}

/// Render a list of statuses as `a | b | c` for error messages.
pub(crate) fn join_states<S: std::fmt::Display>(states: &[S]) -> String {
    states
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}
