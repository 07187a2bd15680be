//! History of confirmed state transitions.
//!
//! Only transitions the controller acknowledged are recorded. History is
//! immutable: `record` returns a new history with the transition appended.

use super::state::{ControlEvent, ControlState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single confirmed transition.
///
/// `to` is the state the controller reported afterwards, which may differ
/// from what the local graph predicts for `event`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedTransition {
    pub from: ControlState,
    pub event: ControlEvent,
    pub to: ControlState,
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of confirmed transitions.
///
/// # Example
///
/// ```rust
/// use runcontrol::core::{ConfirmedTransition, ControlEvent, ControlState, TransitionHistory};
/// use chrono::Utc;
///
/// let history = TransitionHistory::new().record(ConfirmedTransition {
///     from: ControlState::Initial,
///     event: ControlEvent::Conf,
///     to: ControlState::Configured,
///     timestamp: Utc::now(),
/// });
///
/// assert_eq!(
///     history.get_path(),
///     vec![&ControlState::Initial, &ControlState::Configured]
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionHistory {
    transitions: Vec<ConfirmedTransition>,
}

impl TransitionHistory {
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    pub fn record(&self, transition: ConfirmedTransition) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// States traversed: the first `from`, then each `to`.
    pub fn get_path(&self) -> Vec<&ControlState> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Time between the first and last recorded transition.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.first()?, self.transitions.last()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn last(&self) -> Option<&ConfirmedTransition> {
        self.transitions.last()
    }

    pub fn transitions(&self) -> &[ConfirmedTransition] {
        &self.transitions
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
