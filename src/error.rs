//! Error types surfaced by the mirror, the dispatcher and the remote layer.

use crate::remote::ResponseFlag;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a remote service implementation (transport errors,
/// refused requests, malformed replies).
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{operation} failed: {message}")]
pub struct RemoteError {
    pub operation: &'static str,
    pub message: String,
}

impl RemoteError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Errors returned by run-control operations.
///
/// Every variant is distinguishable so callers can tell "you can't do that"
/// apart from "the controller disagrees about what can be done".
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ControlError {
    #[error("Unknown state '{state}'")]
    UnknownState { state: String },

    #[error("Event '{event}' is not legal from state '{state}'")]
    IllegalTransition { event: String, state: String },

    #[error("Event '{event}' not found in controller FSM. Valid events are: {}", known.join(", "))]
    UnknownEvent { event: String, known: Vec<String> },

    #[error("Argument '{argument}' has unsupported type tag {tag}")]
    UnsupportedArgumentType { argument: String, tag: i32 },

    #[error("Argument '{argument}' expects {expected}: {reason}")]
    InvalidArgumentValue {
        argument: String,
        expected: &'static str,
        reason: String,
    },

    #[error("Missing mandatory arguments: {}", .0.join(", "))]
    MissingMandatoryArguments(Vec<String>),

    #[error("Event '{event}' failed with flag {flag} and message '{message}'")]
    RemoteExecutionFailure {
        event: String,
        flag: ResponseFlag,
        message: String,
    },

    #[error("Expected 1 address for session '{session}', found {found}")]
    AddressResolution { session: String, found: usize },

    #[error("{call} timed out after {after:?}")]
    Timeout { call: &'static str, after: Duration },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_event_lists_known_events() {
        let err = ControlError::UnknownEvent {
            event: "boot".to_string(),
            known: vec!["conf".to_string(), "start".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Event 'boot' not found in controller FSM. Valid events are: conf, start"
        );
    }

    #[test]
    fn remote_failure_carries_flag_and_message() {
        let err = ControlError::RemoteExecutionFailure {
            event: "start".to_string(),
            flag: ResponseFlag::Failed,
            message: "run number server unreachable".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("FSM_FAILED"));
        assert!(text.contains("run number server unreachable"));
    }

    #[test]
    fn remote_error_converts_transparently() {
        let err: ControlError = RemoteError::new("acquire_control", "actor busy").into();
        assert_eq!(err.to_string(), "acquire_control failed: actor busy");
    }
}
