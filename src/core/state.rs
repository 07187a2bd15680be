//! Control states and events of the run-control state machine.
//!
//! Both are plain enums with stable snake_case wire names, matching the
//! strings the controller reports in its status and accepts as command names.

use crate::error::ControlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A state the run controller can report.
///
/// # Example
///
/// ```rust
/// use runcontrol::core::ControlState;
///
/// let state: ControlState = "dataflow_drained".parse().unwrap();
/// assert_eq!(state, ControlState::DataflowDrained);
/// assert_eq!(state.name(), "dataflow_drained");
/// assert!("warming_up".parse::<ControlState>().is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    /// Reported before the controller has booted.
    None,
    Initial,
    Configured,
    Ready,
    Running,
    DataflowDrained,
    TriggeredSourcesStopped,
}

impl ControlState {
    /// Every state, in display order.
    pub const ALL: [ControlState; 7] = [
        Self::None,
        Self::Initial,
        Self::Configured,
        Self::Ready,
        Self::Running,
        Self::DataflowDrained,
        Self::TriggeredSourcesStopped,
    ];

    /// Wire name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Initial => "initial",
            Self::Configured => "configured",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::DataflowDrained => "dataflow_drained",
            Self::TriggeredSourcesStopped => "triggered_sources_stopped",
        }
    }

    /// Check if this is the pre-boot sentinel.
    pub fn is_uninitialized(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ControlState {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.name() == s)
            .ok_or_else(|| ControlError::UnknownState {
                state: s.to_string(),
            })
    }
}

/// A user-triggerable event of the run-control state machine.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlEvent {
    Conf,
    Scrap,
    Start,
    EnableTriggers,
    DisableTriggers,
    DrainDataflow,
    StopTriggeredSources,
    Stop,
}

impl ControlEvent {
    pub const ALL: [ControlEvent; 8] = [
        Self::Conf,
        Self::Scrap,
        Self::Start,
        Self::EnableTriggers,
        Self::DisableTriggers,
        Self::DrainDataflow,
        Self::StopTriggeredSources,
        Self::Stop,
    ];

    /// Command name sent to the controller.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Conf => "conf",
            Self::Scrap => "scrap",
            Self::Start => "start",
            Self::EnableTriggers => "enable_triggers",
            Self::DisableTriggers => "disable_triggers",
            Self::DrainDataflow => "drain_dataflow",
            Self::StopTriggeredSources => "stop_triggered_sources",
            Self::Stop => "stop",
        }
    }

    /// Look up an event by command name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|event| event.name() == name)
    }
}

impl fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
