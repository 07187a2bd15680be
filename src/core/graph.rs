//! Static transition graph of the run-control state machine.
//!
//! The graph is plain data: an ordered table of states, each with an ordered
//! list of `(event, target)` edges. Lookups replace any runtime introspection
//! of a state machine object.

use super::state::{ControlEvent, ControlState};
use crate::error::ControlError;
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;

/// A legal move out of a state: the event and the state it leads to.
pub type Edge = (ControlEvent, ControlState);

/// Errors found when validating a graph definition.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphError {
    #[error("Initial state '{0}' is not defined in the graph")]
    MissingInitialState(ControlState),

    #[error("State '{0}' is defined more than once")]
    DuplicateState(ControlState),

    #[error("Event '{event}' from '{state}' targets undefined state '{target}'")]
    DanglingTarget {
        state: ControlState,
        event: ControlEvent,
        target: ControlState,
    },

    #[error("Event '{event}' appears more than once from state '{state}'")]
    AmbiguousEvent {
        state: ControlState,
        event: ControlEvent,
    },

    #[error("State '{0}' is unreachable from the initial state")]
    Unreachable(ControlState),
}

/// Immutable mapping from state to its ordered legal transitions.
#[derive(Debug, Clone, Copy)]
pub struct StateGraph {
    entries: &'static [(ControlState, &'static [Edge])],
    initial: ControlState,
}

static DRUNC_ENTRIES: [(ControlState, &[Edge]); 7] = [
    (ControlState::None, &[]),
    (
        ControlState::Initial,
        &[(ControlEvent::Conf, ControlState::Configured)],
    ),
    (
        ControlState::Configured,
        &[
            (ControlEvent::Scrap, ControlState::Initial),
            (ControlEvent::Start, ControlState::Ready),
        ],
    ),
    (
        ControlState::Ready,
        &[
            (ControlEvent::EnableTriggers, ControlState::Running),
            (ControlEvent::DrainDataflow, ControlState::DataflowDrained),
        ],
    ),
    (
        ControlState::Running,
        &[(ControlEvent::DisableTriggers, ControlState::Ready)],
    ),
    (
        ControlState::DataflowDrained,
        &[(
            ControlEvent::StopTriggeredSources,
            ControlState::TriggeredSourcesStopped,
        )],
    ),
    (
        ControlState::TriggeredSourcesStopped,
        &[(ControlEvent::Stop, ControlState::Configured)],
    ),
];

static DRUNC: StateGraph = StateGraph::new(&DRUNC_ENTRIES, ControlState::Initial);

impl StateGraph {
    /// Define a graph from a static table. Call [`StateGraph::validate`] to
    /// check the definition.
    pub const fn new(
        entries: &'static [(ControlState, &'static [Edge])],
        initial: ControlState,
    ) -> Self {
        Self { entries, initial }
    }

    /// The drunc run-control graph.
    ///
    /// ```rust
    /// use runcontrol::core::{ControlEvent, ControlState, StateGraph};
    ///
    /// let graph = StateGraph::drunc();
    /// assert!(graph.validate().is_ok());
    /// assert_eq!(
    ///     graph.target_of(ControlState::Configured, ControlEvent::Start),
    ///     Some(ControlState::Ready)
    /// );
    /// ```
    pub fn drunc() -> &'static StateGraph {
        &DRUNC
    }

    pub fn initial(&self) -> ControlState {
        self.initial
    }

    pub fn contains(&self, state: ControlState) -> bool {
        self.entries.iter().any(|(s, _)| *s == state)
    }

    /// Ordered transitions out of `state`.
    pub fn transitions_from(&self, state: ControlState) -> Result<&'static [Edge], ControlError> {
        self.entries
            .iter()
            .find(|(s, _)| *s == state)
            .map(|(_, edges)| *edges)
            .ok_or_else(|| ControlError::UnknownState {
                state: state.name().to_string(),
            })
    }

    /// Ordered transitions out of the state with wire name `name`.
    pub fn transitions_from_name(&self, name: &str) -> Result<&'static [Edge], ControlError> {
        self.transitions_from(name.parse()?)
    }

    /// Every state defined in the graph.
    pub fn all_states(&self) -> BTreeSet<ControlState> {
        self.entries.iter().map(|(s, _)| *s).collect()
    }

    /// States in definition order.
    pub fn states_in_order(&self) -> impl Iterator<Item = ControlState> + '_ {
        self.entries.iter().map(|(s, _)| *s)
    }

    /// Target the graph predicts for `event` from `state`, if legal.
    pub fn target_of(&self, state: ControlState, event: ControlEvent) -> Option<ControlState> {
        self.transitions_from(state)
            .ok()?
            .iter()
            .find(|(e, _)| *e == event)
            .map(|(_, target)| *target)
    }

    /// Check the graph is closed, unambiguous and reachable from its initial
    /// state. The pre-boot sentinel is exempt from reachability.
    pub fn validate(&self) -> Result<(), GraphError> {
        let states = self.all_states();
        if states.len() != self.entries.len() {
            let mut seen = BTreeSet::new();
            for (state, _) in self.entries {
                if !seen.insert(*state) {
                    return Err(GraphError::DuplicateState(*state));
                }
            }
        }

        if !states.contains(&self.initial) {
            return Err(GraphError::MissingInitialState(self.initial));
        }

        for (state, edges) in self.entries {
            let mut events = BTreeSet::new();
            for (event, target) in edges.iter() {
                if !events.insert(*event) {
                    return Err(GraphError::AmbiguousEvent {
                        state: *state,
                        event: *event,
                    });
                }
                if !states.contains(target) {
                    return Err(GraphError::DanglingTarget {
                        state: *state,
                        event: *event,
                        target: *target,
                    });
                }
            }
        }

        let reachable = self.reachable_from(self.initial);
        match self
            .states_in_order()
            .find(|s| !s.is_uninitialized() && !reachable.contains(s))
        {
            Some(state) => Err(GraphError::Unreachable(state)),
            None => Ok(()),
        }
    }

    fn reachable_from(&self, start: ControlState) -> BTreeSet<ControlState> {
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(state) = queue.pop_front() {
            let Ok(edges) = self.transitions_from(state) else {
                continue;
            };
            for (_, target) in edges {
                if seen.insert(*target) {
                    queue.push_back(*target);
                }
            }
        }
        seen
    }
}
