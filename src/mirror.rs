//! Local mirror of the controller's state machine.
//!
//! The mirror pairs a static [`StateGraph`] with the state the controller is
//! believed to be in. It answers which events are legal, provides display
//! projections, and accepts state changes only once the controller has
//! confirmed them.

use crate::core::{
    ConfirmedTransition, ControlEvent, ControlState, Edge, StateGraph, TransitionHistory,
};
use crate::error::ControlError;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

/// A row of the flattened FSM table shown by the dashboard.
///
/// Rows of the current state are `active`; only active transitions are
/// offered as clickable actions.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FsmTableRow {
    State {
        state: ControlState,
        active: bool,
    },
    Transition {
        event: ControlEvent,
        target: ControlState,
        active: bool,
    },
}

/// What we currently believe the remote controller's state is.
#[derive(Clone, Debug)]
pub struct FsmMirror {
    graph: &'static StateGraph,
    current: ControlState,
    history: TransitionHistory,
}

impl FsmMirror {
    /// Create a mirror at `state`, which must be defined in `graph`.
    pub fn new(graph: &'static StateGraph, state: ControlState) -> Result<Self, ControlError> {
        ensure_in_graph(graph, state)?;
        Ok(Self {
            graph,
            current: state,
            history: TransitionHistory::new(),
        })
    }

    /// Create a mirror from a state name as reported by the controller.
    ///
    /// ```rust
    /// use runcontrol::core::{ControlEvent, StateGraph};
    /// use runcontrol::mirror::FsmMirror;
    ///
    /// let mirror = FsmMirror::from_name(StateGraph::drunc(), "configured").unwrap();
    /// assert_eq!(mirror.legal_events(), vec![ControlEvent::Scrap, ControlEvent::Start]);
    /// ```
    pub fn from_name(graph: &'static StateGraph, name: &str) -> Result<Self, ControlError> {
        Self::new(graph, name.parse()?)
    }

    /// Restore a mirror together with its recorded history.
    pub(crate) fn with_history(
        graph: &'static StateGraph,
        state: ControlState,
        history: TransitionHistory,
    ) -> Result<Self, ControlError> {
        let mut mirror = Self::new(graph, state)?;
        mirror.history = history;
        Ok(mirror)
    }

    pub fn current_state(&self) -> ControlState {
        self.current
    }

    pub fn graph(&self) -> &'static StateGraph {
        self.graph
    }

    pub fn history(&self) -> &TransitionHistory {
        &self.history
    }

    /// Events legal from the current state, in graph order. May be empty.
    pub fn legal_events(&self) -> Vec<ControlEvent> {
        self.edges().iter().map(|(event, _)| *event).collect()
    }

    pub fn is_legal(&self, event: ControlEvent) -> bool {
        self.edges().iter().any(|(e, _)| *e == event)
    }

    /// Every state with its legal transitions, in fixed display order.
    pub fn describe_all(&self) -> Vec<(ControlState, &'static [Edge])> {
        ControlState::ALL
            .iter()
            .filter_map(|state| {
                self.graph
                    .transitions_from(*state)
                    .ok()
                    .map(|edges| (*state, edges))
            })
            .collect()
    }

    /// Flatten [`FsmMirror::describe_all`] into table rows: a state row
    /// followed by one row per transition.
    pub fn table_rows(&self) -> Vec<FsmTableRow> {
        let mut rows = Vec::new();
        for (state, edges) in self.describe_all() {
            let active = state == self.current;
            rows.push(FsmTableRow::State { state, active });
            rows.extend(edges.iter().map(|(event, target)| FsmTableRow::Transition {
                event: *event,
                target: *target,
                active,
            }));
        }
        rows
    }

    /// Apply a transition the controller has confirmed.
    ///
    /// `reported` is the state the controller says it is in now. It is adopted
    /// even when the local graph predicts a different target.
    ///
    /// Re-applying the most recent confirmation is a no-op.
    pub fn apply_confirmed_transition(
        &mut self,
        event: ControlEvent,
        reported: ControlState,
    ) -> Result<(), ControlError> {
        ensure_in_graph(self.graph, reported)?;

        if !self.is_legal(event) {
            if self.is_repeat_confirmation(event, reported) {
                debug!(%event, state = %reported, "Ignoring repeated confirmation");
                return Ok(());
            }
            return Err(ControlError::IllegalTransition {
                event: event.name().to_string(),
                state: self.current.name().to_string(),
            });
        }

        let predicted = self.graph.target_of(self.current, event);
        if predicted != Some(reported) {
            warn!(
                %event,
                from = %self.current,
                ?predicted,
                %reported,
                "Controller reported a state the local graph does not predict"
            );
        }

        self.history = self.history.record(ConfirmedTransition {
            from: self.current,
            event,
            to: reported,
            timestamp: Utc::now(),
        });
        self.current = reported;
        Ok(())
    }

    /// Overwrite the current state with one read from the controller.
    pub fn resync(&mut self, reported: ControlState) -> Result<(), ControlError> {
        ensure_in_graph(self.graph, reported)?;
        if reported != self.current {
            debug!(from = %self.current, to = %reported, "Resynced mirror");
        }
        self.current = reported;
        Ok(())
    }

    fn edges(&self) -> &'static [Edge] {
        // Construction and every mutation keep `current` inside the graph.
        self.graph.transitions_from(self.current).unwrap_or(&[])
    }

    fn is_repeat_confirmation(&self, event: ControlEvent, reported: ControlState) -> bool {
        self.current == reported
            && self
                .history
                .last()
                .is_some_and(|last| last.event == event && last.to == reported)
    }
}

fn ensure_in_graph(graph: &StateGraph, state: ControlState) -> Result<(), ControlError> {
    if graph.contains(state) {
        Ok(())
    } else {
        Err(ControlError::UnknownState {
            state: state.name().to_string(),
        })
    }
}
