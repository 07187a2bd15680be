//! Property-based tests for the graph and mirror.
//!
//! These tests use proptest to check the projections agree with each other
//! for every state and event.

use proptest::prelude::*;
use runcontrol::core::{ControlEvent, ControlState, StateGraph};
use runcontrol::mirror::FsmMirror;
use runcontrol::snapshot::MirrorSnapshot;
use runcontrol::ControlError;
use std::collections::BTreeSet;

prop_compose! {
    fn arbitrary_state()(index in 0..ControlState::ALL.len()) -> ControlState {
        ControlState::ALL[index]
    }
}

prop_compose! {
    fn arbitrary_event()(index in 0..ControlEvent::ALL.len()) -> ControlEvent {
        ControlEvent::ALL[index]
    }
}

fn mirror_at(state: ControlState) -> FsmMirror {
    FsmMirror::new(StateGraph::drunc(), state).unwrap()
}

proptest! {
    #[test]
    fn legal_events_match_graph_order(state in arbitrary_state()) {
        let expected: Vec<ControlEvent> = StateGraph::drunc()
            .transitions_from(state)
            .unwrap()
            .iter()
            .map(|(event, _)| *event)
            .collect();

        prop_assert_eq!(mirror_at(state).legal_events(), expected);
    }

    #[test]
    fn describe_all_agrees_with_transitions_from(state in arbitrary_state()) {
        let graph = StateGraph::drunc();
        for (described, edges) in mirror_at(state).describe_all() {
            let from_description: BTreeSet<ControlEvent> =
                edges.iter().map(|(event, _)| *event).collect();
            let from_graph: BTreeSet<ControlEvent> =
                mirror_at(described).legal_events().into_iter().collect();
            let direct: BTreeSet<ControlEvent> = graph
                .transitions_from(described)
                .unwrap()
                .iter()
                .map(|(event, _)| *event)
                .collect();

            prop_assert_eq!(&from_description, &direct);
            prop_assert_eq!(&from_graph, &direct);
        }
    }

    #[test]
    fn illegal_events_never_change_state(
        state in arbitrary_state(),
        event in arbitrary_event(),
        reported in arbitrary_state(),
    ) {
        let mut mirror = mirror_at(state);
        prop_assume!(!mirror.legal_events().contains(&event));

        let result = mirror.apply_confirmed_transition(event, reported);

        let is_illegal = matches!(result, Err(ControlError::IllegalTransition { .. }));
        prop_assert!(is_illegal);
        prop_assert_eq!(mirror.current_state(), state);
    }

    #[test]
    fn confirmed_transition_adopts_any_reported_state(
        state in arbitrary_state(),
        reported in arbitrary_state(),
    ) {
        let mut mirror = mirror_at(state);
        let Some(event) = mirror.legal_events().first().copied() else {
            return Ok(());
        };

        mirror.apply_confirmed_transition(event, reported).unwrap();

        prop_assert_eq!(mirror.current_state(), reported);
        prop_assert_eq!(mirror.history().transitions().len(), 1);
    }

    #[test]
    fn repeated_confirmation_is_idempotent(state in arbitrary_state()) {
        let mut mirror = mirror_at(state);
        let Some((event, target)) = StateGraph::drunc()
            .transitions_from(state)
            .unwrap()
            .first()
            .copied()
        else {
            return Ok(());
        };

        mirror.apply_confirmed_transition(event, target).unwrap();
        mirror.apply_confirmed_transition(event, target).unwrap();

        prop_assert_eq!(mirror.current_state(), target);
    }

    #[test]
    fn snapshot_roundtrip_preserves_state(state in arbitrary_state()) {
        let mirror = mirror_at(state);
        let json = MirrorSnapshot::capture(&mirror).to_json().unwrap();
        let restored = MirrorSnapshot::from_json(&json)
            .unwrap()
            .restore(StateGraph::drunc())
            .unwrap();

        prop_assert_eq!(restored.current_state(), state);
    }
}
