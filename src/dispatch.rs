//! Sends validated transitions to the controller and reconciles the mirror
//! with the controller's answer.
//!
//! A dispatch is: legality check → describe → encode → acquire control →
//! execute → requery status → apply. The legality check is local and makes no
//! remote call. Everything after it runs under a per-address lock so two
//! dispatches never interleave against the same controller.

use crate::arguments::{
    check_mandatory, encode_arguments, ArgumentDescriptor, RawArguments, TransitionRequest,
};
use crate::config::DispatchConfig;
use crate::core::{ControlEvent, ControlState};
use crate::error::ControlError;
use crate::mirror::FsmMirror;
use crate::remote::{call_with_timeout, ControllerClient, StatusNode, TransitionDescription};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use stillwater::validation::Validation;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Outcome of a dispatch: the state the controller reports after a confirmed
/// transition, or the reason nothing changed.
pub type DispatchResult = Result<ControlState, ControlError>;

/// Drives transitions on controllers through a [`ControllerClient`].
pub struct EventDispatcher {
    controller: Arc<dyn ControllerClient>,
    config: DispatchConfig,
    targets: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl EventDispatcher {
    pub fn new(controller: Arc<dyn ControllerClient>, config: DispatchConfig) -> Self {
        Self {
            controller,
            config,
            targets: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Parse `event_name` and check it is legal from the mirror's state.
    pub fn check_legal(mirror: &FsmMirror, event_name: &str) -> Result<ControlEvent, ControlError> {
        ControlEvent::from_name(event_name)
            .filter(|event| mirror.is_legal(*event))
            .ok_or_else(|| ControlError::IllegalTransition {
                event: event_name.to_string(),
                state: mirror.current_state().name().to_string(),
            })
    }

    /// Current status tree of the controller at `address`.
    pub async fn query_status(&self, address: &str) -> Result<StatusNode, ControlError> {
        call_with_timeout(
            "query_status",
            self.config.call_timeout(),
            self.controller.query_status(address),
        )
        .await
    }

    /// Argument descriptors the controller declares for `event_name`.
    pub async fn arguments_for(
        &self,
        address: &str,
        event_name: &str,
    ) -> Result<Vec<ArgumentDescriptor>, ControlError> {
        let descriptions = call_with_timeout(
            "describe_transitions",
            self.config.call_timeout(),
            self.controller.describe_transitions(address),
        )
        .await?;
        find_event(descriptions, event_name)
    }

    /// Dispatch `event_name` with `raw` arguments to the controller at
    /// `address`, updating `mirror` only after the controller confirms.
    #[instrument(skip_all, fields(address = %address, event = %event_name))]
    pub async fn dispatch(
        &self,
        mirror: &mut FsmMirror,
        address: &str,
        event_name: &str,
        raw: &RawArguments,
    ) -> DispatchResult {
        let event = Self::check_legal(mirror, event_name)?;

        let lock = self.target_lock(address);
        let _guard = lock.lock().await;
        debug!("Holding controller lock");

        let descriptors = self.arguments_for(address, event_name).await?;
        if self.config.require_mandatory {
            if let Validation::Failure(violations) = check_mandatory(&descriptors, raw) {
                return Err(violations.into());
            }
        }
        let request = TransitionRequest {
            event,
            arguments: encode_arguments(&descriptors, raw)?,
        };

        let timeout = self.config.call_timeout();
        call_with_timeout(
            "acquire_control",
            timeout,
            self.controller.acquire_control(address),
        )
        .await?;

        let response = call_with_timeout(
            "execute_transition",
            timeout,
            self.controller.execute_transition(address, &request),
        )
        .await?;
        if !response.flag.is_success() {
            warn!(flag = %response.flag, message = %response.message, "Controller rejected transition");
            return Err(ControlError::RemoteExecutionFailure {
                event: event_name.to_string(),
                flag: response.flag,
                message: response.message,
            });
        }

        let status = self.query_status(address).await?;
        let reported = status.state.parse::<ControlState>().inspect_err(|_| {
            warn!(reported = %status.state, "Controller reported a state unknown to the mirror");
        })?;
        mirror.apply_confirmed_transition(event, reported)?;
        info!(state = %reported, "Transition confirmed");
        Ok(reported)
    }

    fn target_lock(&self, address: &str) -> Arc<Mutex<()>> {
        let mut targets = self.targets.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(targets.entry(address.to_string()).or_default())
    }
}

fn find_event(
    descriptions: Vec<TransitionDescription>,
    event_name: &str,
) -> Result<Vec<ArgumentDescriptor>, ControlError> {
    let known: Vec<String> = descriptions.iter().map(|d| d.name.clone()).collect();
    descriptions
        .into_iter()
        .find(|d| d.name == event_name)
        .map(|d| d.arguments)
        .ok_or_else(|| {
            warn!(event = event_name, "Controller does not recognise event");
            ControlError::UnknownEvent {
                event: event_name.to_string(),
                known,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::{ArgumentType, Presence};
    use crate::core::StateGraph;
    use crate::error::RemoteError;
    use crate::remote::{ExecutionResponse, ResponseFlag};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    struct ScriptedController {
        flag: ResponseFlag,
        reported: &'static str,
        events: Vec<TransitionDescription>,
        calls: AtomicUsize,
    }

    impl ScriptedController {
        fn new(flag: ResponseFlag, reported: &'static str) -> Arc<Self> {
            Arc::new(Self {
                flag,
                reported,
                events: vec![
                    TransitionDescription {
                        name: "start".to_string(),
                        arguments: vec![ArgumentDescriptor::new(
                            "run_type",
                            Presence::Mandatory,
                            ArgumentType::String,
                        )],
                    },
                    TransitionDescription {
                        name: "scrap".to_string(),
                        arguments: vec![],
                    },
                ],
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ControllerClient for ScriptedController {
        async fn acquire_control(&self, _address: &str) -> Result<(), RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn query_status(&self, _address: &str) -> Result<StatusNode, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StatusNode {
                name: "root-controller".to_string(),
                state: self.reported.to_string(),
                ..Default::default()
            })
        }

        async fn describe_transitions(
            &self,
            _address: &str,
        ) -> Result<Vec<TransitionDescription>, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.events.clone())
        }

        async fn execute_transition(
            &self,
            _address: &str,
            _request: &TransitionRequest,
        ) -> Result<ExecutionResponse, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExecutionResponse {
                flag: self.flag,
                message: "scripted".to_string(),
            })
        }
    }

    fn configured() -> FsmMirror {
        FsmMirror::new(StateGraph::drunc(), ControlState::Configured).unwrap()
    }

    fn run_type(value: &str) -> RawArguments {
        json!({ "run_type": value }).as_object().cloned().unwrap()
    }

    #[test]
    fn check_legal_rejects_unknown_and_illegal_names() {
        let mirror = configured();
        assert_eq!(
            EventDispatcher::check_legal(&mirror, "start"),
            Ok(ControlEvent::Start)
        );
        assert!(matches!(
            EventDispatcher::check_legal(&mirror, "stop"),
            Err(ControlError::IllegalTransition { .. })
        ));
        assert!(matches!(
            EventDispatcher::check_legal(&mirror, "boot"),
            Err(ControlError::IllegalTransition { .. })
        ));
    }

    #[tokio::test]
    async fn confirmed_dispatch_makes_four_calls() {
        let controller = ScriptedController::new(ResponseFlag::ExecutedSuccessfully, "ready");
        let dispatcher = EventDispatcher::new(controller.clone(), DispatchConfig::default());
        let mut mirror = configured();

        let result = dispatcher
            .dispatch(&mut mirror, "ctrl:1", "start", &run_type("TEST"))
            .await;

        assert_eq!(result, Ok(ControlState::Ready));
        assert_eq!(mirror.current_state(), ControlState::Ready);
        assert_eq!(controller.calls(), 4);
    }

    #[tokio::test]
    async fn missing_mandatory_argument_stops_before_acquiring_control() {
        let controller = ScriptedController::new(ResponseFlag::ExecutedSuccessfully, "ready");
        let dispatcher = EventDispatcher::new(controller.clone(), DispatchConfig::default());
        let mut mirror = configured();

        let result = dispatcher
            .dispatch(&mut mirror, "ctrl:1", "start", &RawArguments::new())
            .await;

        assert_eq!(
            result,
            Err(ControlError::MissingMandatoryArguments(vec!["run_type".to_string()]))
        );
        // describe only
        assert_eq!(controller.calls(), 1);
        assert_eq!(mirror.current_state(), ControlState::Configured);
    }

    #[tokio::test]
    async fn mandatory_check_can_be_left_to_controller() {
        let controller = ScriptedController::new(ResponseFlag::ExecutedSuccessfully, "ready");
        let config = DispatchConfig {
            require_mandatory: false,
            ..Default::default()
        };
        let dispatcher = EventDispatcher::new(controller.clone(), config);
        let mut mirror = configured();

        let result = dispatcher
            .dispatch(&mut mirror, "ctrl:1", "start", &RawArguments::new())
            .await;

        assert_eq!(result, Ok(ControlState::Ready));
    }

    #[tokio::test]
    #[traced_test]
    async fn rejected_transition_is_logged_and_state_kept() {
        let controller = ScriptedController::new(ResponseFlag::InvalidTransition, "ready");
        let dispatcher = EventDispatcher::new(controller, DispatchConfig::default());
        let mut mirror = configured();

        let result = dispatcher
            .dispatch(&mut mirror, "ctrl:1", "scrap", &RawArguments::new())
            .await;

        assert!(matches!(
            result,
            Err(ControlError::RemoteExecutionFailure {
                flag: ResponseFlag::InvalidTransition,
                ..
            })
        ));
        assert_eq!(mirror.current_state(), ControlState::Configured);
        assert!(logs_contain("Controller rejected transition"));
    }

    #[tokio::test]
    async fn unknown_reported_state_leaves_mirror_untouched() {
        let controller = ScriptedController::new(ResponseFlag::ExecutedSuccessfully, "booting");
        let dispatcher = EventDispatcher::new(controller, DispatchConfig::default());
        let mut mirror = configured();

        let result = dispatcher
            .dispatch(&mut mirror, "ctrl:1", "scrap", &RawArguments::new())
            .await;

        assert!(matches!(result, Err(ControlError::UnknownState { state }) if state == "booting"));
        assert_eq!(mirror.current_state(), ControlState::Configured);
    }

    #[test]
    fn find_event_reports_known_events() {
        let descriptions = vec![TransitionDescription {
            name: "conf".to_string(),
            arguments: vec![],
        }];

        let err = find_event(descriptions, "start").unwrap_err();
        assert_eq!(
            err,
            ControlError::UnknownEvent {
                event: "start".to_string(),
                known: vec!["conf".to_string()],
            }
        );
    }

    #[test]
    fn target_locks_are_shared_per_address() {
        let controller = ScriptedController::new(ResponseFlag::ExecutedSuccessfully, "ready");
        let dispatcher = EventDispatcher::new(controller, DispatchConfig::default());

        let a1 = dispatcher.target_lock("a:1");
        let a2 = dispatcher.target_lock("a:1");
        let b = dispatcher.target_lock("b:1");

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }
}
