//! Caller-facing entry points for one run-control session.

use crate::arguments::{form_spec, FormField, RawArguments};
use crate::config::RunControlConfig;
use crate::core::{ControlEvent, StateGraph};
use crate::dispatch::{DispatchResult, EventDispatcher};
use crate::error::ControlError;
use crate::mirror::FsmMirror;
use crate::remote::{AddressResolver, ControllerClient, DirectoryService};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Binds the graph, address resolution and dispatch for a single session.
///
/// One `RunControl` is built at startup and shared; mirrors are created per
/// interaction and passed in.
pub struct RunControl {
    config: RunControlConfig,
    graph: &'static StateGraph,
    resolver: AddressResolver,
    dispatcher: EventDispatcher,
}

impl RunControl {
    pub fn new(
        config: RunControlConfig,
        directory: Arc<dyn DirectoryService>,
        controller: Arc<dyn ControllerClient>,
    ) -> Self {
        let resolver = AddressResolver::new(
            directory,
            config.controller_service.clone(),
            config.controller_kind.clone(),
            config.dispatch.call_timeout(),
        );
        let dispatcher = EventDispatcher::new(controller, config.dispatch.clone());
        Self {
            config,
            graph: StateGraph::drunc(),
            resolver,
            dispatcher,
        }
    }

    /// Use a different transition graph.
    pub fn with_graph(mut self, graph: &'static StateGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn session(&self) -> &str {
        &self.config.session
    }

    pub fn graph(&self) -> &'static StateGraph {
        self.graph
    }

    /// Events legal from `state_name`, for building action menus.
    pub fn legal_events_for(&self, state_name: &str) -> Result<Vec<ControlEvent>, ControlError> {
        Ok(FsmMirror::from_name(self.graph, state_name)?.legal_events())
    }

    /// Input fields the controller declares for `event_name`.
    pub async fn argument_form_spec_for(
        &self,
        event_name: &str,
    ) -> Result<Vec<FormField>, ControlError> {
        let address = self.address().await?;
        let descriptors = self.dispatcher.arguments_for(&address, event_name).await?;
        form_spec(&descriptors)
    }

    /// Validate and dispatch a transition, updating `mirror` on confirmation.
    ///
    /// Illegal events are rejected before any remote call, address lookup
    /// included.
    pub async fn attempt_transition(
        &self,
        mirror: &mut FsmMirror,
        event_name: &str,
        arguments: &RawArguments,
    ) -> DispatchResult {
        EventDispatcher::check_legal(mirror, event_name)?;
        let address = self.address().await?;
        self.dispatcher
            .dispatch(mirror, &address, event_name, arguments)
            .await
    }

    /// Build a mirror at the state the controller currently reports.
    pub async fn current_mirror(&self) -> Result<FsmMirror, ControlError> {
        let address = self.address().await?;
        let status = self.dispatcher.query_status(&address).await?;
        FsmMirror::from_name(self.graph, &status.state)
    }

    /// Re-read the controller state into an existing mirror.
    pub async fn resync(&self, mirror: &mut FsmMirror) -> Result<(), ControlError> {
        let address = self.address().await?;
        let status = self.dispatcher.query_status(&address).await?;
        mirror.resync(status.state.parse()?)
    }

    /// Detector served by each application in the controller tree.
    pub async fn detectors(&self) -> Result<BTreeMap<String, String>, ControlError> {
        let address = self.address().await?;
        Ok(self.dispatcher.query_status(&address).await?.detectors())
    }

    async fn address(&self) -> Result<String, ControlError> {
        let address = self.resolver.resolve(&self.config.session).await?;
        debug!(session = %self.config.session, %address, "Using controller");
        Ok(address)
    }
}

/// Convenience for building [`RawArguments`] from JSON object literals.
///
/// Non-object values give an empty argument set.
pub fn raw_arguments(value: Value) -> RawArguments {
    match value {
        Value::Object(map) => map,
        _ => RawArguments::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ControlState;
    use serde_json::json;

    #[test]
    fn raw_arguments_accepts_objects_only() {
        let args = raw_arguments(json!({"run_type": "TEST", "trigger_rate": null}));
        assert_eq!(args.len(), 2);
        assert!(raw_arguments(json!([1, 2])).is_empty());
    }

    #[test]
    fn graph_lookup_needs_no_remote() {
        let directory: Arc<dyn DirectoryService> = Arc::new(NoDirectory);
        let controller: Arc<dyn ControllerClient> = Arc::new(NoController);
        let control = RunControl::new(RunControlConfig::for_session("s"), directory, controller);

        assert_eq!(
            control.legal_events_for("ready").unwrap(),
            vec![ControlEvent::EnableTriggers, ControlEvent::DrainDataflow]
        );
        assert!(control.legal_events_for("none").unwrap().is_empty());
        assert!(matches!(
            control.legal_events_for("paused"),
            Err(ControlError::UnknownState { .. })
        ));
        assert_eq!(control.graph().initial(), ControlState::Initial);
        assert_eq!(control.session(), "s");
    }

    struct NoDirectory;
    struct NoController;

    #[async_trait::async_trait]
    impl DirectoryService for NoDirectory {
        async fn resolve(
            &self,
            _session: &str,
            _name: &str,
            _kind: &str,
        ) -> Result<Vec<crate::remote::Endpoint>, crate::error::RemoteError> {
            panic!("directory must not be called")
        }
    }

    #[async_trait::async_trait]
    impl ControllerClient for NoController {
        async fn acquire_control(&self, _address: &str) -> Result<(), crate::error::RemoteError> {
            panic!("controller must not be called")
        }

        async fn query_status(
            &self,
            _address: &str,
        ) -> Result<crate::remote::StatusNode, crate::error::RemoteError> {
            panic!("controller must not be called")
        }

        async fn describe_transitions(
            &self,
            _address: &str,
        ) -> Result<Vec<crate::remote::TransitionDescription>, crate::error::RemoteError> {
            panic!("controller must not be called")
        }

        async fn execute_transition(
            &self,
            _address: &str,
            _request: &crate::arguments::TransitionRequest,
        ) -> Result<crate::remote::ExecutionResponse, crate::error::RemoteError> {
            panic!("controller must not be called")
        }
    }
}
