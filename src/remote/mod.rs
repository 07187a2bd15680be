//! Interfaces of the remote services the mirror talks to.
//!
//! The controller and the connectivity (directory) service are external; this
//! crate only defines the operations it needs from them. Implementations wrap
//! whatever transport is in use.

mod resolver;

pub use resolver::AddressResolver;

use crate::arguments::{ArgumentDescriptor, TransitionRequest};
use crate::error::{ControlError, RemoteError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// An endpoint registered in the directory service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub uri: String,
}

/// Recursive status tree reported by a controller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusNode {
    pub name: String,
    /// FSM state as the controller names it.
    pub state: String,
    /// Detector served by this application, empty if none.
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub children: Vec<StatusNode>,
}

impl StatusNode {
    /// Detector info of every node in the tree, keyed by node name.
    pub fn detectors(&self) -> BTreeMap<String, String> {
        let mut detectors = BTreeMap::new();
        self.collect_detectors(&mut detectors);
        detectors
    }

    fn collect_detectors(&self, out: &mut BTreeMap<String, String>) {
        out.insert(self.name.clone(), self.info.clone());
        for child in &self.children {
            child.collect_detectors(out);
        }
    }
}

/// An event the controller accepts, with its argument descriptors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionDescription {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<ArgumentDescriptor>,
}

/// Outcome flag of an executed FSM command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseFlag {
    ExecutedSuccessfully,
    NotExecutedInError,
    InvalidTransition,
    Failed,
    Other(i32),
}

impl ResponseFlag {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::ExecutedSuccessfully,
            1 => Self::NotExecutedInError,
            2 => Self::InvalidTransition,
            3 => Self::Failed,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::ExecutedSuccessfully => 0,
            Self::NotExecutedInError => 1,
            Self::InvalidTransition => 2,
            Self::Failed => 3,
            Self::Other(code) => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::ExecutedSuccessfully)
    }
}

impl fmt::Display for ResponseFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutedSuccessfully => f.write_str("FSM_EXECUTED_SUCCESSFULLY"),
            Self::NotExecutedInError => f.write_str("FSM_NOT_EXECUTED_IN_ERROR"),
            Self::InvalidTransition => f.write_str("FSM_INVALID_TRANSITION"),
            Self::Failed => f.write_str("FSM_FAILED"),
            Self::Other(code) => write!(f, "FSM_FLAG_{code}"),
        }
    }
}

/// Reply to an executed transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub flag: ResponseFlag,
    #[serde(default)]
    pub message: String,
}

/// Directory service mapping sessions to service endpoints.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn resolve(
        &self,
        session: &str,
        name: &str,
        kind: &str,
    ) -> Result<Vec<Endpoint>, RemoteError>;
}

/// Operations of a run controller at a given address.
#[async_trait]
pub trait ControllerClient: Send + Sync {
    /// Take exclusive control of the controller for this actor.
    async fn acquire_control(&self, address: &str) -> Result<(), RemoteError>;

    async fn query_status(&self, address: &str) -> Result<StatusNode, RemoteError>;

    async fn describe_transitions(
        &self,
        address: &str,
    ) -> Result<Vec<TransitionDescription>, RemoteError>;

    async fn execute_transition(
        &self,
        address: &str,
        request: &TransitionRequest,
    ) -> Result<ExecutionResponse, RemoteError>;
}

/// Run a remote call with a deadline. Elapsing is reported as
/// [`ControlError::Timeout`].
pub(crate) async fn call_with_timeout<T, F>(
    call: &'static str,
    after: Duration,
    future: F,
) -> Result<T, ControlError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    debug!(call, "Calling remote");
    match tokio::time::timeout(after, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => {
            warn!(call, %error, "Remote call failed");
            Err(error.into())
        }
        Err(_) => {
            warn!(call, ?after, "Remote call timed out");
            Err(ControlError::Timeout { call, after })
        }
    }
}
