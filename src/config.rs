//! Configuration for resolving and driving a run controller.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Session name must not be empty")]
    EmptySession,

    #[error("Call timeout must be greater than zero")]
    ZeroTimeout,
}

/// Settings for dispatching transitions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Deadline for each remote call, in milliseconds.
    pub call_timeout_ms: u64,

    /// Reject a transition locally when mandatory arguments are missing,
    /// instead of leaving it to the controller.
    pub require_mandatory: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 10_000,
            require_mandatory: true,
        }
    }
}

impl DispatchConfig {
    /// Short deadlines for a controller on the same host.
    pub fn for_local() -> Self {
        Self {
            call_timeout_ms: 2_000,
            ..Default::default()
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Where to find the controller and how to talk to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunControlConfig {
    /// Session registered in the connectivity service.
    pub session: String,

    /// Service name the root controller registers under.
    pub controller_service: String,

    /// Message kind of the root controller endpoint.
    pub controller_kind: String,

    pub dispatch: DispatchConfig,
}

impl Default for RunControlConfig {
    fn default() -> Self {
        Self {
            session: String::new(),
            controller_service: "root-controller_control".to_string(),
            controller_kind: "RunControlMessage".to_string(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl RunControlConfig {
    pub fn for_session(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            ..Default::default()
        }
    }

    /// Parse and validate a JSON configuration. Missing fields take their
    /// defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.trim().is_empty() {
            return Err(ConfigError::EmptySession);
        }
        if self.dispatch.call_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
