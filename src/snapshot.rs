//! Serializable snapshots of a mirror.
//!
//! A mirror normally lives for one interaction. Snapshots let the caller carry
//! it between interactions (e.g. in a web session) and restore it later.
//! Only the state and history are stored; the graph is static.

use crate::core::{ControlState, StateGraph, TransitionHistory};
use crate::mirror::FsmMirror;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Version identifier for the snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors that can occur creating or restoring snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Snapshot validation failed: {0}")]
    ValidationFailed(String),
}

/// Point-in-time copy of a mirror's believed state and history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MirrorSnapshot {
    pub version: u32,
    pub id: Uuid,
    pub taken_at: DateTime<Utc>,
    pub current_state: ControlState,
    pub history: TransitionHistory,
}

impl MirrorSnapshot {
    pub fn capture(mirror: &FsmMirror) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            id: Uuid::new_v4(),
            taken_at: Utc::now(),
            current_state: mirror.current_state(),
            history: mirror.history().clone(),
        }
    }

    /// Rebuild a mirror over `graph`.
    pub fn restore(self, graph: &'static StateGraph) -> Result<FsmMirror, SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        FsmMirror::with_history(graph, self.current_state, self.history)
            .map_err(|e| SnapshotError::ValidationFailed(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))
    }

    /// Compact binary form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        bincode::deserialize(bytes).map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))
    }
}
