//! Runcontrol: a local mirror of a remote run controller's state machine
//!
//! The controller owns the true run-control state. This crate keeps a
//! possibly-stale copy of it, tells callers which events are legal, builds
//! argument forms, and dispatches transitions. Local state changes only after
//! the controller confirms a transition, and the new state is always read back
//! from the controller rather than predicted from the graph.
//!
//! # Core Concepts
//!
//! - **StateGraph**: Static table of control states and legal transitions
//! - **FsmMirror**: Believed current state plus display projections
//! - **EventDispatcher**: Validated, serialized dispatch to the controller
//! - **RunControl**: Session-level entry points for a presentation layer
//!
//! # Example
//!
//! ```rust
//! use runcontrol::core::{ControlEvent, ControlState, StateGraph};
//! use runcontrol::mirror::FsmMirror;
//!
//! let mut mirror = FsmMirror::new(StateGraph::drunc(), ControlState::Configured).unwrap();
//! assert_eq!(mirror.legal_events(), vec![ControlEvent::Scrap, ControlEvent::Start]);
//!
//! // The controller confirmed `start` and reports it is now `ready`.
//! mirror
//!     .apply_confirmed_transition(ControlEvent::Start, ControlState::Ready)
//!     .unwrap();
//! assert_eq!(mirror.current_state(), ControlState::Ready);
//! ```

pub mod arguments;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod mirror;
pub mod remote;
pub mod session;
pub mod snapshot;

// Re-export commonly used types
pub use config::{DispatchConfig, RunControlConfig};
pub use core::{ControlEvent, ControlState, StateGraph};
pub use dispatch::{DispatchResult, EventDispatcher};
pub use error::{ControlError, RemoteError};
pub use mirror::FsmMirror;
pub use session::RunControl;
