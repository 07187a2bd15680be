//! Pure core of the run-control state machine:
//! - control states and events
//! - the static transition graph
//! - immutable history of confirmed transitions
//!
//! Nothing in this module performs I/O.

mod graph;
mod history;
mod state;

pub use graph::{Edge, GraphError, StateGraph};
pub use history::{ConfirmedTransition, TransitionHistory};
pub use state::{ControlEvent, ControlState};
