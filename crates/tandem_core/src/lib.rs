//! The execution engine of tandem: a graph of units whose edges carry two
//! causality models.
//!
//! Control edges push imperative control from a unit to its successor. Value
//! edges let a unit pull the values it needs from the units it depends on,
//! on demand. The [`invoke`] engine reconciles the two, using a per-session
//! [`Context`] to detect loops and to decide when a previously computed value
//! may be reused.

pub use chain::{Chain, Direction};
pub use connector::Connector;
pub use event::{Status, StatusEvent};
pub use graph::Graph;
pub use invoke::{Failure, InvokeResult, Sender};
pub use session::{Context, Session};
pub use unit::{ComputeError, Output, Shape, Unit};
pub use value::{Value, ValueType};

pub mod chain;
pub mod connector;
pub mod event;
pub mod graph;
pub mod invoke;
pub mod port;
pub mod session;
pub mod unit;
pub mod value;
