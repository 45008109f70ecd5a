//! A library of standard units for tandem.

use tandem_core::{ComputeError, Value};

pub use branch::Branch;
pub use cast::Cast;
pub use constant::Constant;
pub use debug::DebugText;
pub use func::FnUnit;
pub use ops::{Arith, ArithOp, Compare, CompareOp};
pub use ticker::{Interval, Tick, Ticker};
pub use var::{GetVar, SetVar, VarError, Vars};

pub mod branch;
pub mod cast;
pub mod constant;
pub mod debug;
pub mod func;
pub mod ops;
pub mod ticker;
pub mod var;

/// The `index`th pulled input, or an error naming the input if its port was
/// removed from the unit.
pub(crate) fn input<'a>(
    inputs: &'a [Value],
    index: usize,
    name: &str,
) -> Result<&'a Value, ComputeError> {
    inputs
        .get(index)
        .ok_or_else(|| ComputeError::new(format!("missing input `{name}` at index {index}")))
}
