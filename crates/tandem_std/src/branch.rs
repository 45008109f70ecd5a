use serde::{Deserialize, Serialize};
use tandem_core::{ComputeError, Context, Output, Shape, Value, ValueType};

/// Forwards control through its `true` output (index 0) or its `false`
/// output (index 1) depending on the pulled condition.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct Branch;

impl Branch {
    pub const TRUE: usize = 0;
    pub const FALSE: usize = 1;
}

impl tandem_core::Unit for Branch {
    fn name(&self) -> &str {
        "branch"
    }

    fn shape(&self) -> Shape {
        Shape::default()
            .with_control_outs(["true", "false"])
            .input("condition", ValueType::Bool)
    }

    fn compute(&mut self, _: &Context, inputs: &[Value]) -> Result<Output, ComputeError> {
        let cond = crate::input(inputs, 0, "condition")?;
        let cond = cond
            .as_bool()
            .ok_or_else(|| ComputeError::new(format!("condition {cond} is not a bool")))?;
        let next = match cond {
            true => Self::TRUE,
            false => Self::FALSE,
        };
        Ok(Output::empty().with_next(next))
    }
}
