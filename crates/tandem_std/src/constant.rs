use serde::{Deserialize, Serialize};
use tandem_core::{ComputeError, Context, Output, Shape, Value};

/// Produces the same value every time it is computed.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Constant {
    pub value: Value,
}

impl Constant {
    pub fn new(value: impl Into<Value>) -> Self {
        let value = value.into();
        Constant { value }
    }
}

impl tandem_core::Unit for Constant {
    fn name(&self) -> &str {
        "constant"
    }

    fn shape(&self) -> Shape {
        Shape::default().output("value", self.value.ty())
    }

    fn compute(&mut self, _: &Context, _: &[Value]) -> Result<Output, ComputeError> {
        Ok(Output::new([self.value.clone()]))
    }
}
