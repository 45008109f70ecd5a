use core::fmt;
use tandem_core::{ComputeError, Context, Output, Shape, Value, ValueType};

/// A value source backed by a closure, called each time the unit computes.
pub struct FnUnit<F> {
    name: String,
    ty: ValueType,
    f: F,
}

impl<F> FnUnit<F>
where
    F: FnMut() -> Result<Value, ComputeError>,
{
    /// A unit named `name` whose single output of type `ty` is produced by
    /// `f`.
    pub fn new(name: impl Into<String>, ty: ValueType, f: F) -> Self {
        let name = name.into();
        FnUnit { name, ty, f }
    }
}

impl<F> tandem_core::Unit for FnUnit<F>
where
    F: FnMut() -> Result<Value, ComputeError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn shape(&self) -> Shape {
        Shape::default().output("value", self.ty)
    }

    fn compute(&mut self, _: &Context, _: &[Value]) -> Result<Output, ComputeError> {
        let value = (self.f)()?;
        Ok(Output::new([value]))
    }
}

impl<F> fmt::Debug for FnUnit<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnUnit")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish()
    }
}
