//! The compute contract implemented by every node of a tandem graph.

use crate::{
    port::{self, Decl},
    session::Context,
    value::{Value, ValueType},
};
use core::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A node in the graph.
///
/// Units only compute. Status events, caching, loop detection and forwarding
/// of control are all handled by the engine that invokes them.
pub trait Unit {
    /// A display name, e.g. for logging and editors.
    fn name(&self) -> &str;

    /// The ports the unit is created with.
    ///
    /// By default a unit has a single `ControlIn`, a single `ControlOut` and
    /// no value ports.
    fn shape(&self) -> Shape {
        Shape::default()
    }

    /// Produce the unit's output values from its input values.
    ///
    /// The given `inputs` are in the declared order of the unit's `ValueIn`
    /// ports. The `ctx` is the context under which the unit is invoked, with
    /// the unit itself as the last step of its chain.
    ///
    /// Returning `Err` signals a leaf-level failure. Units must not attempt to
    /// drive the engine from here, though they may perform their own external
    /// effects.
    fn compute(&mut self, ctx: &Context, inputs: &[Value]) -> Result<Output, ComputeError>;
}

/// Uniquely identifies a unit for its lifetime within a graph.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Id(pub u32);

/// The ports a unit is created with.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Shape {
    /// Whether the unit has a `ControlIn`.
    pub control_in: bool,
    /// The names of each `ControlOut`, in order.
    pub control_outs: Vec<String>,
    /// The `ValueIn`s, in order.
    pub inputs: Vec<Decl>,
    /// The `ValueOut`s, in order.
    pub outputs: Vec<Decl>,
}

/// The successful result of a unit's compute.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Output {
    /// The computed values, indexed by each `ValueOut`'s slot.
    pub values: Vec<Value>,
    /// The index of the `ControlOut` through which control is forwarded.
    ///
    /// `None` forwards through the sole `ControlOut` if the unit has exactly
    /// one. Ignored if the unit has no `ControlOut`.
    pub next: Option<usize>,
}

/// A leaf-level computation failure.
#[derive(Clone, Debug, Error, Eq, Hash, PartialEq)]
#[error("{0}")]
pub struct ComputeError(pub String);

impl Shape {
    /// A shape with no ports at all.
    pub fn empty() -> Self {
        Shape {
            control_in: false,
            control_outs: vec![],
            inputs: vec![],
            outputs: vec![],
        }
    }

    /// Remove the `ControlIn`, making the unit a possible root only.
    pub fn without_control_in(mut self) -> Self {
        self.control_in = false;
        self
    }

    /// Replace the `ControlOut`s with the given names.
    pub fn with_control_outs<I>(mut self, names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.control_outs = names.into_iter().map(Into::into).collect();
        self
    }

    /// Append a `ValueIn`.
    pub fn input(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        self.inputs.push(Decl::value_in(name, ty));
        self
    }

    /// Append a `ValueIn` that yields `default` while unconnected.
    pub fn input_or(mut self, name: impl Into<String>, ty: ValueType, default: impl Into<Value>) -> Self {
        self.inputs
            .push(Decl::value_in(name, ty).with_default(default));
        self
    }

    /// Append a `ValueOut` serving the next slot of the computed values.
    pub fn output(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        let slot = self.outputs.len();
        self.outputs.push(Decl::value_out(name, ty, slot));
        self
    }

    /// All declarations in registration order.
    pub(crate) fn decls(&self) -> Vec<Decl> {
        let control_in = self.control_in.then(Decl::control_in);
        let control_outs = self.control_outs.iter().map(|n| Decl::control_out(n.clone()));
        control_in
            .into_iter()
            .chain(control_outs)
            .chain(self.inputs.iter().cloned().map(|mut d| {
                d.kind = port::Kind::ValueIn;
                d
            }))
            .chain(self.outputs.iter().cloned().map(|mut d| {
                d.kind = port::Kind::ValueOut;
                d
            }))
            .collect()
    }
}

impl Output {
    /// Output the given values and forward through the default `ControlOut`.
    pub fn new(values: impl Into<Vec<Value>>) -> Self {
        Output {
            values: values.into(),
            next: None,
        }
    }

    /// Output nothing and forward through the default `ControlOut`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Select the `ControlOut` through which control is forwarded.
    pub fn with_next(mut self, next: usize) -> Self {
        self.next = Some(next);
        self
    }
}

impl ComputeError {
    pub fn new(msg: impl Into<String>) -> Self {
        ComputeError(msg.into())
    }
}

impl Default for Shape {
    fn default() -> Self {
        Shape {
            control_in: true,
            control_outs: vec!["out".to_string()],
            inputs: vec![],
            outputs: vec![],
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<U> Unit for Box<U>
where
    U: ?Sized + Unit,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn shape(&self) -> Shape {
        (**self).shape()
    }

    fn compute(&mut self, ctx: &Context, inputs: &[Value]) -> Result<Output, ComputeError> {
        (**self).compute(ctx, inputs)
    }
}

impl<'a, U> Unit for &'a mut U
where
    U: ?Sized + Unit,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn shape(&self) -> Shape {
        (**self).shape()
    }

    fn compute(&mut self, ctx: &Context, inputs: &[Value]) -> Result<Output, ComputeError> {
        (**self).compute(ctx, inputs)
    }
}
