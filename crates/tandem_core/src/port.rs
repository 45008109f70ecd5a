//! Typed endpoints owned by units, and the rules for attaching them.
//!
//! A port is one of four kinds. Control ports form push-driven edges
//! (`ControlOut` -> `ControlIn`), value ports form pull-driven edges
//! (`ValueIn` <- `ValueOut`). Each kind declares its own arity and the
//! [`Connector`](crate::Connector) consults both sides independently when
//! attaching a pair.

use crate::{
    unit,
    value::{Value, ValueType},
};
use core::fmt;
use serde::{Deserialize, Serialize};

/// Uniquely identifies a port within the connector that created it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Id {
    /// The connector instance that registered the port.
    pub(crate) connector: u32,
    /// The index of the port within that connector.
    pub(crate) index: u32,
}

/// The four kinds of port.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Kind {
    /// Receives control from a predecessor's `ControlOut`.
    ControlIn,
    /// Forwards control to a successor's `ControlIn`.
    ControlOut,
    /// Pulls a value from a `ValueOut`.
    ValueIn,
    /// Serves a value to any number of `ValueIn`s.
    ValueOut,
}

/// How many counterparts a port may be attached to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Arity {
    One,
    Many,
}

/// The declaration of a port, prior to it being registered with a connector.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Decl {
    pub kind: Kind,
    /// A display name, e.g. for editors and logging.
    pub name: String,
    /// The declared value type. Ignored by control ports.
    pub ty: ValueType,
    /// For `ValueOut`s, the index into the unit's computed values.
    pub slot: usize,
    /// For `ValueIn`s, the value used when the port is left unconnected.
    pub default: Option<Value>,
}

/// A port registered with a connector.
#[derive(Clone, Debug, PartialEq)]
pub struct Port {
    pub(crate) unit: unit::Id,
    pub(crate) decl: Decl,
}

impl Id {
    /// The index of the port within its connector.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl Kind {
    /// The kind that this kind attaches to.
    pub fn counterpart(self) -> Self {
        match self {
            Kind::ControlIn => Kind::ControlOut,
            Kind::ControlOut => Kind::ControlIn,
            Kind::ValueIn => Kind::ValueOut,
            Kind::ValueOut => Kind::ValueIn,
        }
    }

    /// A `ValueOut` may serve many consumers. Every other kind is limited to a
    /// single counterpart.
    pub fn arity(self) -> Arity {
        match self {
            Kind::ValueOut => Arity::Many,
            Kind::ControlIn | Kind::ControlOut | Kind::ValueIn => Arity::One,
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, Kind::ControlIn | Kind::ControlOut)
    }

    pub fn is_value(self) -> bool {
        !self.is_control()
    }
}

impl Decl {
    fn new(kind: Kind, name: impl Into<String>, ty: ValueType) -> Self {
        Decl {
            kind,
            name: name.into(),
            ty,
            slot: 0,
            default: None,
        }
    }

    pub fn control_in() -> Self {
        Self::new(Kind::ControlIn, "in", ValueType::Any)
    }

    pub fn control_out(name: impl Into<String>) -> Self {
        Self::new(Kind::ControlOut, name, ValueType::Any)
    }

    pub fn value_in(name: impl Into<String>, ty: ValueType) -> Self {
        Self::new(Kind::ValueIn, name, ty)
    }

    /// A value output serving the value at `slot` of the unit's computed
    /// values.
    pub fn value_out(name: impl Into<String>, ty: ValueType, slot: usize) -> Self {
        let mut decl = Self::new(Kind::ValueOut, name, ty);
        decl.slot = slot;
        decl
    }

    /// Provide a value for an input that is left unconnected.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

impl Port {
    pub(crate) fn new(unit: unit::Id, decl: Decl) -> Self {
        Port { unit, decl }
    }

    /// The unit that owns this port.
    pub fn unit(&self) -> unit::Id {
        self.unit
    }

    pub fn kind(&self) -> Kind {
        self.decl.kind
    }

    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn ty(&self) -> ValueType {
        self.decl.ty
    }

    pub fn slot(&self) -> usize {
        self.decl.slot
    }

    pub fn default(&self) -> Option<&Value> {
        self.decl.default.as_ref()
    }

    pub fn decl(&self) -> &Decl {
        &self.decl
    }

    /// Whether this port's kind and type policy accepts being attached to
    /// `other`.
    ///
    /// Only evaluates this side. The connector asks both sides.
    pub fn accepts(&self, other: &Port) -> bool {
        if other.kind() != self.kind().counterpart() {
            return false;
        }
        match self.kind() {
            Kind::ControlIn | Kind::ControlOut => true,
            Kind::ValueIn => self.ty().accepts(other.ty()),
            Kind::ValueOut => other.ty().accepts(self.ty()),
        }
    }

    /// Whether this port can take another counterpart, given the number it is
    /// already attached to.
    pub fn has_capacity(&self, n_attached: usize) -> bool {
        match self.kind().arity() {
            Arity::One => n_attached == 0,
            Arity::Many => true,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.connector, self.index)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(decl: Decl) -> Port {
        Port::new(unit::Id(0), decl)
    }

    #[test]
    fn control_ports_attach_to_their_counterpart_only() {
        let cin = port(Decl::control_in());
        let cout = port(Decl::control_out("out"));
        let vin = port(Decl::value_in("x", ValueType::Any));
        assert!(cin.accepts(&cout));
        assert!(cout.accepts(&cin));
        assert!(!cin.accepts(&cin));
        assert!(!cin.accepts(&vin));
        assert!(!vin.accepts(&cout));
    }

    #[test]
    fn value_types_are_checked_from_both_sides() {
        let int_in = port(Decl::value_in("x", ValueType::Int));
        let any_in = port(Decl::value_in("x", ValueType::Any));
        let int_out = port(Decl::value_out("y", ValueType::Int, 0));
        let text_out = port(Decl::value_out("y", ValueType::Text, 0));
        assert!(int_in.accepts(&int_out) && int_out.accepts(&int_in));
        assert!(any_in.accepts(&text_out) && text_out.accepts(&any_in));
        assert!(!int_in.accepts(&text_out));
        assert!(!text_out.accepts(&int_in));
    }

    #[test]
    fn arity() {
        assert!(!port(Decl::control_in()).has_capacity(1));
        assert!(!port(Decl::control_out("out")).has_capacity(1));
        assert!(!port(Decl::value_in("x", ValueType::Any)).has_capacity(1));
        assert!(port(Decl::value_out("y", ValueType::Any, 0)).has_capacity(8));
    }
}
