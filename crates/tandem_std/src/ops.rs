//! Binary arithmetic and comparison units.
//!
//! Both operands and the result share the unit's declared numeric type, so
//! each operator is instantiated per type, e.g. `Arith::new(ArithOp::Add,
//! ValueType::Int)`.

use core::{cmp::Ordering, fmt};
use serde::{Deserialize, Serialize};
use tandem_core::{ComputeError, Context, Output, Shape, Value, ValueType};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub enum CompareOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

/// Applies an [`ArithOp`] to its `l` and `r` inputs.
///
/// Unconnected operands default to the identity of the operator on the
/// right, and zero on the left.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct Arith {
    pub op: ArithOp,
    pub ty: ValueType,
}

/// Applies a [`CompareOp`] to its `l` and `r` inputs, producing a `Bool`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct Compare {
    pub op: CompareOp,
    pub ty: ValueType,
}

impl ArithOp {
    /// The value `r` for which `l op r == l`.
    fn identity(self, ty: ValueType) -> Value {
        let one = matches!(self, ArithOp::Mul | ArithOp::Div);
        match (ty, one) {
            (ValueType::Float, true) => Value::Float(1.0),
            (ValueType::Float, false) => Value::Float(0.0),
            (_, true) => Value::Int(1),
            (_, false) => Value::Int(0),
        }
    }

    fn apply_int(self, l: i64, r: i64) -> Result<i64, ComputeError> {
        let res = match self {
            ArithOp::Add => l.checked_add(r),
            ArithOp::Sub => l.checked_sub(r),
            ArithOp::Mul => l.checked_mul(r),
            ArithOp::Div if r == 0 => return Err(ComputeError::new("division by zero")),
            ArithOp::Div => l.checked_div(r),
        };
        res.ok_or_else(|| ComputeError::new(format!("`{l} {self} {r}` overflowed")))
    }

    fn apply_float(self, l: f64, r: f64) -> f64 {
        match self {
            ArithOp::Add => l + r,
            ArithOp::Sub => l - r,
            ArithOp::Mul => l * r,
            ArithOp::Div => l / r,
        }
    }
}

impl CompareOp {
    fn test(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Eq => ord == Ordering::Equal,
        }
    }
}

impl Arith {
    pub fn new(op: ArithOp, ty: ValueType) -> Self {
        Arith { op, ty }
    }
}

impl Compare {
    pub fn new(op: CompareOp, ty: ValueType) -> Self {
        Compare { op, ty }
    }
}

impl tandem_core::Unit for Arith {
    fn name(&self) -> &str {
        match self.op {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
        }
    }

    fn shape(&self) -> Shape {
        let zero = ArithOp::Add.identity(self.ty);
        Shape::default()
            .input_or("l", self.ty, zero)
            .input_or("r", self.ty, self.op.identity(self.ty))
            .output("result", self.ty)
    }

    fn compute(&mut self, _: &Context, inputs: &[Value]) -> Result<Output, ComputeError> {
        let l = crate::input(inputs, 0, "l")?;
        let r = crate::input(inputs, 1, "r")?;
        let result = match (l, r) {
            (Value::Int(l), Value::Int(r)) => Value::Int(self.op.apply_int(*l, *r)?),
            (Value::Float(l), Value::Float(r)) => Value::Float(self.op.apply_float(*l, *r)),
            (l, r) => {
                let msg = format!("cannot apply `{}` to {} and {}", self.op, l.ty(), r.ty());
                return Err(ComputeError::new(msg));
            }
        };
        Ok(Output::new([result]))
    }
}

impl tandem_core::Unit for Compare {
    fn name(&self) -> &str {
        match self.op {
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
            CompareOp::Eq => "eq",
        }
    }

    fn shape(&self) -> Shape {
        Shape::default()
            .input("l", self.ty)
            .input("r", self.ty)
            .output("result", ValueType::Bool)
    }

    fn compute(&mut self, _: &Context, inputs: &[Value]) -> Result<Output, ComputeError> {
        let l = crate::input(inputs, 0, "l")?;
        let r = crate::input(inputs, 1, "r")?;
        let ord = match (l, r) {
            (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
            (Value::Int(l), Value::Int(r)) => Some(l.cmp(r)),
            (Value::Float(l), Value::Float(r)) => l.partial_cmp(r),
            (Value::Text(l), Value::Text(r)) => Some(l.cmp(r)),
            _ if self.op == CompareOp::Eq => Some(match l == r {
                true => Ordering::Equal,
                false => Ordering::Less,
            }),
            _ => {
                let msg = format!("cannot order {} and {}", l.ty(), r.ty());
                return Err(ComputeError::new(msg));
            }
        };
        // Unordered floats (NaN) compare false.
        let result = ord.is_some_and(|ord| self.op.test(ord));
        Ok(Output::new([Value::Bool(result)]))
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        };
        write!(f, "{s}")
    }
}
