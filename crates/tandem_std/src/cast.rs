use serde::{Deserialize, Serialize};
use tandem_core::{ComputeError, Context, Output, Shape, Value, ValueType};

/// Converts a value of any type to the target type.
///
/// Fails to compute if the value has no representation in the target type,
/// e.g. a `Text` that does not parse as an `Int`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct Cast {
    pub to: ValueType,
}

impl Cast {
    pub fn new(to: ValueType) -> Self {
        Cast { to }
    }
}

/// Convert `value` to the type `to`.
pub fn cast(value: Value, to: ValueType) -> Result<Value, ComputeError> {
    let from = value.ty();
    let fail = || ComputeError::new(format!("cannot cast {value} from {from} to {to}"));
    let cast = match (to, &value) {
        (ValueType::Any, _) => Some(value.clone()),
        (ValueType::Unit, _) => Some(Value::Unit),
        (ValueType::Text, Value::Text(_)) => Some(value.clone()),
        (ValueType::Text, v) => Some(Value::Text(v.to_string())),
        (ValueType::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
        (ValueType::Bool, Value::Int(i)) => Some(Value::Bool(*i != 0)),
        (ValueType::Bool, Value::Float(f)) => Some(Value::Bool(*f != 0.0)),
        (ValueType::Bool, Value::Text(s)) => s.trim().parse().ok().map(Value::Bool),
        (ValueType::Int, Value::Bool(b)) => Some(Value::Int(i64::from(*b))),
        (ValueType::Int, Value::Int(i)) => Some(Value::Int(*i)),
        (ValueType::Int, Value::Float(f)) => float_to_int(*f).map(Value::Int),
        (ValueType::Int, Value::Text(s)) => s.trim().parse().ok().map(Value::Int),
        (ValueType::Float, Value::Bool(b)) => Some(Value::Float(f64::from(u8::from(*b)))),
        (ValueType::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
        (ValueType::Float, Value::Float(f)) => Some(Value::Float(*f)),
        (ValueType::Float, Value::Text(s)) => s.trim().parse().ok().map(Value::Float),
        (ValueType::List, Value::List(_)) => Some(value.clone()),
        (ValueType::List, Value::Unit) => Some(Value::List(vec![])),
        (ValueType::List, v) => Some(Value::List(vec![v.clone()])),
        _ => None,
    };
    cast.ok_or_else(fail)
}

/// Truncates toward zero, rejecting values outside of the `i64` range.
fn float_to_int(f: f64) -> Option<i64> {
    let t = f.trunc();
    if !t.is_finite() || t < i64::MIN as f64 || t >= i64::MAX as f64 {
        return None;
    }
    Some(t as i64)
}

impl tandem_core::Unit for Cast {
    fn name(&self) -> &str {
        "cast"
    }

    fn shape(&self) -> Shape {
        Shape::default()
            .input("value", ValueType::Any)
            .output("value", self.to)
    }

    fn compute(&mut self, _: &Context, inputs: &[Value]) -> Result<Output, ComputeError> {
        let value = cast(crate::input(inputs, 0, "value")?.clone(), self.to)?;
        Ok(Output::new([value]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_int() {
        assert_eq!(cast(Value::Float(-2.7), ValueType::Int), Ok(Value::Int(-2)));
        assert_eq!(cast(" 42 ".into(), ValueType::Int), Ok(Value::Int(42)));
        assert_eq!(cast(true.into(), ValueType::Int), Ok(Value::Int(1)));
        assert!(cast(Value::Float(f64::NAN), ValueType::Int).is_err());
        assert!(cast(Value::Float(1e300), ValueType::Int).is_err());
        assert!(cast("four".into(), ValueType::Int).is_err());
        assert!(cast(Value::Unit, ValueType::Int).is_err());
    }

    #[test]
    fn to_float_and_bool() {
        assert_eq!(cast(Value::Int(3), ValueType::Float), Ok(Value::Float(3.0)));
        assert_eq!(cast("0.5".into(), ValueType::Float), Ok(Value::Float(0.5)));
        assert_eq!(cast(Value::Int(0), ValueType::Bool), Ok(Value::Bool(false)));
        assert_eq!(cast("true".into(), ValueType::Bool), Ok(Value::Bool(true)));
        assert!(cast("yes".into(), ValueType::Bool).is_err());
    }

    #[test]
    fn to_text_and_list() {
        let list = Value::List(vec![Value::Int(1), Value::Bool(false)]);
        assert_eq!(cast(list.clone(), ValueType::Text), Ok(Value::from("[1, false]")));
        assert_eq!(cast(list.clone(), ValueType::List), Ok(list));
        assert_eq!(
            cast(Value::Int(1), ValueType::List),
            Ok(Value::List(vec![Value::Int(1)]))
        );
        assert_eq!(cast(Value::Int(1), ValueType::Any), Ok(Value::Int(1)));
    }
}
