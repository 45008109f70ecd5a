//! Named variables shared between units of a graph and the host.

use core::fmt;
use std::{cell::RefCell, collections::BTreeMap, mem, rc::Rc};
use tandem_core::{ComputeError, Context, Output, Shape, Value, ValueType};
use thiserror::Error;

/// A shared, cheaply cloned holder of named variables.
///
/// Each variable keeps the type of the value it was created with.
#[derive(Clone, Default)]
pub struct Vars {
    inner: Rc<RefCell<Inner>>,
}

#[derive(Default)]
struct Inner {
    values: BTreeMap<String, Value>,
    listeners: Vec<Listener>,
}

/// A change to a variable.
#[derive(Clone, Debug, PartialEq)]
pub enum Change<'a> {
    Created { name: &'a str, value: &'a Value },
    Updated { name: &'a str, value: &'a Value },
    Removed { name: &'a str },
}

/// A listener of variable changes.
pub type Listener = Box<dyn FnMut(&Change<'_>)>;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum VarError {
    #[error("no variable named `{0}`")]
    NotFound(String),
    #[error("variable `{0}` already exists")]
    Exists(String),
    #[error("variable `{name}` holds {expected} values, found {found}")]
    TypeMismatch {
        name: String,
        expected: ValueType,
        found: ValueType,
    },
}

/// Produces the current value of the named variable.
#[derive(Debug)]
pub struct GetVar {
    vars: Vars,
    name: String,
}

/// Assigns its pulled input to the named variable, creating it if necessary.
///
/// Outputs the assigned value.
#[derive(Debug)]
pub struct SetVar {
    vars: Vars,
    name: String,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.borrow().values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner.borrow().values.get(name).cloned()
    }

    /// The type of the named variable.
    pub fn ty(&self, name: &str) -> Option<ValueType> {
        self.inner.borrow().values.get(name).map(Value::ty)
    }

    /// The names of all variables in order.
    pub fn names(&self) -> Vec<String> {
        self.inner.borrow().values.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a new variable.
    pub fn create(&self, name: &str, value: impl Into<Value>) -> Result<(), VarError> {
        let value = value.into();
        {
            let mut inner = self.inner.borrow_mut();
            if inner.values.contains_key(name) {
                return Err(VarError::Exists(name.to_string()));
            }
            inner.values.insert(name.to_string(), value.clone());
        }
        log::debug!("created variable `{name}` = {value}");
        self.notify(&Change::Created {
            name,
            value: &value,
        });
        Ok(())
    }

    /// Update an existing variable with a value of the same type.
    pub fn update(&self, name: &str, value: impl Into<Value>) -> Result<(), VarError> {
        let value = value.into();
        {
            let mut inner = self.inner.borrow_mut();
            let slot = inner
                .values
                .get_mut(name)
                .ok_or_else(|| VarError::NotFound(name.to_string()))?;
            if slot.ty() != value.ty() {
                return Err(VarError::TypeMismatch {
                    name: name.to_string(),
                    expected: slot.ty(),
                    found: value.ty(),
                });
            }
            *slot = value.clone();
        }
        log::trace!("updated variable `{name}` = {value}");
        self.notify(&Change::Updated {
            name,
            value: &value,
        });
        Ok(())
    }

    /// Update the variable if it exists, otherwise create it.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), VarError> {
        match self.contains(name) {
            true => self.update(name, value),
            false => self.create(name, value),
        }
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        let value = self.inner.borrow_mut().values.remove(name)?;
        log::debug!("removed variable `{name}`");
        self.notify(&Change::Removed { name });
        Some(value)
    }

    /// Register a listener of every change to the held variables.
    pub fn on_change(&self, listener: impl FnMut(&Change<'_>) + 'static) {
        self.inner.borrow_mut().listeners.push(Box::new(listener));
    }

    // Listeners are taken for the duration of the call so that they may
    // themselves read from or write to the holder.
    fn notify(&self, change: &Change<'_>) {
        let mut listeners = mem::take(&mut self.inner.borrow_mut().listeners);
        for l in listeners.iter_mut() {
            l(change);
        }
        let mut inner = self.inner.borrow_mut();
        listeners.append(&mut inner.listeners);
        inner.listeners = listeners;
    }
}

impl GetVar {
    pub fn new(vars: Vars, name: impl Into<String>) -> Self {
        let name = name.into();
        GetVar { vars, name }
    }

    pub fn var_name(&self) -> &str {
        &self.name
    }
}

impl SetVar {
    pub fn new(vars: Vars, name: impl Into<String>) -> Self {
        let name = name.into();
        SetVar { vars, name }
    }

    pub fn var_name(&self) -> &str {
        &self.name
    }
}

impl tandem_core::Unit for GetVar {
    fn name(&self) -> &str {
        "get-var"
    }

    /// The output takes the type of the variable at the time the unit is
    /// added, or `Any` if the variable does not exist yet.
    fn shape(&self) -> Shape {
        let ty = self.vars.ty(&self.name).unwrap_or_default();
        Shape::default().output("value", ty)
    }

    fn compute(&mut self, _: &Context, _: &[Value]) -> Result<Output, ComputeError> {
        let value = self
            .vars
            .get(&self.name)
            .ok_or_else(|| ComputeError::new(VarError::NotFound(self.name.clone()).to_string()))?;
        Ok(Output::new([value]))
    }
}

impl tandem_core::Unit for SetVar {
    fn name(&self) -> &str {
        "set-var"
    }

    fn shape(&self) -> Shape {
        let ty = self.vars.ty(&self.name).unwrap_or_default();
        Shape::default()
            .input("value", ty)
            .output("value", ty)
    }

    fn compute(&mut self, _: &Context, inputs: &[Value]) -> Result<Output, ComputeError> {
        let value = crate::input(inputs, 0, "value")?.clone();
        self.vars
            .set(&self.name, value.clone())
            .map_err(|e| ComputeError::new(e.to_string()))?;
        Ok(Output::new([value]))
    }
}

impl fmt::Debug for Vars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_map().entries(inner.values.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn create_update_remove() {
        let vars = Vars::new();
        vars.create("x", 1).unwrap();
        assert_eq!(vars.create("x", 2), Err(VarError::Exists("x".into())));
        vars.update("x", 3).unwrap();
        assert_eq!(vars.get("x"), Some(Value::Int(3)));
        assert_eq!(
            vars.update("x", "three"),
            Err(VarError::TypeMismatch {
                name: "x".into(),
                expected: ValueType::Int,
                found: ValueType::Text,
            })
        );
        assert_eq!(vars.update("y", 1), Err(VarError::NotFound("y".into())));
        assert_eq!(vars.remove("x"), Some(Value::Int(3)));
        assert!(vars.is_empty());
    }

    #[test]
    fn clones_share_variables() {
        let a = Vars::new();
        let b = a.clone();
        a.set("x", true).unwrap();
        assert_eq!(b.ty("x"), Some(ValueType::Bool));
        assert_eq!(b.names(), ["x"]);
    }

    #[test]
    fn listeners_may_access_the_holder() {
        let vars = Vars::new();
        let seen = Rc::new(RefCell::new(vec![]));
        let (s, v) = (seen.clone(), vars.clone());
        vars.on_change(move |change| {
            let name = match change {
                Change::Created { name, .. }
                | Change::Updated { name, .. }
                | Change::Removed { name } => *name,
            };
            s.borrow_mut().push((name.to_string(), v.get(name)));
        });
        vars.set("x", 1).unwrap();
        vars.set("x", 2).unwrap();
        vars.remove("x");
        assert_eq!(
            *seen.borrow(),
            [
                ("x".to_string(), Some(Value::Int(1))),
                ("x".to_string(), Some(Value::Int(2))),
                ("x".to_string(), None),
            ]
        );
    }
}
