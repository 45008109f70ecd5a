//! The ordered record of units visited along one invocation path.
//!
//! A chain is only ever extended, never shortened. Extension is refused when
//! the unit is already present, which is what guards invocation against
//! loops. The control-only subsequence is materialised so that cache validity
//! can be decided with a single prefix comparison.

use crate::unit;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// How a unit was reached.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub enum Direction {
    /// Pushed along a control edge (or fired as a root).
    Control,
    /// Pulled along a value edge.
    Value,
}

/// A single visited unit.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct Step {
    pub unit: unit::Id,
    pub direction: Direction,
}

/// The sequence of visited units, each appearing at most once.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "Vec<Step>", into = "Vec<Step>")]
pub struct Chain {
    steps: Vec<Step>,
    /// Companion set of `steps` for constant time membership tests.
    visited: HashSet<unit::Id>,
    /// The units of `steps` reached in the `Control` direction.
    control: Vec<unit::Id>,
}

/// A sequence of steps visited the same unit twice.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
#[error("unit {0} appears more than once in the chain")]
pub struct RevisitedUnit(pub unit::Id);

impl Chain {
    /// An empty chain, as held by the root context of a session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Whether the unit was already visited along this chain.
    pub fn contains(&self, unit: unit::Id) -> bool {
        self.visited.contains(&unit)
    }

    /// The units visited in the `Control` direction, in order.
    pub fn control(&self) -> &[unit::Id] {
        &self.control
    }

    /// Produce a new chain with the given step appended.
    ///
    /// Returns `None` if the unit is already present.
    pub fn try_extend(&self, unit: unit::Id, direction: Direction) -> Option<Chain> {
        let mut chain = self.clone();
        chain.push(Step { unit, direction }).ok()?;
        Some(chain)
    }

    fn push(&mut self, step: Step) -> Result<(), RevisitedUnit> {
        if !self.visited.insert(step.unit) {
            return Err(RevisitedUnit(step.unit));
        }
        if step.direction == Direction::Control {
            self.control.push(step.unit);
        }
        self.steps.push(step);
        Ok(())
    }

    /// Whether the control-only subsequence of `self` is a prefix of the
    /// control-only subsequence of `other`.
    ///
    /// A result produced along `self` may be reused by a request along
    /// `other` only if this holds.
    pub fn is_control_prefix_of(&self, other: &Chain) -> bool {
        other.control.starts_with(&self.control)
    }
}

impl TryFrom<Vec<Step>> for Chain {
    type Error = RevisitedUnit;
    fn try_from(steps: Vec<Step>) -> Result<Self, Self::Error> {
        let mut chain = Chain::new();
        for step in steps {
            chain.push(step)?;
        }
        Ok(chain)
    }
}

impl From<Chain> for Vec<Step> {
    fn from(chain: Chain) -> Self {
        chain.steps
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, " > ")?;
            }
            let dir = match step.direction {
                Direction::Control => "c",
                Direction::Value => "v",
            };
            write!(f, "{}:{dir}", step.unit)?;
        }
        write!(f, "]")
    }
}
