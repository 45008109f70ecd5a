use serde::{Deserialize, Serialize};
use std::time::Duration;
use tandem_core::{
    ComputeError, Context, Graph, Output, Shape, Value, invoke::InvokeResult, unit,
};

/// How often a [`Ticker`] fires.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub enum Interval {
    /// On every update.
    EveryUpdate,
    /// Once each time the given duration has elapsed.
    Every(Duration),
}

/// A root of control driven by the host's update loop.
///
/// The ticker owns a [`Tick`] unit within the graph and fires a new session
/// from it as time passes. Successors attached to the tick's `ControlOut`
/// run within that session.
#[derive(Clone, Debug, PartialEq)]
pub struct Ticker {
    unit: unit::Id,
    interval: Interval,
    remaining: Duration,
}

/// The unit fired by a [`Ticker`]. Has no `ControlIn`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct Tick;

impl Ticker {
    /// Add a [`Tick`] unit to the graph and return its driver.
    ///
    /// The first update always fires.
    pub fn add(g: &mut Graph, interval: Interval) -> Self {
        let unit = g.add_unit(Tick);
        let mut ticker = Ticker {
            unit,
            interval: Interval::EveryUpdate,
            remaining: Duration::ZERO,
        };
        ticker.set_interval(interval);
        ticker
    }

    /// The [`Tick`] unit within the graph.
    pub fn unit(&self) -> unit::Id {
        self.unit
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Change the interval. A zero duration is ignored.
    pub fn set_interval(&mut self, interval: Interval) {
        if interval == Interval::Every(Duration::ZERO) {
            log::warn!("ignoring zero interval for ticker {}", self.unit);
            return;
        }
        self.interval = interval;
    }

    /// Restart the countdown to the next tick from the full interval.
    pub fn reset(&mut self) {
        if let Interval::Every(interval) = self.interval {
            self.remaining = interval;
        }
    }

    /// Advance time by `dt`, firing the tick unit if it is due.
    ///
    /// Returns the result of the fire, or `None` if the tick was not due.
    pub fn update(&mut self, g: &mut Graph, dt: Duration) -> Option<InvokeResult> {
        match self.interval {
            Interval::EveryUpdate => Some(g.fire(self.unit)),
            Interval::Every(_) if dt >= self.remaining => {
                self.reset();
                Some(g.fire(self.unit))
            }
            Interval::Every(_) => {
                self.remaining -= dt;
                None
            }
        }
    }
}

impl tandem_core::Unit for Tick {
    fn name(&self) -> &str {
        "tick"
    }

    fn shape(&self) -> Shape {
        Shape::default().without_control_in()
    }

    fn compute(&mut self, _: &Context, _: &[Value]) -> Result<Output, ComputeError> {
        Ok(Output::empty())
    }
}
