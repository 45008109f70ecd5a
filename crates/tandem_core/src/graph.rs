//! The graph of units, their ports and the connector between them.

use crate::{
    connector::{ConnectError, Connector, DisconnectError},
    event::{self, Status, StatusEvent},
    invoke::{self, InvokeResult},
    port::{self, Port},
    session::Context,
    unit::{self, ComputeError, Output, Unit},
    value::Value,
};
use std::{collections::BTreeMap, fmt};
use thiserror::Error;

/// Owns the units of a graph and the connector between their ports.
pub struct Graph {
    connector: Connector,
    units: BTreeMap<unit::Id, Slot>,
    next_unit: u32,
    on_any_status: Vec<event::Listener>,
}

/// A unit along with its ports and listeners.
struct Slot {
    unit: Box<dyn Unit>,
    ports: Ports,
    listeners: Vec<event::Listener>,
}

/// The ports of a unit, each list in declared order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Ports {
    pub control_in: Vec<port::Id>,
    pub control_out: Vec<port::Id>,
    pub value_in: Vec<port::Id>,
    pub value_out: Vec<port::Id>,
}

/// Errors that may occur while constructing a graph.
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("no unit with id {0}")]
    UnitNotFound(unit::Id),
    #[error("no port with id {0}")]
    PortNotFound(port::Id),
    #[error("unit {unit} has no {kind} port at index {index}")]
    NoSuchPort {
        unit: unit::Id,
        kind: port::Kind,
        index: usize,
    },
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Disconnect(#[from] DisconnectError),
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            connector: Connector::new(),
            units: BTreeMap::new(),
            next_unit: 0,
            on_any_status: vec![],
        }
    }

    /// Add a unit, registering the ports declared by its [`Unit::shape`].
    pub fn add_unit(&mut self, unit: impl Unit + 'static) -> unit::Id {
        let id = unit::Id(self.next_unit);
        self.next_unit += 1;
        let mut ports = Ports::default();
        for decl in unit.shape().decls() {
            let kind = decl.kind;
            let port = self.connector.add_port(id, decl);
            ports.list_mut(kind).push(port);
        }
        log::debug!("added unit {}[{id}]", unit.name());
        let unit = Box::new(unit);
        let listeners = vec![];
        self.units.insert(id, Slot { unit, ports, listeners });
        id
    }

    /// Remove the unit, tearing down every edge of its ports.
    pub fn remove_unit(&mut self, id: unit::Id) -> Option<Box<dyn Unit>> {
        let slot = self.units.remove(&id)?;
        self.connector.disconnect_all(id);
        for port in slot.ports.iter() {
            self.connector.remove_port(port);
        }
        log::debug!("removed unit {}[{id}]", slot.unit.name());
        Some(slot.unit)
    }

    /// Add a port to an existing unit. It is appended to the unit's ports of
    /// the same kind.
    pub fn add_port(&mut self, unit: unit::Id, decl: port::Decl) -> Result<port::Id, GraphError> {
        let slot = self
            .units
            .get_mut(&unit)
            .ok_or(GraphError::UnitNotFound(unit))?;
        let kind = decl.kind;
        let port = self.connector.add_port(unit, decl);
        slot.ports.list_mut(kind).push(port);
        Ok(port)
    }

    /// Remove a port from its unit, tearing down its edges.
    pub fn remove_port(&mut self, id: port::Id) -> Result<Port, GraphError> {
        let port = self
            .connector
            .remove_port(id)
            .ok_or(GraphError::PortNotFound(id))?;
        if let Some(slot) = self.units.get_mut(&port.unit()) {
            slot.ports.list_mut(port.kind()).retain(|&p| p != id);
        }
        Ok(port)
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    pub fn connector_mut(&mut self) -> &mut Connector {
        &mut self.connector
    }

    /// Connect two ports. Shorthand for [`Connector::connect`].
    pub fn connect(&mut self, a: port::Id, b: port::Id) -> Result<(), GraphError> {
        self.connector.connect(a, b)?;
        Ok(())
    }

    /// Disconnect two ports. Shorthand for [`Connector::disconnect`].
    pub fn disconnect(&mut self, a: port::Id, b: port::Id) -> Result<(), GraphError> {
        self.connector.disconnect(a, b)?;
        Ok(())
    }

    /// Connect the `out`th `ControlOut` of unit `a` to the `ControlIn` of
    /// unit `b`.
    pub fn connect_control(&mut self, a: unit::Id, out: usize, b: unit::Id) -> Result<(), GraphError> {
        let from = self.port(a, port::Kind::ControlOut, out)?;
        let to = self.port(b, port::Kind::ControlIn, 0)?;
        self.connect(from, to)
    }

    /// Connect the `out`th `ValueOut` of unit `a` to the `input`th `ValueIn`
    /// of unit `b`.
    pub fn connect_value(
        &mut self,
        a: unit::Id,
        out: usize,
        b: unit::Id,
        input: usize,
    ) -> Result<(), GraphError> {
        let from = self.port(a, port::Kind::ValueOut, out)?;
        let to = self.port(b, port::Kind::ValueIn, input)?;
        self.connect(from, to)
    }

    /// The `index`th port of the given kind on the unit.
    pub fn port(&self, unit: unit::Id, kind: port::Kind, index: usize) -> Result<port::Id, GraphError> {
        let ports = self.ports(unit).ok_or(GraphError::UnitNotFound(unit))?;
        ports
            .of_kind(kind)
            .get(index)
            .copied()
            .ok_or(GraphError::NoSuchPort { unit, kind, index })
    }

    pub fn ports(&self, unit: unit::Id) -> Option<&Ports> {
        self.units.get(&unit).map(|slot| &slot.ports)
    }

    pub fn unit(&self, id: unit::Id) -> Option<&dyn Unit> {
        self.units.get(&id).map(|slot| &*slot.unit)
    }

    pub fn unit_mut(&mut self, id: unit::Id) -> Option<&mut dyn Unit> {
        match self.units.get_mut(&id) {
            Some(slot) => Some(&mut *slot.unit),
            None => None,
        }
    }

    pub fn contains(&self, id: unit::Id) -> bool {
        self.units.contains_key(&id)
    }

    /// The ids of all units in the order they were added.
    pub fn unit_ids(&self) -> impl Iterator<Item = unit::Id> + '_ {
        self.units.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether the unit's `ControlIn` is attached to a predecessor.
    ///
    /// Control-driven units produce their values when pushed. Units that are
    /// not control-driven are pull-only.
    pub fn is_control_driven(&self, id: unit::Id) -> bool {
        self.ports(id).is_some_and(|ports| {
            ports
                .control_in
                .iter()
                .any(|&p| self.connector.first_neighbor(p).is_some())
        })
    }

    /// Register a listener of the status events of a single unit.
    pub fn on_status(
        &mut self,
        unit: unit::Id,
        listener: impl FnMut(&StatusEvent<'_>) + 'static,
    ) -> Result<(), GraphError> {
        let slot = self
            .units
            .get_mut(&unit)
            .ok_or(GraphError::UnitNotFound(unit))?;
        slot.listeners.push(Box::new(listener));
        Ok(())
    }

    /// Register a listener of the status events of every unit.
    pub fn on_any_status(&mut self, listener: impl FnMut(&StatusEvent<'_>) + 'static) {
        self.on_any_status.push(Box::new(listener));
    }

    /// Begin a new session with the given unit as the root of control.
    ///
    /// Shorthand for [`invoke::fire`].
    pub fn fire(&mut self, origin: unit::Id) -> InvokeResult {
        invoke::fire(self, origin)
    }

    /// Begin a new session and pull the values of the given unit.
    ///
    /// Shorthand for [`invoke::pull`].
    pub fn pull(&mut self, unit: unit::Id) -> InvokeResult {
        invoke::pull(self, unit)
    }

    pub(crate) fn compute(
        &mut self,
        id: unit::Id,
        ctx: &Context,
        inputs: &[Value],
    ) -> Option<Result<Output, ComputeError>> {
        let slot = self.units.get_mut(&id)?;
        Some(slot.unit.compute(ctx, inputs))
    }

    /// Log the transition then notify the unit's listeners, followed by the
    /// graph-wide listeners.
    pub(crate) fn emit(&mut self, unit: unit::Id, status: Status, ctx: &Context) {
        let level = match status.is_failure() {
            true => log::Level::Warn,
            false => log::Level::Debug,
        };
        if log::log_enabled!(level) {
            let name = self.unit(unit).map(|u| u.name()).unwrap_or("?");
            log::log!(level, "{name}[{unit}] {status:?} {} {}", ctx.token(), ctx.chain());
        }
        let ev = StatusEvent { unit, status, ctx };
        if let Some(slot) = self.units.get_mut(&unit) {
            for l in slot.listeners.iter_mut() {
                l(&ev);
            }
        }
        for l in self.on_any_status.iter_mut() {
            l(&ev);
        }
    }
}

impl Ports {
    /// The ports of the given kind in declared order.
    pub fn of_kind(&self, kind: port::Kind) -> &[port::Id] {
        match kind {
            port::Kind::ControlIn => &self.control_in,
            port::Kind::ControlOut => &self.control_out,
            port::Kind::ValueIn => &self.value_in,
            port::Kind::ValueOut => &self.value_out,
        }
    }

    fn list_mut(&mut self, kind: port::Kind) -> &mut Vec<port::Id> {
        match kind {
            port::Kind::ControlIn => &mut self.control_in,
            port::Kind::ControlOut => &mut self.control_out,
            port::Kind::ValueIn => &mut self.value_in,
            port::Kind::ValueOut => &mut self.value_out,
        }
    }

    /// All ports, grouped by kind.
    pub fn iter(&self) -> impl Iterator<Item = port::Id> + '_ {
        self.control_in
            .iter()
            .chain(&self.control_out)
            .chain(&self.value_in)
            .chain(&self.value_out)
            .copied()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units: Vec<_> = self
            .units
            .iter()
            .map(|(id, slot)| (*id, slot.unit.name()))
            .collect();
        f.debug_struct("Graph")
            .field("units", &units)
            .field("connector", &self.connector)
            .finish()
    }
}
