//! The symmetric many-to-many adjacency registry between ports.
//!
//! Connect order: ownership check => duplicate check => kind/type check (both
//! sides) => arity check (both sides) => register both directions => emit
//! events to global listeners, then to each endpoint.

use crate::{
    port::{self, Port},
    unit,
};
use petgraph::graphmap::UnGraphMap;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::atomic::{self, AtomicU32},
};
use thiserror::Error;

/// Source of unique connector ids, so that ports from different connectors
/// never compare equal.
static NEXT_CONNECTOR: AtomicU32 = AtomicU32::new(0);

/// A listener of connect or disconnect events.
pub type Listener = Box<dyn FnMut(&Event)>;

/// Registers ports and the edges between them.
pub struct Connector {
    id: u32,
    next_port: u32,
    /// Incremented for every edge so that neighbours may be yielded in the
    /// order they were connected.
    next_seq: u64,
    ports: BTreeMap<port::Id, Port>,
    /// Both directions of every edge, weighted by connection sequence.
    edges: UnGraphMap<port::Id, u64>,
    on_connect: Vec<Listener>,
    on_disconnect: Vec<Listener>,
    on_port_event: HashMap<port::Id, Vec<Listener>>,
}

/// Emitted when an edge is registered or removed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct Event {
    pub kind: EventKind,
    /// The endpoint the event is addressed to. For global listeners, the
    /// first port given to `connect` or `disconnect`.
    pub port: port::Id,
    /// The endpoint on the other side of the edge.
    pub other: port::Id,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub enum EventKind {
    Connect,
    Disconnect,
}

/// The reasons for which `connect` may reject a pair of ports.
#[derive(Clone, Copy, Debug, Error, Eq, Hash, PartialEq)]
pub enum ConnectError {
    #[error("port {0} is not registered with this connector")]
    ForeignPort(port::Id),
    #[error("ports {0} and {1} are already connected")]
    AlreadyConnected(port::Id, port::Id),
    #[error("port {a} ({a_kind}) cannot be attached to port {b} ({b_kind})")]
    Incompatible {
        a: port::Id,
        a_kind: port::Kind,
        b: port::Id,
        b_kind: port::Kind,
    },
    #[error("port {0} has no capacity for another connection")]
    Capacity(port::Id),
}

/// The reasons for which `disconnect` may reject a pair of ports.
#[derive(Clone, Copy, Debug, Error, Eq, Hash, PartialEq)]
pub enum DisconnectError {
    #[error("port {0} is not registered with this connector")]
    ForeignPort(port::Id),
    #[error("ports {0} and {1} are not connected")]
    NotConnected(port::Id, port::Id),
}

impl Connector {
    pub fn new() -> Self {
        Connector {
            id: NEXT_CONNECTOR.fetch_add(1, atomic::Ordering::Relaxed),
            next_port: 0,
            next_seq: 0,
            ports: BTreeMap::new(),
            edges: UnGraphMap::new(),
            on_connect: vec![],
            on_disconnect: vec![],
            on_port_event: HashMap::new(),
        }
    }

    /// Register a new port owned by `unit`.
    pub fn add_port(&mut self, unit: unit::Id, decl: port::Decl) -> port::Id {
        let id = port::Id {
            connector: self.id,
            index: self.next_port,
        };
        self.next_port += 1;
        log::trace!("registered {:?} port {id} `{}` on unit {unit}", decl.kind, decl.name);
        self.ports.insert(id, Port::new(unit, decl));
        self.edges.add_node(id);
        id
    }

    /// Disconnect every edge of the port and remove it from the registry.
    pub fn remove_port(&mut self, id: port::Id) -> Option<Port> {
        if !self.contains(id) {
            return None;
        }
        self.disconnect_port(id);
        self.edges.remove_node(id);
        self.on_port_event.remove(&id);
        self.ports.remove(&id)
    }

    /// Whether the port was registered by this connector instance.
    pub fn contains(&self, id: port::Id) -> bool {
        id.connector == self.id && self.ports.contains_key(&id)
    }

    pub fn port(&self, id: port::Id) -> Option<&Port> {
        if id.connector != self.id {
            return None;
        }
        self.ports.get(&id)
    }

    /// All registered ports in registration order.
    pub fn ports(&self) -> impl Iterator<Item = (port::Id, &Port)> {
        self.ports.iter().map(|(&id, p)| (id, p))
    }

    /// The ports owned by the given unit in registration order.
    pub fn ports_of(&self, unit: unit::Id) -> impl Iterator<Item = port::Id> + '_ {
        self.ports
            .iter()
            .filter(move |(_, p)| p.unit == unit)
            .map(|(&id, _)| id)
    }

    /// Whether an edge exists between `a` and `b`.
    pub fn is_connected(&self, a: port::Id, b: port::Id) -> bool {
        self.contains(a) && self.contains(b) && self.edges.contains_edge(a, b)
    }

    /// The number of ports attached to `id`.
    pub fn degree(&self, id: port::Id) -> usize {
        if !self.contains(id) {
            return 0;
        }
        self.edges.edges(id).count()
    }

    /// Connect `a` and `b`.
    ///
    /// Either both directions are registered and connect events are emitted,
    /// or nothing changes.
    pub fn connect(&mut self, a: port::Id, b: port::Id) -> Result<(), ConnectError> {
        if let Err(err) = self.check_connect(a, b) {
            log::debug!("rejected connection {a} <-> {b}: {err}");
            return Err(err);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.edges.add_edge(a, b, seq);
        log::debug!("connected {a} <-> {b}");
        self.emit(EventKind::Connect, a, b);
        Ok(())
    }

    fn check_connect(&self, a: port::Id, b: port::Id) -> Result<(), ConnectError> {
        let pa = self.port(a).ok_or(ConnectError::ForeignPort(a))?;
        let pb = self.port(b).ok_or(ConnectError::ForeignPort(b))?;
        if self.edges.contains_edge(a, b) {
            return Err(ConnectError::AlreadyConnected(a, b));
        }
        if !pa.accepts(pb) || !pb.accepts(pa) {
            return Err(ConnectError::Incompatible {
                a,
                a_kind: pa.kind(),
                b,
                b_kind: pb.kind(),
            });
        }
        if !pa.has_capacity(self.degree(a)) {
            return Err(ConnectError::Capacity(a));
        }
        if !pb.has_capacity(self.degree(b)) {
            return Err(ConnectError::Capacity(b));
        }
        Ok(())
    }

    /// Remove the edge between `a` and `b`, emitting disconnect events.
    pub fn disconnect(&mut self, a: port::Id, b: port::Id) -> Result<(), DisconnectError> {
        if !self.contains(a) {
            return Err(DisconnectError::ForeignPort(a));
        }
        if !self.contains(b) {
            return Err(DisconnectError::ForeignPort(b));
        }
        if self.edges.remove_edge(a, b).is_none() {
            return Err(DisconnectError::NotConnected(a, b));
        }
        log::debug!("disconnected {a} <-> {b}");
        self.emit(EventKind::Disconnect, a, b);
        Ok(())
    }

    /// Remove every edge attached to the port. Returns the number removed.
    pub fn disconnect_port(&mut self, id: port::Id) -> usize {
        let mut count = 0;
        for other in self.neighbors(id) {
            if self.disconnect(other, id).is_ok() {
                count += 1;
            }
        }
        count
    }

    /// Tear down every edge of every port owned by `unit`. Returns the number
    /// of edges removed.
    pub fn disconnect_all(&mut self, unit: unit::Id) -> usize {
        let ports: Vec<_> = self.ports_of(unit).collect();
        ports.into_iter().map(|p| self.disconnect_port(p)).sum()
    }

    /// The ports attached to `id`, in the order they were connected.
    pub fn neighbors(&self, id: port::Id) -> Vec<port::Id> {
        if !self.contains(id) {
            return vec![];
        }
        let mut ns: Vec<(u64, port::Id)> = self
            .edges
            .edges(id)
            .map(|(_, other, &seq)| (seq, other))
            .collect();
        ns.sort_unstable();
        ns.into_iter().map(|(_, other)| other).collect()
    }

    /// The attached ports of the given kind, in the order they were connected.
    pub fn neighbors_of_kind(&self, id: port::Id, kind: port::Kind) -> Vec<port::Id> {
        self.neighbors(id)
            .into_iter()
            .filter(|n| self.port(*n).map(|p| p.kind()) == Some(kind))
            .collect()
    }

    /// The earliest connected port attached to `id`, if any.
    pub fn first_neighbor(&self, id: port::Id) -> Option<port::Id> {
        self.neighbors(id).into_iter().next()
    }

    /// Register a listener of every connect event.
    pub fn on_connect(&mut self, listener: impl FnMut(&Event) + 'static) {
        self.on_connect.push(Box::new(listener));
    }

    /// Register a listener of every disconnect event.
    pub fn on_disconnect(&mut self, listener: impl FnMut(&Event) + 'static) {
        self.on_disconnect.push(Box::new(listener));
    }

    /// Register a listener of connect and disconnect events addressed to the
    /// given endpoint.
    pub fn on_port_event(&mut self, id: port::Id, listener: impl FnMut(&Event) + 'static) {
        self.on_port_event
            .entry(id)
            .or_default()
            .push(Box::new(listener));
    }

    fn emit(&mut self, kind: EventKind, a: port::Id, b: port::Id) {
        let global = match kind {
            EventKind::Connect => &mut self.on_connect,
            EventKind::Disconnect => &mut self.on_disconnect,
        };
        let ev = Event { kind, port: a, other: b };
        for l in global.iter_mut() {
            l(&ev);
        }
        for (port, other) in [(a, b), (b, a)] {
            if let Some(ls) = self.on_port_event.get_mut(&port) {
                let ev = Event { kind, port, other };
                for l in ls.iter_mut() {
                    l(&ev);
                }
            }
        }
    }
}

impl Default for Connector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("id", &self.id)
            .field("ports", &self.ports.len())
            .field("edges", &self.edges.edge_count())
            .finish()
    }
}
