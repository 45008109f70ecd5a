//! The state shared across one root invocation and the contexts derived from
//! it.
//!
//! A [`Session`] is created by each `fire` and owns the result cache and the
//! provenance map for that call tree. Every [`Context`] borrows the session,
//! so the maps are released once the root invocation returns.

use crate::{
    chain::{Chain, Direction},
    invoke::InvokeResult,
    unit,
};
use core::fmt;
use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    collections::HashMap,
    sync::atomic::{self, AtomicU64},
};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(0);

/// Uniquely identifies a session within the process.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Token(u64);

/// The shared state of a single root invocation.
#[derive(Debug)]
pub struct Session {
    token: Token,
    /// The last result computed by each unit. Owned by the session, so every
    /// entry was stored under this session's token.
    results: RefCell<HashMap<unit::Id, InvokeResult>>,
    /// The chain that produced each entry of `results`.
    provenance: RefCell<HashMap<unit::Id, Chain>>,
}

/// The session along with the chain of units visited so far.
#[derive(Clone, Debug)]
pub struct Context<'s> {
    session: &'s Session,
    chain: Chain,
}

impl Session {
    /// A session with a fresh token and empty maps.
    pub fn new() -> Self {
        Session {
            token: Token(NEXT_TOKEN.fetch_add(1, atomic::Ordering::Relaxed)),
            results: Default::default(),
            provenance: Default::default(),
        }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    /// The root context with an empty chain.
    pub fn context(&self) -> Context<'_> {
        Context {
            session: self,
            chain: Chain::new(),
        }
    }

    /// Look up a result of `unit` that may be reused by a request along
    /// `chain`.
    ///
    /// An entry is valid if the control-only subsequence of its producing
    /// chain is a prefix of the control-only subsequence of `chain`. Results
    /// of other sessions are never visible here.
    pub fn lookup(&self, unit: unit::Id, chain: &Chain) -> Option<InvokeResult> {
        let results = self.results.borrow();
        let Some(result) = results.get(&unit) else {
            log::trace!("no cached result for unit {unit} in session {}", self.token);
            return None;
        };
        let provenance = self.provenance.borrow();
        let produced = provenance.get(&unit)?;
        if !produced.is_control_prefix_of(chain) {
            log::trace!("cached result of unit {unit} was produced along {produced}, not reusable along {chain}");
            return None;
        }
        Some(result.clone())
    }

    /// Record the result of `unit` along with the chain that produced it,
    /// replacing any previous entry.
    pub fn store(&self, unit: unit::Id, chain: &Chain, result: InvokeResult) {
        self.results.borrow_mut().insert(unit, result);
        self.provenance.borrow_mut().insert(unit, chain.clone());
    }

    /// The last result stored for the unit, regardless of validity.
    pub fn result(&self, unit: unit::Id) -> Option<InvokeResult> {
        self.results.borrow().get(&unit).cloned()
    }

    /// The chain that produced the last result stored for the unit.
    pub fn provenance(&self, unit: unit::Id) -> Option<Chain> {
        self.provenance.borrow().get(&unit).cloned()
    }

    /// The number of units with a stored result.
    pub fn len(&self) -> usize {
        self.results.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.borrow().is_empty()
    }
}

impl<'s> Context<'s> {
    pub fn session(&self) -> &'s Session {
        self.session
    }

    pub fn token(&self) -> Token {
        self.session.token
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Derive a context whose chain is extended with the given step.
    ///
    /// Returns `None` if the unit was already visited along this chain.
    pub fn try_extend(&self, unit: unit::Id, direction: Direction) -> Option<Context<'s>> {
        let chain = self.chain.try_extend(unit, direction)?;
        Some(Context {
            session: self.session,
            chain,
        })
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
