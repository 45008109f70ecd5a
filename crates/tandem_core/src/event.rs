//! Status events emitted by the engine for each transition of an invocation.
//!
//! Events are for observers only (editors, logging, tests). Listeners cannot
//! alter the flow of an invocation.

use crate::{
    chain::Chain,
    session::{Context, Token},
    unit,
};
use serde::{Deserialize, Serialize};

/// The transitions of an invocation that are reported to listeners.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub enum Status {
    InvokeCalled,
    ProcessStart,
    ProcessSuccess,
    ProcessFail,
    CacheUsed,
    CacheError,
    LoopDetected,
    UnknownError,
    ParamError,
}

/// A status transition of a unit, along with the context that triggered it.
#[derive(Clone, Copy, Debug)]
pub struct StatusEvent<'a> {
    pub unit: unit::Id,
    pub status: Status,
    pub ctx: &'a Context<'a>,
}

/// An owned copy of a [`StatusEvent`], e.g. for collecting or serialising.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Record {
    pub unit: unit::Id,
    pub status: Status,
    pub token: Token,
    pub chain: Chain,
}

/// A listener of status events.
pub type Listener = Box<dyn FnMut(&StatusEvent<'_>)>;

impl Status {
    /// Whether the status ends the invocation unsuccessfully.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Status::ProcessFail
                | Status::CacheError
                | Status::LoopDetected
                | Status::UnknownError
                | Status::ParamError
        )
    }
}

impl<'a> StatusEvent<'a> {
    pub fn record(&self) -> Record {
        Record {
            unit: self.unit,
            status: self.status,
            token: self.ctx.token(),
            chain: self.ctx.chain().clone(),
        }
    }
}
