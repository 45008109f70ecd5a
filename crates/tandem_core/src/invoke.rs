//! The invocation engine reconciling pushed control with pulled values.
//!
//! Each invocation of a unit passes through the following states in order,
//! with any failure being terminal:
//!
//! 1. **Announce**: emit `InvokeCalled`.
//! 2. **CacheCheck**: for pulls, reuse a valid cached result (`CacheUsed`).
//! 3. **DirectionClassify**: a control-driven unit may not be pulled before
//!    it has produced a result (`CacheError`). A pull-only unit may not be
//!    pushed (`UnknownError`).
//! 4. **LoopGuard**: extend the chain with the unit or fail (`LoopDetected`).
//! 5. **ParamPull**: sequentially pull each `ValueIn` (`ParamError`).
//! 6. **Compute**: emit `ProcessStart` and call [`Unit::compute`].
//! 7. **CacheStore**: store the result, then emit `ProcessSuccess` or
//!    `ProcessFail`.
//! 8. **Forward**: for successful pushes, invoke the successor attached to
//!    the selected `ControlOut`.
//! 9. **Return** the unit's own result.
//!
//! [`Unit::compute`]: crate::Unit::compute

use crate::{
    chain::Direction,
    event::Status,
    graph::Graph,
    port,
    session::{Context, Session},
    unit::{self, ComputeError},
    value::{Value, ValueType},
};
use core::fmt;
use thiserror::Error;

/// The result of an invocation: the unit's values or the reason it failed.
pub type InvokeResult = Result<Vec<Value>, Failure>;

/// Who requested an invocation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Sender {
    /// The synthetic control predecessor of a root invocation.
    Fire,
    /// A predecessor pushing control through the given `ControlOut`.
    Control(port::Id),
    /// A consumer pulling a value through the given `ValueIn`.
    Value(port::Id),
    /// The host pulling values from outside of the graph.
    Host,
}

/// The reasons an invocation may fail.
///
/// These are expected, local conditions reported up the call chain. They are
/// never raised as panics.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Failure {
    #[error("no unit with id {0}")]
    UnitNotFound(unit::Id),
    #[error("unit {0} was revisited within the active chain")]
    LoopDetected(unit::Id),
    #[error("unit {0} is control-driven but was pulled before producing a result")]
    CacheError(unit::Id),
    #[error("unit {0} is pull-only but was pushed")]
    UnknownError(unit::Id),
    #[error("unit {unit} failed to pull input {input}: {reason}")]
    ParamError {
        unit: unit::Id,
        input: usize,
        reason: ParamReason,
    },
    #[error("unit {unit} failed to compute: {error}")]
    ComputeFailure { unit: unit::Id, error: ComputeError },
}

/// Why a value could not be pulled into a `ValueIn`.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamReason {
    /// The port is unconnected and declares no default.
    Unconnected,
    /// The producing unit failed.
    Upstream(Box<Failure>),
    /// The producing unit computed no value for the `ValueOut`'s slot.
    MissingSlot { slot: usize, len: usize },
    /// The pulled value is not accepted by the `ValueIn`'s type.
    TypeMismatch { expected: ValueType, found: ValueType },
}

impl Sender {
    /// The direction in which the invoked unit is reached.
    pub fn direction(&self) -> Direction {
        match self {
            Sender::Fire | Sender::Control(_) => Direction::Control,
            Sender::Value(_) | Sender::Host => Direction::Value,
        }
    }
}

impl Failure {
    /// The unit at which the failure was reported.
    pub fn unit(&self) -> unit::Id {
        match *self {
            Failure::UnitNotFound(u)
            | Failure::LoopDetected(u)
            | Failure::CacheError(u)
            | Failure::UnknownError(u) => u,
            Failure::ParamError { unit, .. } | Failure::ComputeFailure { unit, .. } => unit,
        }
    }

    /// The failure at the end of a sequence of `ParamError`s.
    pub fn root_cause(&self) -> &Failure {
        match self {
            Failure::ParamError {
                reason: ParamReason::Upstream(cause),
                ..
            } => cause.root_cause(),
            _ => self,
        }
    }
}

/// Begin a new session with `origin` as the root of control.
///
/// The origin is invoked as if pushed by a synthetic control predecessor, so
/// it pulls its inputs, computes and forwards control even when its own
/// `ControlIn` is unattached.
pub fn fire(g: &mut Graph, origin: unit::Id) -> InvokeResult {
    let session = Session::new();
    log::debug!("fire unit {origin} in session {}", session.token());
    invoke(g, origin, Sender::Fire, &session.context())
}

/// Begin a new session and pull the values of `unit` on behalf of the host.
pub fn pull(g: &mut Graph, unit: unit::Id) -> InvokeResult {
    let session = Session::new();
    log::debug!("pull unit {unit} in session {}", session.token());
    invoke(g, unit, Sender::Host, &session.context())
}

/// Invoke the unit under the given context.
pub fn invoke(g: &mut Graph, id: unit::Id, sender: Sender, ctx: &Context) -> InvokeResult {
    if !g.contains(id) {
        log::warn!("invoked unit {id} does not exist");
        return Err(Failure::UnitNotFound(id));
    }

    // Announce.
    g.emit(id, Status::InvokeCalled, ctx);

    // CacheCheck. A push can only find its own entry when revisiting its unit
    // within the active chain, so only pulls consult the cache.
    let direction = sender.direction();
    if direction == Direction::Value {
        if let Some(result) = ctx.session().lookup(id, ctx.chain()) {
            g.emit(id, Status::CacheUsed, ctx);
            return result;
        }
    }

    // DirectionClassify.
    let control_driven = g.is_control_driven(id);
    match sender {
        Sender::Value(_) | Sender::Host if control_driven => {
            g.emit(id, Status::CacheError, ctx);
            return Err(Failure::CacheError(id));
        }
        Sender::Control(_) if !control_driven => {
            g.emit(id, Status::UnknownError, ctx);
            return Err(Failure::UnknownError(id));
        }
        _ => (),
    }

    // LoopGuard.
    let Some(ctx) = ctx.try_extend(id, direction) else {
        g.emit(id, Status::LoopDetected, ctx);
        return Err(Failure::LoopDetected(id));
    };

    // ParamPull.
    let inputs = match pull_params(g, id, &ctx) {
        Ok(inputs) => inputs,
        Err(failure) => {
            g.emit(id, Status::ParamError, &ctx);
            ctx.session().store(id, ctx.chain(), Err(failure.clone()));
            return Err(failure);
        }
    };

    // Compute.
    g.emit(id, Status::ProcessStart, &ctx);
    let (result, next) = match g.compute(id, &ctx, &inputs) {
        Some(Ok(output)) => (Ok(output.values), Some(output.next)),
        Some(Err(error)) => (Err(Failure::ComputeFailure { unit: id, error }), None),
        None => (Err(Failure::UnitNotFound(id)), None),
    };

    // CacheStore.
    ctx.session().store(id, ctx.chain(), result.clone());
    let status = match result.is_ok() {
        true => Status::ProcessSuccess,
        false => Status::ProcessFail,
    };
    g.emit(id, status, &ctx);

    // Forward.
    if let (Some(next), Direction::Control) = (next, direction) {
        forward(g, id, next, &ctx);
    }

    result
}

/// Pull the value of each `ValueIn` of the unit in declared order.
fn pull_params(g: &mut Graph, id: unit::Id, ctx: &Context) -> Result<Vec<Value>, Failure> {
    let inputs = g
        .ports(id)
        .map(|ports| ports.value_in.clone())
        .unwrap_or_default();
    let mut values = Vec::with_capacity(inputs.len());
    for (input, port) in inputs.into_iter().enumerate() {
        let value = pull_param(g, port, ctx).map_err(|reason| Failure::ParamError {
            unit: id,
            input,
            reason,
        })?;
        values.push(value);
    }
    Ok(values)
}

fn pull_param(g: &mut Graph, port: port::Id, ctx: &Context) -> Result<Value, ParamReason> {
    let (ty, default) = match g.connector().port(port) {
        Some(p) => (p.ty(), p.default().cloned()),
        None => return Err(ParamReason::Unconnected),
    };
    let source = g
        .connector()
        .first_neighbor(port)
        .and_then(|source| g.connector().port(source))
        .map(|source| (source.unit(), source.slot()));
    let Some((producer, slot)) = source else {
        return default.ok_or(ParamReason::Unconnected);
    };
    let values = invoke(g, producer, Sender::Value(port), ctx)
        .map_err(|failure| ParamReason::Upstream(Box::new(failure)))?;
    let len = values.len();
    let value = values
        .into_iter()
        .nth(slot)
        .ok_or(ParamReason::MissingSlot { slot, len })?;
    if !ty.accepts(value.ty()) {
        let found = value.ty();
        return Err(ParamReason::TypeMismatch { expected: ty, found });
    }
    Ok(value)
}

/// Invoke the successor attached to the selected `ControlOut`.
///
/// The successor's result is not folded into the unit's own result.
fn forward(g: &mut Graph, id: unit::Id, next: Option<usize>, ctx: &Context) {
    let outs = g
        .ports(id)
        .map(|ports| ports.control_out.clone())
        .unwrap_or_default();
    if outs.is_empty() {
        return;
    }
    let index = match next {
        Some(index) => index,
        None if outs.len() == 1 => 0,
        None => {
            log::debug!("unit {id} selected none of its {} control outputs", outs.len());
            return;
        }
    };
    let Some(&out) = outs.get(index) else {
        log::warn!(
            "unit {id} selected control output {index} but only has {}",
            outs.len()
        );
        return;
    };
    let successor = g
        .connector()
        .first_neighbor(out)
        .and_then(|p| g.connector().port(p))
        .map(|p| p.unit());
    let Some(successor) = successor else {
        log::trace!("control output {index} of unit {id} is unattached");
        return;
    };
    if let Err(failure) = invoke(g, successor, Sender::Control(out), ctx) {
        log::debug!("branch forwarded from unit {id} failed: {failure}");
    }
}

impl fmt::Display for ParamReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamReason::Unconnected => write!(f, "unconnected with no default"),
            ParamReason::Upstream(failure) => write!(f, "{failure}"),
            ParamReason::MissingSlot { slot, len } => {
                write!(f, "no value in slot {slot} of {len} computed values")
            }
            ParamReason::TypeMismatch { expected, found } => {
                write!(f, "expected a value of type {expected}, found {found}")
            }
        }
    }
}
