//! Error types.
//!
//! Only caller mistakes are errors. Running out of money, losing a battle or
//! finding no route are ordinary results and are modelled as state.

use crate::state::{ForceId, OrderId};
use thiserror::Error;

/// Invalid input to a force mutation. The force is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForceError {
    #[error("unknown force {0}")]
    UnknownForce(ForceId),
    #[error("unit index {index} out of range for force {force} ({len} units)")]
    UnitIndexOutOfRange {
        force: ForceId,
        index: usize,
        len: usize,
    },
    #[error("cannot split {requested} men from a unit of {available}")]
    InvalidSplit { requested: u32, available: u32 },
    #[error("cannot merge units of different types")]
    MismatchedUnitTypes,
    #[error("force {0} has no units")]
    EmptyForce(ForceId),
    #[error("force {0} would mix land and naval units")]
    MixedDomain(ForceId),
    #[error("cannot merge force {0} into itself")]
    InvalidMerge(ForceId),
}

/// Config failed to parse or failed validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("unknown order {0}")]
    UnknownOrder(OrderId),
    #[error("force {0} is not accepting new orders")]
    NotAccepting(ForceId),
    #[error("illegal order transition {from} -> {to}")]
    IllegalTransition { from: String, to: String },
    #[error("force {0} has no order under way")]
    NoCurrentOrder(ForceId),
}

/// A system was registered in a lane that does not match how it declares
/// it must be scheduled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("system {name} declares {declared} scheduling but was registered on the {lane} lane")]
    StrategyMismatch {
        name: String,
        declared: String,
        lane: String,
    },
    #[error("system {0} is already registered")]
    DuplicateSystem(String),
}
