use std::fmt;

use crate::core::{Pid, SimTime, UnitId};

#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// Round-Robin selected on a unit with no quantum configured.
    MissingQuantum { unit: UnitId },
    InvalidQuantum(SimTime),
    InvalidThreshold(u8),
    UnknownUnit(UnitId),
    DuplicatePid(Pid),
    InvalidProcess { pid: Pid, reason: &'static str },
    InvalidConfig(&'static str),
    // start() after stop() without an intervening reset()
    Stopped,
    Thread(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingQuantum { unit } => {
                write!(f, "unit {unit}: round-robin requires a quantum")
            }
            Self::InvalidQuantum(q) => write!(f, "quantum must be positive, got {q}"),
            Self::InvalidThreshold(t) => {
                write!(f, "priority threshold must be within 0..=10, got {t}")
            }
            Self::UnknownUnit(unit) => write!(f, "no execution unit with id {unit}"),
            Self::DuplicatePid(pid) => write!(f, "pid {pid} is already live"),
            Self::InvalidProcess { pid, reason } => write!(f, "process {pid}: {reason}"),
            Self::InvalidConfig(reason) => write!(f, "invalid configuration: {reason}"),
            Self::Stopped => write!(f, "simulation was stopped; reset it before starting again"),
            Self::Thread(err) => write!(f, "failed to spawn the simulation thread: {err}"),
        }
    }
}

impl std::error::Error for SimError {}

pub type Result<T> = std::result::Result<T, SimError>;
