pub mod fcfs;
pub mod multilevel;
pub mod round_robin;
pub mod sjf;

use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt, str::FromStr};

use crate::core::{Process, SimTime};
pub use fcfs::Fcfs;
pub use multilevel::{DispatchMode, DispatchParams, DispatchReport, Dispatcher};
pub use round_robin::RoundRobin;
pub use sjf::Sjf;

pub const DEFAULT_THRESHOLD: u8 = 5;
pub const DEFAULT_QUANTUM: SimTime = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    Fcfs,
    Sjf,
    RoundRobin,
    // Marker consumed by the dispatcher; runs as FCFS until a dispatch pass resolves it
    Multilevel,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fcfs => "FCFS",
            Self::Sjf => "SJF",
            Self::RoundRobin => "Round Robin",
            Self::Multilevel => "Multilevel",
        })
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fcfs" | "fifo" => Ok(Self::Fcfs),
            "sjf" => Ok(Self::Sjf),
            "rr" | "round-robin" | "round_robin" | "roundrobin" => Ok(Self::RoundRobin),
            "multilevel" | "ml" => Ok(Self::Multilevel),
            other => Err(format!(
                "unknown algorithm {other:?}; expected fcfs, sjf, rr or multilevel"
            )),
        }
    }
}

/// Per-unit execution policy, consulted once per tick for the unit's queue.
pub trait Policy {
    /// Reorder the queue before the head is picked.
    fn reorder(&self, _queue: &mut VecDeque<Process>) {}

    /// Longest the head may run during a tick of `tick` seconds.
    fn slice(&self, head: &Process, tick: SimTime) -> SimTime {
        tick.min(head.remaining_time)
    }

    fn charge(&self, _head: &mut Process, _executed: SimTime) {}

    // Asked only for a head that ran and has not finished
    fn preempt(&self, _head: &Process) -> bool {
        false
    }
}
