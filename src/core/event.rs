use serde::Serialize;

use crate::core::{CompletionRecord, Pid, SimTime, UnitId};

/// Everything a sink needs about a finished process, copied out of the tick so
/// it can be written after the state lock is released.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionEntry {
    pub pid: Pid,
    pub name: String,
    pub unit: UnitId,
    pub cpu_time: SimTime,
    pub arrival_time: SimTime,
    pub completion_time: SimTime,
    pub turnaround_time: SimTime,
    pub waiting_time: SimTime,
}

impl CompletionEntry {
    pub fn record(&self) -> CompletionRecord {
        CompletionRecord {
            pid: self.pid,
            completion_time: self.completion_time,
            turnaround_time: self.turnaround_time,
            waiting_time: self.waiting_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimEvent {
    // Silent dispatch pass picked up unassigned processes
    Readmitted {
        dispatched: usize,
    },
    Executed {
        unit: UnitId,
        pid: Pid,
        start: SimTime,
        duration: SimTime,
    },
    // Quantum spent, head moved to the tail
    Rotated {
        unit: UnitId,
        pid: Pid,
    },
    Completed(CompletionEntry),
    // Round-Robin unit left idle for the tick because its quantum is invalid
    Misconfigured {
        unit: UnitId,
    },
}
