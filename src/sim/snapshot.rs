use serde::Serialize;

use crate::{
    core::{
        CompletionRecord, ExecutionUnit, Metrics, Pid, Priority, Process, SimTime, Ticks, UnitId,
    },
    scheduler::Algorithm,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Paused,
    Running,
    // Terminal until reset
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueuedProcess {
    pub pid: Pid,
    pub name: String,
    pub remaining_time: SimTime,
    pub priority: Priority,
    pub quantum_used: SimTime,
}

impl From<&Process> for QueuedProcess {
    fn from(p: &Process) -> Self {
        Self {
            pid: p.pid,
            name: p.name.clone(),
            remaining_time: p.remaining_time,
            priority: p.priority,
            quantum_used: p.quantum_used,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub algorithm: Algorithm,
    pub quantum: Option<SimTime>,
    /// Head of the queue, the one that runs next tick.
    pub running: Option<Pid>,
    pub queue: Vec<QueuedProcess>,
}

impl From<&ExecutionUnit> for UnitSnapshot {
    fn from(unit: &ExecutionUnit) -> Self {
        Self {
            id: unit.id,
            algorithm: unit.algorithm,
            quantum: unit.quantum,
            running: unit.head().map(|p| p.pid),
            queue: unit.queue.iter().map(QueuedProcess::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub completed: usize,
    pub average_waiting: SimTime,
    pub average_turnaround: SimTime,
    pub records: Vec<CompletionRecord>,
}

impl From<&Metrics> for MetricsSnapshot {
    fn from(metrics: &Metrics) -> Self {
        Self {
            completed: metrics.completed_count(),
            average_waiting: metrics.average_waiting(),
            average_turnaround: metrics.average_turnaround(),
            records: metrics.records().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Status {
    pub now: SimTime,
    pub ticks: Ticks,
    pub run_state: RunState,
    pub live: usize,
    pub pending: usize,
}
