use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::{
    error::{Result, SimError},
    scheduler::Algorithm,
};

pub type Pid = u32;
// 1-based, matches the position of the unit in `SchedState::units` plus one
pub type UnitId = usize;
pub type Ticks = u64;
/// Simulated seconds.
pub type SimTime = f64;
pub type Priority = u8;

pub const DEFAULT_PRIORITY: Priority = 5;
pub const MAX_PRIORITY: Priority = 10;

/// Remaining time at or below this counts as finished; also the slack on quantum expiry.
pub const COMPLETION_EPSILON: SimTime = 1e-9;

/// What a producer hands over to admit a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    pub pid: Pid,
    pub name: String,
    pub burst_time: SimTime,
    // None: stamped with the simulated time of admission
    pub arrival_time: Option<SimTime>,
    pub priority: Priority,
}

impl ProcessDescriptor {
    pub fn new(pid: Pid, name: impl Into<String>, burst_time: SimTime) -> Self {
        Self {
            pid,
            name: name.into(),
            burst_time,
            arrival_time: None,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn arriving_at(mut self, arrival_time: SimTime) -> Self {
        self.arrival_time = Some(arrival_time);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason| SimError::InvalidProcess {
            pid: self.pid,
            reason,
        };
        if self.pid == 0 {
            return Err(invalid("pid must be positive"));
        }
        if !self.burst_time.is_finite() || self.burst_time <= COMPLETION_EPSILON {
            return Err(invalid("burst time must be positive and finite"));
        }
        if self.priority > MAX_PRIORITY {
            return Err(invalid("priority must be within 0..=10"));
        }
        if let Some(arrival) = self.arrival_time {
            if !arrival.is_finite() || arrival < 0.0 {
                return Err(invalid("arrival time must be non-negative and finite"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Process {
    pub pid: Pid,
    pub name: String,
    pub burst_time: SimTime,
    pub arrival_time: SimTime,
    pub remaining_time: SimTime,
    pub priority: Priority,
    pub assigned_unit: Option<UnitId>,
    /// Round-Robin bookkeeping; zero under every other algorithm.
    pub quantum_used: SimTime,
    // Admission order, breaks arrival-time ties during dispatch
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl Process {
    pub fn new(
        pid: Pid,
        name: impl Into<String>,
        burst_time: SimTime,
        arrival_time: SimTime,
    ) -> Self {
        Self {
            pid,
            name: name.into(),
            burst_time,
            arrival_time,
            remaining_time: burst_time,
            priority: DEFAULT_PRIORITY,
            assigned_unit: None,
            quantum_used: 0.0,
            seq: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.remaining_time <= COMPLETION_EPSILON
    }

    // Returns how much actually ran; never drives remaining_time below zero
    pub fn run_for(&mut self, slice: SimTime) -> SimTime {
        let executed = slice.min(self.remaining_time).max(0.0);
        self.remaining_time = (self.remaining_time - executed).max(0.0);
        executed
    }
}

#[derive(Debug)]
pub struct ExecutionUnit {
    pub id: UnitId,
    pub queue: VecDeque<Process>,
    pub algorithm: Algorithm,
    pub quantum: Option<SimTime>,
}

impl ExecutionUnit {
    pub fn new(id: UnitId) -> Self {
        Self {
            id,
            queue: VecDeque::new(),
            algorithm: Algorithm::Fcfs,
            quantum: None,
        }
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.queue.iter().any(|p| p.pid == pid)
    }

    pub fn head(&self) -> Option<&Process> {
        self.queue.front()
    }

    pub fn round_robin_quantum(&self) -> Result<SimTime> {
        match self.quantum {
            Some(q) if q > 0.0 && q.is_finite() => Ok(q),
            Some(q) => Err(SimError::InvalidQuantum(q)),
            None => Err(SimError::MissingQuantum { unit: self.id }),
        }
    }

    /// Applies a configuration, leaving the unit untouched if it is invalid.
    pub fn configure(&mut self, algorithm: Algorithm, quantum: Option<SimTime>) -> Result<()> {
        if let Some(q) = quantum {
            validate_quantum(q)?;
        }
        if algorithm == Algorithm::RoundRobin && quantum.is_none() {
            return Err(SimError::MissingQuantum { unit: self.id });
        }
        self.algorithm = algorithm;
        self.quantum = quantum;
        Ok(())
    }
}

pub fn validate_quantum(quantum: SimTime) -> Result<()> {
    if quantum > 0.0 && quantum.is_finite() {
        Ok(())
    } else {
        Err(SimError::InvalidQuantum(quantum))
    }
}

/// Every live process is in exactly one place: `pending` (admitted, not yet
/// dispatched) or the queue of one unit.
#[derive(Debug)]
pub struct SchedState {
    pub now: Ticks,
    pub tick_size: SimTime,
    pub units: Vec<ExecutionUnit>,
    pub pending: Vec<Process>,
    pub assigned: FxHashSet<Pid>,

    // Increment upon admission
    next_seq: u64,
}

impl SchedState {
    pub fn new(num_units: usize, tick_size: SimTime) -> Self {
        Self {
            now: 0,
            tick_size,
            units: (1..=num_units).map(ExecutionUnit::new).collect(),
            pending: Vec::new(),
            assigned: FxHashSet::default(),
            next_seq: 0,
        }
    }

    pub fn advance_time(&mut self, delta: Ticks) {
        self.now = self.now.saturating_add(delta);
    }

    /// Current simulated time in seconds.
    pub fn time(&self) -> SimTime {
        self.now as SimTime * self.tick_size
    }

    pub fn unit(&self, id: UnitId) -> Result<&ExecutionUnit> {
        id.checked_sub(1)
            .and_then(|idx| self.units.get(idx))
            .ok_or(SimError::UnknownUnit(id))
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Result<&mut ExecutionUnit> {
        id.checked_sub(1)
            .and_then(|idx| self.units.get_mut(idx))
            .ok_or(SimError::UnknownUnit(id))
    }

    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.pending
            .iter()
            .chain(self.units.iter().flat_map(|unit| unit.queue.iter()))
    }

    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.processes().find(|p| p.pid == pid)
    }

    pub fn is_live(&self, pid: Pid) -> bool {
        self.process(pid).is_some()
    }

    pub fn has_unassigned(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn admit(&mut self, descriptor: ProcessDescriptor) -> Result<&Process> {
        descriptor.validate()?;
        if self.is_live(descriptor.pid) {
            return Err(SimError::DuplicatePid(descriptor.pid));
        }

        let arrival = descriptor.arrival_time.unwrap_or_else(|| self.time());
        let mut process = Process::new(
            descriptor.pid,
            descriptor.name,
            descriptor.burst_time,
            arrival,
        );
        process.priority = descriptor.priority;
        process.seq = self.next_seq;
        self.next_seq += 1;

        self.pending.push(process);
        Ok(self.pending.last().expect("pushed above"))
    }

    pub fn remove(&mut self, pid: Pid) -> Option<Process> {
        if let Some(idx) = self.pending.iter().position(|p| p.pid == pid) {
            return Some(self.pending.remove(idx));
        }
        for unit in &mut self.units {
            if let Some(idx) = unit.queue.iter().position(|p| p.pid == pid) {
                self.assigned.remove(&pid);
                return unit.queue.remove(idx);
            }
        }
        None
    }

    /// Empties every queue and the pending list, handing back all live processes
    /// in admission order with their assignment cleared.
    pub fn drain_all(&mut self) -> Vec<Process> {
        let mut all: Vec<Process> = self.pending.drain(..).collect();
        for unit in &mut self.units {
            all.extend(unit.queue.drain(..));
        }
        self.assigned.clear();
        all.sort_by_key(|p| p.seq);
        for process in &mut all {
            process.assigned_unit = None;
        }
        all
    }

    pub fn next_free_pid(&self) -> Pid {
        self.processes().map(|p| p.pid).max().unwrap_or(0) + 1
    }
}
