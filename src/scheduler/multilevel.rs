use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Algorithm, DEFAULT_QUANTUM, DEFAULT_THRESHOLD};
use crate::{
    core::{
        COMPLETION_EPSILON, ExecutionUnit, MAX_PRIORITY, Pid, Process, SchedState, SimTime,
        UnitId, validate_quantum,
    },
    error::{Result, SimError},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispatchParams {
    /// Priorities at or above this go to the high queue.
    pub threshold: u8,
    /// Quantum handed to units switched to Round-Robin that have none.
    pub default_quantum: SimTime,
}

impl DispatchParams {
    pub fn new(threshold: u8, default_quantum: SimTime) -> Result<Self> {
        if threshold > MAX_PRIORITY {
            return Err(SimError::InvalidThreshold(threshold));
        }
        validate_quantum(default_quantum)?;
        Ok(Self {
            threshold,
            default_quantum,
        })
    }
}

impl Default for DispatchParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            default_quantum: DEFAULT_QUANTUM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Caller asked for it; report the outcome.
    Notify,
    /// Periodic re-admission from the clock.
    Silent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchReport {
    pub high: usize,
    pub low: usize,
    /// Admitted with an arrival time still in the future; left pending.
    pub deferred: usize,
    pub assignments: Vec<(Pid, UnitId)>,
}

impl DispatchReport {
    pub fn unit_of(&self, pid: Pid) -> Option<UnitId> {
        self.assignments
            .iter()
            .find(|(p, _)| *p == pid)
            .map(|&(_, unit)| unit)
    }
}

/// Two-level dispatch: high-priority processes are spread over the units under
/// Round-Robin, low-priority ones under FCFS, both in arrival order.
#[derive(Debug, Default)]
pub struct Dispatcher {
    params: DispatchParams,
}

impl Dispatcher {
    pub fn new(params: DispatchParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> DispatchParams {
        self.params
    }

    pub fn set_params(&mut self, params: DispatchParams) {
        self.params = params;
    }

    /// Redistributes every arrived process from scratch. Running it twice with
    /// the same pool yields the same pid -> unit mapping. Processes whose
    /// arrival time is still ahead of the clock stay in `pending`.
    pub fn dispatch(&self, state: &mut SchedState, mode: DispatchMode) -> DispatchReport {
        let mut report = DispatchReport::default();

        if state.units.is_empty() {
            warn!("dispatch skipped: no execution units configured");
            return report;
        }

        let now = state.time();
        let (pool, not_arrived): (Vec<Process>, Vec<Process>) = state
            .drain_all()
            .into_iter()
            .partition(|p| p.arrival_time <= now + COMPLETION_EPSILON);
        report.deferred = not_arrived.len();
        state.pending = not_arrived;

        if pool.is_empty() {
            if mode == DispatchMode::Notify {
                warn!(
                    deferred = report.deferred,
                    "dispatch requested with no arrived processes in the pool"
                );
            }
            return report;
        }

        let threshold = self.params.threshold;
        let (mut high, mut low): (Vec<Process>, Vec<Process>) =
            pool.into_iter().partition(|p| p.priority >= threshold);
        // Stable sorts: arrival ties stay in admission order
        high.sort_by(|a, b| a.arrival_time.total_cmp(&b.arrival_time));
        low.sort_by(|a, b| a.arrival_time.total_cmp(&b.arrival_time));
        report.high = high.len();
        report.low = low.len();

        let unit_count = state.units.len();
        for (idx, process) in high.into_iter().enumerate() {
            let unit = &mut state.units[idx % unit_count];
            unit.algorithm = Algorithm::RoundRobin;
            if unit.quantum.is_none() {
                unit.quantum = Some(self.params.default_quantum);
            }
            report.assignments.push((process.pid, unit.id));
            assign(&mut state.assigned, unit, process);
        }

        for (idx, process) in low.into_iter().enumerate() {
            let unit = &mut state.units[idx % unit_count];
            if unit.algorithm != Algorithm::RoundRobin {
                unit.algorithm = Algorithm::Fcfs;
            }
            report.assignments.push((process.pid, unit.id));
            assign(&mut state.assigned, unit, process);
        }

        match mode {
            DispatchMode::Notify => info!(
                high = report.high,
                low = report.low,
                deferred = report.deferred,
                units = unit_count,
                "processes dispatched to units"
            ),
            DispatchMode::Silent => debug!(
                high = report.high,
                low = report.low,
                "re-admission dispatch"
            ),
        }

        report
    }
}

fn assign(assigned: &mut FxHashSet<Pid>, unit: &mut ExecutionUnit, mut process: Process) {
    process.assigned_unit = Some(unit.id);
    process.quantum_used = 0.0;
    assigned.insert(process.pid);
    unit.queue.push_back(process);
}
