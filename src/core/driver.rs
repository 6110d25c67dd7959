use tracing::{debug, info, warn};

use super::{
    event::{CompletionEntry, SimEvent},
    metrics::Metrics,
    observer::Observer,
    state::{Pid, Process, ProcessDescriptor, SchedState, SimTime, Ticks, UnitId},
    timeline::Timeline,
};
use crate::{
    config::SimConfig,
    error::Result,
    scheduler::{
        Algorithm, DispatchMode, DispatchParams, DispatchReport, Dispatcher, Fcfs, Policy,
        RoundRobin, Sjf,
    },
};

/// The simulation clock and everything it mutates. Not thread-safe by itself;
/// `Engine` puts it behind a lock.
pub struct SimCore {
    pub state: SchedState,
    pub dispatcher: Dispatcher,
    pub timeline: Timeline,
    pub metrics: Metrics,
    observer: Observer,
    readmit_every: Ticks,
    last_readmit: Option<Ticks>,
}

impl SimCore {
    pub fn new(config: &SimConfig) -> Result<Self> {
        config.validate()?;
        let readmit_every = ((config.readmit_interval / config.tick_size).round() as Ticks).max(1);
        Ok(Self {
            state: SchedState::new(config.units, config.tick_size),
            dispatcher: Dispatcher::new(config.dispatch_params()?),
            timeline: Timeline::new(),
            metrics: Metrics::new(),
            observer: Observer::new(),
            readmit_every,
            last_readmit: None,
        })
    }

    pub fn tick(&mut self) -> Vec<SimEvent> {
        let mut events = Vec::new();

        if self.readmit_due() {
            self.last_readmit = Some(self.state.now);
            if self.state.has_unassigned() {
                let report = self.dispatcher.dispatch(&mut self.state, DispatchMode::Silent);
                events.push(SimEvent::Readmitted {
                    dispatched: report.assignments.len(),
                });
            }
        }

        self.state.advance_time(1);
        let end = self.state.time();
        for idx in 0..self.state.units.len() {
            self.tick_unit(idx, end, &mut events);
        }

        self.observer.observe(&self.state);
        events
    }

    fn readmit_due(&self) -> bool {
        match self.last_readmit {
            Some(last) => self.state.now.saturating_sub(last) >= self.readmit_every,
            None => true,
        }
    }

    fn tick_unit(&mut self, idx: usize, end: SimTime, events: &mut Vec<SimEvent>) {
        let algorithm = self.state.units[idx].algorithm;
        match algorithm {
            Algorithm::Fcfs | Algorithm::Multilevel => self.run_head(idx, &Fcfs, end, events),
            Algorithm::Sjf => self.run_head(idx, &Sjf, end, events),
            Algorithm::RoundRobin => match self.state.units[idx].round_robin_quantum() {
                Ok(quantum) => self.run_head(idx, &RoundRobin::new(quantum), end, events),
                Err(err) => {
                    let unit = &self.state.units[idx];
                    if !unit.queue.is_empty() {
                        warn!(unit = unit.id, %err, "unit left idle");
                        events.push(SimEvent::Misconfigured { unit: unit.id });
                    }
                }
            },
        }
    }

    // `end` is the clock after this tick; the slice ran just before it
    fn run_head<P: Policy>(
        &mut self,
        idx: usize,
        policy: &P,
        end: SimTime,
        events: &mut Vec<SimEvent>,
    ) {
        let tick = self.state.tick_size;
        let Self {
            state,
            timeline,
            metrics,
            ..
        } = self;
        let unit = &mut state.units[idx];

        policy.reorder(&mut unit.queue);
        let Some(head) = unit.queue.front_mut() else {
            return;
        };

        let slice = policy.slice(head, tick);
        let executed = head.run_for(slice);
        policy.charge(head, executed);
        let pid = head.pid;
        let start = end - executed;

        if executed > 0.0 {
            timeline.record(unit.id, pid, start, executed);
            events.push(SimEvent::Executed {
                unit: unit.id,
                pid,
                start,
                duration: executed,
            });
        }

        if head.is_finished() {
            let process = unit
                .queue
                .pop_front()
                .expect("Finished head missing from its queue");
            state.assigned.remove(&pid);

            let record = metrics.complete(
                pid,
                end,
                process.arrival_time,
                process.burst_time,
            );
            debug!(
                pid,
                unit = unit.id,
                completion = record.completion_time,
                turnaround = record.turnaround_time,
                waiting = record.waiting_time,
                "process completed"
            );

            events.push(SimEvent::Completed(CompletionEntry {
                pid,
                name: process.name,
                unit: unit.id,
                cpu_time: process.burst_time,
                arrival_time: process.arrival_time,
                completion_time: record.completion_time,
                turnaround_time: record.turnaround_time,
                waiting_time: record.waiting_time,
            }));
        } else if policy.preempt(head) {
            head.quantum_used = 0.0;
            unit.queue.rotate_left(1);
            events.push(SimEvent::Rotated { unit: unit.id, pid });
        }
    }

    pub fn dispatch(&mut self, mode: DispatchMode) -> DispatchReport {
        self.dispatcher.dispatch(&mut self.state, mode)
    }

    pub fn admit(&mut self, descriptor: ProcessDescriptor) -> Result<&Process> {
        self.state.admit(descriptor)
    }

    pub fn remove(&mut self, pid: Pid) -> Option<Process> {
        let removed = self.state.remove(pid);
        if removed.is_none() {
            warn!(pid, "remove: process not found");
        }
        removed
    }

    pub fn configure_unit(
        &mut self,
        unit: UnitId,
        algorithm: Algorithm,
        quantum: Option<SimTime>,
    ) -> Result<()> {
        let result = self
            .state
            .unit_mut(unit)
            .and_then(|u| u.configure(algorithm, quantum));
        match &result {
            Ok(()) => info!(unit, %algorithm, ?quantum, "unit configured"),
            Err(err) => warn!(unit, %err, "unit configuration rejected"),
        }
        result
    }

    pub fn set_dispatch_params(&mut self, threshold: u8, default_quantum: SimTime) -> Result<()> {
        let params = DispatchParams::new(threshold, default_quantum).inspect_err(|err| {
            warn!(%err, "dispatch parameters rejected");
        })?;
        self.dispatcher.set_params(params);
        info!(threshold, default_quantum, "dispatch parameters updated");
        Ok(())
    }

    /// Back to time zero with an empty timeline and no completion history. Live
    /// processes return to the pending pool as if they had just arrived.
    pub fn reset(&mut self) {
        let mut pool = self.state.drain_all();
        for process in &mut pool {
            process.remaining_time = process.burst_time;
            process.quantum_used = 0.0;
            process.arrival_time = 0.0;
        }
        self.state.pending = pool;
        self.state.now = 0;
        self.timeline.clear();
        self.metrics.clear();
        self.last_readmit = None;
    }

    pub fn now(&self) -> SimTime {
        self.state.time()
    }

    pub fn ticks(&self) -> Ticks {
        self.state.now
    }

    /// True once nothing is pending or queued.
    pub fn is_drained(&self) -> bool {
        self.state.processes().next().is_none()
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }
}
