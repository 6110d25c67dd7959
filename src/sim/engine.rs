use parking_lot::Mutex;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};
use tracing::{debug, info, warn};

use super::{
    producer::ProcessProducer,
    sink::CompletionSink,
    snapshot::{MetricsSnapshot, RunState, Status, UnitSnapshot},
};
use crate::{
    config::SimConfig,
    core::{
        CompletionEntry, Pid, Process, ProcessDescriptor, SimCore, SimEvent, SimTime,
        TimelineSegment, UnitId,
    },
    error::{Result, SimError},
    scheduler::{Algorithm, DispatchMode, DispatchReport},
};

// Everything the clock thread and callers share; one lock, held for a whole tick
struct Shared {
    core: SimCore,
    run_state: RunState,
}

/// Runs the simulation clock on a background thread. Every method is safe to
/// call while the clock is running; mutations land between ticks.
pub struct Engine {
    shared: Arc<Mutex<Shared>>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Engine {
    pub fn new(config: SimConfig) -> Result<Self> {
        Self::spawn(config, None)
    }

    pub fn with_sink(config: SimConfig, sink: Box<dyn CompletionSink>) -> Result<Self> {
        Self::spawn(config, Some(sink))
    }

    fn spawn(config: SimConfig, sink: Option<Box<dyn CompletionSink>>) -> Result<Self> {
        let core = SimCore::new(&config)?;
        let shared = Arc::new(Mutex::new(Shared {
            core,
            run_state: RunState::Paused,
        }));
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = {
            let shared = Arc::clone(&shared);
            let shutdown = Arc::clone(&shutdown);
            let (poll, idle) = (config.poll_interval(), config.idle_interval());
            thread::Builder::new()
                .name("sched-sim-clock".to_owned())
                .spawn(move || clock_loop(shared, shutdown, sink, poll, idle))
                .map_err(|err| SimError::Thread(err.to_string()))?
        };

        info!(
            units = config.units,
            tick_size = config.tick_size,
            "simulation engine started (paused)"
        );
        Ok(Self {
            shared,
            shutdown,
            worker: Some(worker),
        })
    }

    pub fn start(&self) -> Result<()> {
        let mut shared = self.shared.lock();
        if shared.run_state == RunState::Stopped {
            return Err(SimError::Stopped);
        }
        shared.run_state = RunState::Running;
        info!(now = shared.core.now(), "simulation running");
        Ok(())
    }

    pub fn pause(&self) {
        let mut shared = self.shared.lock();
        if shared.run_state == RunState::Running {
            shared.run_state = RunState::Paused;
            info!(now = shared.core.now(), "simulation paused");
        }
    }

    pub fn stop(&self) {
        let mut shared = self.shared.lock();
        shared.run_state = RunState::Stopped;
        info!(now = shared.core.now(), "simulation stopped");
    }

    /// Fresh clock, timeline and metrics; live processes go back to the pool.
    /// Leaves the engine paused.
    pub fn reset(&self) {
        let mut shared = self.shared.lock();
        shared.core.reset();
        shared.run_state = RunState::Paused;
        info!("simulation reset");
    }

    pub fn add_process(&self, descriptor: ProcessDescriptor) -> Result<Pid> {
        let mut shared = self.shared.lock();
        let process = shared.core.admit(descriptor)?;
        debug!(
            pid = process.pid,
            burst = process.burst_time,
            priority = process.priority,
            "process admitted"
        );
        Ok(process.pid)
    }

    /// Returns `None` (and logs) when the pid is not live.
    pub fn remove_process(&self, pid: Pid) -> Option<Process> {
        self.shared.lock().core.remove(pid)
    }

    /// Admits a batch from `producer`, skipping pids that are already live or
    /// invalid. The producer runs without the lock held.
    pub fn import(&self, producer: &mut dyn ProcessProducer) -> usize {
        let now = self.shared.lock().core.now();
        let batch = producer.produce(now);

        let mut shared = self.shared.lock();
        let mut admitted = 0;
        for descriptor in batch {
            let pid = descriptor.pid;
            match shared.core.admit(descriptor) {
                Ok(_) => admitted += 1,
                Err(err) => debug!(pid, %err, "import skipped process"),
            }
        }
        info!(admitted, "processes imported");
        admitted
    }

    pub fn next_free_pid(&self) -> Pid {
        self.shared.lock().core.state.next_free_pid()
    }

    pub fn configure_unit(
        &self,
        unit: UnitId,
        algorithm: Algorithm,
        quantum: Option<SimTime>,
    ) -> Result<()> {
        self.shared
            .lock()
            .core
            .configure_unit(unit, algorithm, quantum)
    }

    pub fn set_dispatch_params(&self, threshold: u8, default_quantum: SimTime) -> Result<()> {
        self.shared
            .lock()
            .core
            .set_dispatch_params(threshold, default_quantum)
    }

    pub fn dispatch(&self) -> DispatchReport {
        self.shared.lock().core.dispatch(DispatchMode::Notify)
    }

    pub fn snapshot_units(&self) -> Vec<UnitSnapshot> {
        let shared = self.shared.lock();
        shared
            .core
            .state
            .units
            .iter()
            .map(UnitSnapshot::from)
            .collect()
    }

    pub fn snapshot_timeline(&self, start: SimTime, end: SimTime) -> Vec<TimelineSegment> {
        self.shared.lock().core.timeline.window(start, end)
    }

    pub fn snapshot_metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot::from(&self.shared.lock().core.metrics)
    }

    pub fn snapshot_processes(&self) -> Vec<Process> {
        self.shared.lock().core.state.processes().cloned().collect()
    }

    pub fn status(&self) -> Status {
        let shared = self.shared.lock();
        let state = &shared.core.state;
        Status {
            now: shared.core.now(),
            ticks: shared.core.ticks(),
            run_state: shared.run_state,
            live: state.processes().count(),
            pending: state.pending.len(),
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("simulation thread panicked");
            }
        }
    }
}

fn clock_loop(
    shared: Arc<Mutex<Shared>>,
    shutdown: Arc<AtomicBool>,
    mut sink: Option<Box<dyn CompletionSink>>,
    poll: Duration,
    idle: Duration,
) {
    while !shutdown.load(Ordering::Acquire) {
        thread::sleep(poll);

        let completed = {
            let mut shared = shared.lock();
            if shared.run_state != RunState::Running {
                None
            } else {
                let events = shared.core.tick();
                Some(take_completions(events))
            }
        };

        let Some(completed) = completed else {
            thread::sleep(idle);
            continue;
        };

        // Lock released: sink I/O never stalls readers
        if let Some(sink) = sink.as_mut() {
            for entry in &completed {
                if let Err(err) = sink.append(entry) {
                    warn!(pid = entry.pid, %err, "failed to persist completion record");
                }
            }
        }
    }
    debug!("simulation thread exiting");
}

fn take_completions(events: Vec<SimEvent>) -> Vec<CompletionEntry> {
    events
        .into_iter()
        .filter_map(|event| match event {
            SimEvent::Completed(entry) => Some(entry),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{MemorySink, SyntheticProducer};
    use std::{io, sync::atomic::AtomicUsize, time::Instant};

    struct BrokenSink {
        attempts: Arc<AtomicUsize>,
    }

    impl CompletionSink for BrokenSink {
        fn append(&mut self, _entry: &CompletionEntry) -> io::Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::other("disk full"))
        }
    }

    fn fast_config(units: usize) -> SimConfig {
        SimConfig {
            units,
            poll_interval_ms: 1,
            idle_interval_ms: 1,
            ..SimConfig::default()
        }
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn completions_reach_the_sink() {
        let sink = MemorySink::new();
        let engine = Engine::with_sink(fast_config(1), Box::new(sink.clone())).unwrap();
        engine
            .add_process(ProcessDescriptor::new(1, "short", 0.3).arriving_at(0.0))
            .unwrap();
        engine.dispatch();
        engine.start().unwrap();

        assert!(wait_for(|| sink.len() == 1));
        let entry = &sink.entries()[0];
        assert_eq!(entry.pid, 1);
        assert_eq!(entry.unit, 1);
        assert!((entry.turnaround_time - 0.3).abs() < 1e-6);

        let metrics = engine.snapshot_metrics();
        assert_eq!(metrics.completed, 1);
        assert!(engine.snapshot_processes().is_empty());
        assert!(!engine.snapshot_timeline(0.0, 1.0).is_empty());
    }

    #[test]
    fn failing_sink_does_not_stall_the_clock() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let sink = BrokenSink {
            attempts: Arc::clone(&attempts),
        };
        let engine = Engine::with_sink(fast_config(1), Box::new(sink)).unwrap();
        for pid in 1..=3 {
            engine
                .add_process(ProcessDescriptor::new(pid, format!("p{pid}"), 0.2).with_priority(1))
                .unwrap();
        }
        engine.start().unwrap();

        assert!(wait_for(|| engine.snapshot_metrics().completed == 3));
        assert!(wait_for(|| attempts.load(Ordering::SeqCst) == 3));
        let pids: Vec<Pid> = engine
            .snapshot_metrics()
            .records
            .iter()
            .map(|r| r.pid)
            .collect();
        assert_eq!(pids, vec![1, 2, 3]);
        assert_eq!(engine.status().run_state, RunState::Running);
    }

    #[test]
    fn snapshots_never_see_a_half_applied_tick() {
        let engine = Engine::new(fast_config(1)).unwrap();
        for pid in 1..=6 {
            engine
                .add_process(ProcessDescriptor::new(pid, format!("p{pid}"), 0.5).arriving_at(0.0))
                .unwrap();
        }
        engine.start().unwrap();

        let finished = wait_for(|| {
            let queued: Vec<Process> = engine
                .snapshot_processes()
                .into_iter()
                .filter(|p| p.assigned_unit.is_some())
                .collect();
            for (idx, p) in queued.iter().enumerate() {
                // completed processes leave the queue in the same tick that finishes them
                assert!(!p.is_finished(), "pid {} finished but still queued", p.pid);
                let tenths = p.remaining_time * 10.0;
                assert!((tenths - tenths.round()).abs() < 1e-6);
                if idx > 0 {
                    assert_eq!(p.remaining_time, p.burst_time);
                }
            }
            engine.snapshot_metrics().completed == 6
        });
        assert!(finished);
        assert!(engine.snapshot_processes().is_empty());
    }

    #[test]
    fn stop_is_terminal_until_reset() {
        let engine = Engine::new(fast_config(2)).unwrap();
        engine.start().unwrap();
        engine.stop();
        assert_eq!(engine.start(), Err(SimError::Stopped));
        assert_eq!(engine.status().run_state, RunState::Stopped);

        engine.reset();
        assert_eq!(engine.status().run_state, RunState::Paused);
        assert!(engine.start().is_ok());
    }

    #[test]
    fn pause_freezes_the_clock() {
        let engine = Engine::new(fast_config(1)).unwrap();
        engine
            .add_process(ProcessDescriptor::new(1, "long", 100.0))
            .unwrap();
        engine.start().unwrap();
        assert!(wait_for(|| engine.status().ticks > 2));

        engine.pause();
        let frozen = engine.status().ticks;
        thread::sleep(Duration::from_millis(20));
        assert_eq!(engine.status().ticks, frozen);
        assert_eq!(engine.status().run_state, RunState::Paused);
    }

    #[test]
    fn admission_and_removal() {
        let engine = Engine::new(fast_config(2)).unwrap();
        assert_eq!(
            engine.add_process(ProcessDescriptor::new(3, "a", 1.0)),
            Ok(3)
        );
        assert_eq!(
            engine.add_process(ProcessDescriptor::new(3, "b", 2.0)),
            Err(SimError::DuplicatePid(3))
        );
        assert_eq!(engine.next_free_pid(), 4);

        assert!(engine.remove_process(42).is_none());
        assert_eq!(engine.remove_process(3).map(|p| p.name), Some("a".to_owned()));
        assert_eq!(engine.status().live, 0);
    }

    #[test]
    fn import_skips_live_pids() {
        let engine = Engine::new(fast_config(4)).unwrap();
        engine
            .add_process(ProcessDescriptor::new(2, "taken", 1.0))
            .unwrap();

        let admitted = engine.import(&mut SyntheticProducer::new(3, 5));
        assert_eq!(admitted, 4);
        assert_eq!(engine.status().live, 5);
        assert_eq!(engine.status().pending, 5);

        let report = engine.dispatch();
        assert_eq!(report.assignments.len(), 5);
        let queued: usize = engine.snapshot_units().iter().map(|u| u.queue.len()).sum();
        assert_eq!(queued, 5);
        assert_eq!(engine.status().pending, 0);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let engine = Engine::new(fast_config(2)).unwrap();
        assert_eq!(
            engine.configure_unit(2, Algorithm::RoundRobin, None),
            Err(SimError::MissingQuantum { unit: 2 })
        );
        assert_eq!(
            engine.configure_unit(5, Algorithm::Fcfs, None),
            Err(SimError::UnknownUnit(5))
        );
        assert_eq!(
            engine.set_dispatch_params(11, 1.0),
            Err(SimError::InvalidThreshold(11))
        );
        engine
            .configure_unit(1, Algorithm::RoundRobin, Some(0.5))
            .unwrap();

        let units = engine.snapshot_units();
        assert_eq!(units[0].algorithm, Algorithm::RoundRobin);
        assert_eq!(units[0].quantum, Some(0.5));
        assert_eq!(units[1].algorithm, Algorithm::Fcfs);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SimConfig {
            units: 0,
            ..SimConfig::default()
        };
        assert!(matches!(Engine::new(config), Err(SimError::InvalidConfig(_))));
    }
}
