use rustc_hash::FxHashSet;

use super::state::SchedState;

#[derive(Debug, Default)]
pub struct Observer {
    step: u64,
}

impl Observer {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn observe(&mut self, state: &SchedState) {
        self.step += 1;

        let mut seen = FxHashSet::default();
        for unit in &state.units {
            for process in &unit.queue {
                let pid = process.pid;
                debug_assert!(
                    seen.insert(pid),
                    "pid {pid} queued on more than one unit (found again on unit {})",
                    unit.id
                );
                debug_assert_eq!(
                    process.assigned_unit,
                    Some(unit.id),
                    "pid {pid} sits on unit {} but points elsewhere",
                    unit.id
                );
                debug_assert!(
                    state.assigned.contains(&pid),
                    "queued pid {pid} missing from the assigned set"
                );
                debug_assert!(
                    process.remaining_time >= 0.0,
                    "pid {pid} has negative remaining time {}",
                    process.remaining_time
                );
                debug_assert!(
                    !process.is_finished(),
                    "finished pid {pid} still queued on unit {}",
                    unit.id
                );
            }
        }

        debug_assert_eq!(
            seen.len(),
            state.assigned.len(),
            "assigned set holds pids that are not queued anywhere"
        );

        for process in &state.pending {
            debug_assert!(
                !seen.contains(&process.pid),
                "pending pid {} is also queued",
                process.pid
            );
        }
    }
}
