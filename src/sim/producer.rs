use rand::prelude::*;
use std::ops::Range;

use crate::core::{MAX_PRIORITY, Pid, ProcessDescriptor, SimTime};

/// Source of candidate processes, e.g. an importer reading the host's process
/// table. Called without the engine lock held.
pub trait ProcessProducer {
    fn produce(&mut self, now: SimTime) -> Vec<ProcessDescriptor>;
}

/// A fixed batch, handed over once.
impl ProcessProducer for Vec<ProcessDescriptor> {
    fn produce(&mut self, _now: SimTime) -> Vec<ProcessDescriptor> {
        std::mem::take(self)
    }
}

/// Seeded random batches: bursts drawn from a range (rounded to 0.1s),
/// priorities uniform over 0..=10, pids counting up.
pub struct SyntheticProducer {
    rng: StdRng,
    batch: usize,
    burst: Range<SimTime>,
    next_pid: Pid,
}

impl SyntheticProducer {
    pub fn new(seed: u64, batch: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            batch,
            burst: 1.0..5.0,
            next_pid: 1,
        }
    }

    pub fn with_burst_range(mut self, burst: Range<SimTime>) -> Self {
        self.burst = burst;
        self
    }

    pub fn starting_at(mut self, pid: Pid) -> Self {
        self.next_pid = pid.max(1);
        self
    }
}

impl ProcessProducer for SyntheticProducer {
    fn produce(&mut self, now: SimTime) -> Vec<ProcessDescriptor> {
        let mut batch = Vec::with_capacity(self.batch);
        for _ in 0..self.batch {
            let pid = self.next_pid;
            self.next_pid += 1;

            let burst = self.rng.random_range(self.burst.clone());
            let burst = ((burst * 10.0).round() / 10.0).max(0.1);
            let priority = self.rng.random_range(0..=MAX_PRIORITY);

            batch.push(
                ProcessDescriptor::new(pid, format!("proc{pid}"), burst)
                    .arriving_at(now)
                    .with_priority(priority),
            );
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_batches_are_reproducible() {
        let a = SyntheticProducer::new(7, 5).produce(0.0);
        let b = SyntheticProducer::new(7, 5).produce(0.0);
        assert_eq!(a, b);
    }

    #[test]
    fn synthetic_values_stay_in_range() {
        let mut producer = SyntheticProducer::new(1, 50)
            .with_burst_range(2.0..8.0)
            .starting_at(100);
        let batch = producer.produce(3.5);

        assert_eq!(batch.len(), 50);
        assert_eq!(batch[0].pid, 100);
        assert_eq!(batch[49].pid, 149);
        for d in &batch {
            assert!((2.0..=8.0).contains(&d.burst_time));
            assert!(d.priority <= MAX_PRIORITY);
            assert_eq!(d.arrival_time, Some(3.5));
        }

        // pids keep counting across batches
        assert_eq!(producer.produce(4.0)[0].pid, 150);
    }

    #[test]
    fn fixed_batch_is_handed_over_once() {
        let mut fixed = vec![ProcessDescriptor::new(1, "a", 1.0)];
        assert_eq!(fixed.produce(0.0).len(), 1);
        assert!(fixed.produce(0.0).is_empty());
    }
}
