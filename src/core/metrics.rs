use average::{Estimate, Mean};
use rustc_hash::FxHashMap;
use serde::Serialize;

use super::state::{Pid, SimTime};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletionRecord {
    pub pid: Pid,
    pub completion_time: SimTime,
    pub turnaround_time: SimTime,
    pub waiting_time: SimTime,
}

/// Append-only completion history. A pid that is re-submitted and finishes
/// again gets a second record; earlier ones are kept for reporting.
#[derive(Debug, Default)]
pub struct Metrics {
    records: Vec<CompletionRecord>,
    latest: FxHashMap<Pid, usize>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn complete(
        &mut self,
        pid: Pid,
        completion_time: SimTime,
        arrival_time: SimTime,
        burst_time: SimTime,
    ) -> CompletionRecord {
        let turnaround_time = completion_time - arrival_time;
        let record = CompletionRecord {
            pid,
            completion_time,
            turnaround_time,
            waiting_time: turnaround_time - burst_time,
        };
        self.latest.insert(pid, self.records.len());
        self.records.push(record);
        record
    }

    pub fn record(&self, pid: Pid) -> Option<&CompletionRecord> {
        self.latest.get(&pid).map(|&idx| &self.records[idx])
    }

    pub fn records(&self) -> &[CompletionRecord] {
        &self.records
    }

    pub fn completed_count(&self) -> usize {
        self.records.len()
    }

    pub fn average_waiting(&self) -> SimTime {
        if self.records.is_empty() {
            return 0.0;
        }
        avg(self.records.iter().map(|r| r.waiting_time))
    }

    pub fn average_turnaround(&self) -> SimTime {
        if self.records.is_empty() {
            return 0.0;
        }
        avg(self.records.iter().map(|r| r.turnaround_time))
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.latest.clear();
    }
}

fn avg(iter: impl Iterator<Item = f64>) -> f64 {
    iter.collect::<Mean>().estimate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_turnaround_and_waiting() {
        let mut metrics = Metrics::new();
        let r = metrics.complete(1, 4.0, 0.0, 4.0);
        assert_eq!(r.turnaround_time, 4.0);
        assert_eq!(r.waiting_time, 0.0);

        let r = metrics.complete(2, 10.0, 1.0, 3.0);
        assert_eq!(r.turnaround_time, 9.0);
        assert_eq!(r.waiting_time, 6.0);

        assert_eq!(metrics.completed_count(), 2);
        assert_eq!(metrics.average_waiting(), 3.0);
        assert_eq!(metrics.average_turnaround(), 6.5);
    }

    #[test]
    fn empty_averages_are_zero() {
        let metrics = Metrics::new();
        assert_eq!(metrics.average_waiting(), 0.0);
        assert_eq!(metrics.completed_count(), 0);
    }

    #[test]
    fn resubmitted_pid_keeps_history() {
        let mut metrics = Metrics::new();
        metrics.complete(3, 5.0, 0.0, 2.0);
        metrics.complete(3, 9.0, 6.0, 2.0);

        assert_eq!(metrics.completed_count(), 2);
        assert_eq!(metrics.records()[0].completion_time, 5.0);
        assert_eq!(metrics.record(3).map(|r| r.completion_time), Some(9.0));
    }
}
