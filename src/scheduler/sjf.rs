use std::collections::VecDeque;

use super::Policy;
use crate::core::Process;

/// Shortest remaining time first, re-sorted every tick. A shorter process
/// dispatched into the queue overtakes the current head at the next tick.
pub struct Sjf;

impl Policy for Sjf {
    fn reorder(&self, queue: &mut VecDeque<Process>) {
        // Stable: equal remaining times keep their queue order
        queue
            .make_contiguous()
            .sort_by(|a, b| a.remaining_time.total_cmp(&b.remaining_time));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(times: &[(u32, f64)]) -> VecDeque<Process> {
        times
            .iter()
            .map(|&(pid, remaining)| Process::new(pid, format!("p{pid}"), remaining, 0.0))
            .collect()
    }

    #[test]
    fn picks_shortest_remaining() {
        let mut q = queue(&[(1, 5.0), (2, 2.0), (3, 8.0)]);
        Sjf.reorder(&mut q);
        assert_eq!(q.front().map(|p| p.pid), Some(2));
        let order: Vec<_> = q.iter().map(|p| p.pid).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn ties_keep_queue_order() {
        let mut q = queue(&[(4, 3.0), (1, 3.0), (9, 1.0)]);
        Sjf.reorder(&mut q);
        let order: Vec<_> = q.iter().map(|p| p.pid).collect();
        assert_eq!(order, vec![9, 4, 1]);
    }

    #[test]
    fn uses_remaining_not_burst() {
        let mut q = queue(&[(1, 4.0), (2, 3.0)]);
        q[0].run_for(2.0);
        Sjf.reorder(&mut q);
        assert_eq!(q.front().map(|p| p.pid), Some(1));
    }
}
