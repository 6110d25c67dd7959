use super::Policy;

/// Queue order is whatever dispatch produced; the head runs until it finishes.
pub struct Fcfs;

impl Policy for Fcfs {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Process;
    use std::collections::VecDeque;

    #[test]
    fn keeps_queue_order_and_never_preempts() {
        let mut queue: VecDeque<Process> = [(1, 5.0), (2, 1.0), (3, 3.0)]
            .into_iter()
            .map(|(pid, burst)| Process::new(pid, format!("p{pid}"), burst, 0.0))
            .collect();

        Fcfs.reorder(&mut queue);
        let order: Vec<_> = queue.iter().map(|p| p.pid).collect();
        assert_eq!(order, vec![1, 2, 3]);

        let head = &mut queue[0];
        assert_eq!(Fcfs.slice(head, 0.1), 0.1);
        head.run_for(0.1);
        assert!(!Fcfs.preempt(head));
    }
}
