use super::Policy;
use crate::core::{COMPLETION_EPSILON, Process, SimTime};

pub struct RoundRobin {
    quantum: SimTime,
}

impl RoundRobin {
    pub fn new(quantum: SimTime) -> Self {
        Self { quantum }
    }
}

impl Policy for RoundRobin {
    fn slice(&self, head: &Process, tick: SimTime) -> SimTime {
        let quantum_left = (self.quantum - head.quantum_used).max(0.0);
        tick.min(quantum_left).min(head.remaining_time)
    }

    fn charge(&self, head: &mut Process, executed: SimTime) {
        head.quantum_used += executed;
    }

    fn preempt(&self, head: &Process) -> bool {
        head.quantum_used >= self.quantum - COMPLETION_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_is_capped_by_quantum_left() {
        let rr = RoundRobin::new(0.25);
        let mut p = Process::new(1, "p", 10.0, 0.0);

        assert_eq!(rr.slice(&p, 0.1), 0.1);
        p.quantum_used = 0.2;
        assert!((rr.slice(&p, 0.1) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn slice_is_capped_by_remaining_time() {
        let rr = RoundRobin::new(1.0);
        let p = Process::new(1, "p", 0.04, 0.0);
        assert_eq!(rr.slice(&p, 0.1), 0.04);
    }

    #[test]
    fn preempts_once_quantum_is_spent() {
        let rr = RoundRobin::new(0.3);
        let mut p = Process::new(1, "p", 10.0, 0.0);
        for _ in 0..2 {
            let slice = rr.slice(&p, 0.1);
            let executed = p.run_for(slice);
            rr.charge(&mut p, executed);
            assert!(!rr.preempt(&p));
        }
        let slice = rr.slice(&p, 0.1);
        let executed = p.run_for(slice);
        rr.charge(&mut p, executed);
        assert!(rr.preempt(&p));
    }
}
