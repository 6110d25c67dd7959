use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    core::{SimTime, validate_quantum},
    error::{Result, SimError},
    scheduler::{DEFAULT_QUANTUM, DEFAULT_THRESHOLD, DispatchParams},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub units: usize,
    /// Simulated seconds advanced per tick.
    pub tick_size: SimTime,
    pub threshold: u8,
    pub default_quantum: SimTime,
    /// Simulated seconds between re-admission checks.
    pub readmit_interval: SimTime,
    /// Wall-clock sleep between ticks while running.
    pub poll_interval_ms: u64,
    /// Wall-clock sleep while paused or stopped.
    pub idle_interval_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            units: 4,
            tick_size: 0.1,
            threshold: DEFAULT_THRESHOLD,
            default_quantum: DEFAULT_QUANTUM,
            readmit_interval: 0.5,
            poll_interval_ms: 10,
            idle_interval_ms: 100,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.units == 0 {
            return Err(SimError::InvalidConfig("at least one execution unit is required"));
        }
        if !(self.tick_size.is_finite() && self.tick_size > 0.0) {
            return Err(SimError::InvalidConfig("tick size must be positive"));
        }
        if !(self.readmit_interval.is_finite() && self.readmit_interval > 0.0) {
            return Err(SimError::InvalidConfig("re-admission interval must be positive"));
        }
        validate_quantum(self.default_quantum)?;
        self.dispatch_params().map(|_| ())
    }

    pub fn dispatch_params(&self) -> Result<DispatchParams> {
        DispatchParams::new(self.threshold, self.default_quantum)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.units, 4);
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
    }

    #[test]
    fn rejects_bad_values() {
        let bad = |f: fn(&mut SimConfig)| {
            let mut config = SimConfig::default();
            f(&mut config);
            config.validate()
        };
        assert!(matches!(bad(|c| c.units = 0), Err(SimError::InvalidConfig(_))));
        assert!(matches!(bad(|c| c.tick_size = 0.0), Err(SimError::InvalidConfig(_))));
        assert_eq!(bad(|c| c.threshold = 12), Err(SimError::InvalidThreshold(12)));
        assert_eq!(
            bad(|c| c.default_quantum = -1.0),
            Err(SimError::InvalidQuantum(-1.0))
        );
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{ "units": 2, "tick_size": 0.5 }"#).unwrap();
        assert_eq!(config.units, 2);
        assert_eq!(config.tick_size, 0.5);
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.readmit_interval, 0.5);
    }
}
