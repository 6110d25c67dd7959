use rustc_hash::{FxHashMap, FxHasher};
use serde::{Serialize, Serializer};
use std::{
    fmt,
    hash::{Hash, Hasher},
};

use super::state::{Pid, SimTime, UnitId};

/// Slices closer than this to the end of the previous segment extend it.
pub const MERGE_TOLERANCE: SimTime = 0.05;

/// 24-bit color derived from the pid, constant for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorKey(u32);

impl ColorKey {
    pub fn for_pid(pid: Pid) -> Self {
        let mut hasher = FxHasher::default();
        pid.hash(&mut hasher);
        Self((hasher.finish() & 0x00FF_FFFF) as u32)
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        ((self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8)
    }
}

impl fmt::Display for ColorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

impl Serialize for ColorKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSegment {
    pub unit: UnitId,
    pub pid: Pid,
    pub start: SimTime,
    pub duration: SimTime,
    pub color: ColorKey,
}

impl TimelineSegment {
    pub fn end(&self) -> SimTime {
        self.start + self.duration
    }
}

#[derive(Debug, Default)]
pub struct Timeline {
    segments: Vec<TimelineSegment>,
    // Index of the newest segment per unit; only that one is ever extended
    last_by_unit: FxHashMap<UnitId, usize>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the slice was merged into the unit's newest segment.
    pub fn record(&mut self, unit: UnitId, pid: Pid, start: SimTime, duration: SimTime) -> bool {
        if let Some(&idx) = self.last_by_unit.get(&unit) {
            let last = &mut self.segments[idx];
            if last.pid == pid && (last.end() - start).abs() < MERGE_TOLERANCE {
                last.duration += duration;
                return true;
            }
        }

        self.last_by_unit.insert(unit, self.segments.len());
        self.segments.push(TimelineSegment {
            unit,
            pid,
            start,
            duration,
            color: ColorKey::for_pid(pid),
        });
        false
    }

    pub fn segments(&self) -> &[TimelineSegment] {
        &self.segments
    }

    /// Segments overlapping `[start, end]`, unclipped.
    pub fn window(&self, start: SimTime, end: SimTime) -> Vec<TimelineSegment> {
        self.segments
            .iter()
            .filter(|seg| seg.end() >= start && seg.start <= end)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.last_by_unit.clear();
    }
}
