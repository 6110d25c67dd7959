pub mod driver;
pub mod event;
pub mod metrics;
pub mod observer;
pub mod state;
pub mod timeline;

pub use driver::SimCore;
pub use event::{CompletionEntry, SimEvent};
pub use metrics::{CompletionRecord, Metrics};
pub use observer::Observer;
pub use state::{
    COMPLETION_EPSILON, DEFAULT_PRIORITY, ExecutionUnit, MAX_PRIORITY, Pid, Priority, Process,
    ProcessDescriptor, SchedState, SimTime, Ticks, UnitId, validate_quantum,
};
pub use timeline::{ColorKey, MERGE_TOLERANCE, Timeline, TimelineSegment};
