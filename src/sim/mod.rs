pub mod engine;
pub mod producer;
pub mod sink;
pub mod snapshot;

pub use engine::Engine;
pub use producer::{ProcessProducer, SyntheticProducer};
pub use sink::{CompletionSink, FileSink, MemorySink};
pub use snapshot::{MetricsSnapshot, QueuedProcess, RunState, Status, UnitSnapshot};
