//! Assembly event sinks.
//!
//! The assembler reports its progress as named events with an optional JSON
//! payload: `assembly.started`, `stage.added`, `action.declared`, then
//! `assembly.completed` or `assembly.failed`.

mod sink;

pub use sink::{AssemblyEventSink, CollectingEventSink, LoggingEventSink, NoOpEventSink};
