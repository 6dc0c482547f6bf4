//! Leveled logging for a database-access layer.
//!
//! A [`LogCollector`] filters messages by [`SeverityLevel`] and forwards the
//! rest to a pluggable [`Sink`]. [`QueryStatus`] renders the report emitted
//! after each executed query.
//!
//! ```
//! use std::sync::Arc;
//! use querylog::{args, LogCollector, MemorySink, SeverityLevel};
//!
//! let sink = Arc::new(MemorySink::new());
//! let collector = LogCollector::with_level(SeverityLevel::Info);
//! collector.set_sink(sink.clone());
//!
//! collector.info("opened %s", &args!["users.db"]);
//! assert_eq!(sink.records()[0].message(), "INFO\nopened users.db");
//! ```

// Core infrastructure modules
pub mod core;

// Feature-specific modules
pub mod collector;
pub mod config;
pub mod context;
pub mod format;
pub mod level;
pub mod sink;
pub mod status;

pub use collector::{log, LogCollector, LEVEL_ENV_VAR};
pub use context::RequestContext;
pub use format::{sprintf, Value};
pub use level::SeverityLevel;
pub use sink::{default_sink, MemorySink, Sink, TracingSink, WriterSink};
pub use status::QueryStatus;
