//! The logging façade: a severity threshold plus a sink.
use crate::format::Value;
use crate::level::{SeverityLevel, DEFAULT_LEVEL};
use crate::sink::{default_sink, Sink};
use crate::status::QueryStatus;
use once_cell::sync::Lazy;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Environment variable naming the starting level of the default collector.
pub const LEVEL_ENV_VAR: &str = "UPPER_DB_LOG";

struct Settings {
    level: SeverityLevel,
    sink: Option<Arc<dyn Sink>>,
}

/// Filters messages by severity and forwards the survivors to a [`Sink`].
///
/// Collectors are cheap to build; construct one per component and share it
/// through an `Arc`, or use the process-wide instance returned by [`log`].
pub struct LogCollector {
    settings: RwLock<Settings>,
}

impl LogCollector {
    /// Creates a collector at the default threshold (WARN) using the default sink.
    pub fn new() -> Self {
        Self::with_level(DEFAULT_LEVEL)
    }

    pub fn with_level(level: SeverityLevel) -> Self {
        LogCollector {
            settings: RwLock::new(Settings { level, sink: None }),
        }
    }

    /// Creates a collector whose threshold comes from [`LEVEL_ENV_VAR`].
    pub fn from_env() -> Self {
        let value = std::env::var(LEVEL_ENV_VAR).ok();
        Self::with_level(level_from_env_value(value.as_deref()))
    }

    pub fn set_level(&self, level: SeverityLevel) {
        self.write().level = level;
    }

    pub fn level(&self) -> SeverityLevel {
        self.read().level
    }

    pub fn set_sink(&self, sink: Arc<dyn Sink>) {
        self.write().sink = Some(sink);
    }

    /// Returns the configured sink, or the default sink when none is set.
    pub fn sink(&self) -> Arc<dyn Sink> {
        self.read().sink.clone().unwrap_or_else(default_sink)
    }

    /// Drops the configured sink so the default one is used again.
    pub fn reset_sink(&self) {
        self.write().sink = None;
    }

    /// Whether a message at `level` would reach the sink.
    pub fn enabled(&self, level: SeverityLevel) -> bool {
        level >= self.level()
    }

    pub fn trace(&self, template: &str, args: &[Value]) {
        self.log(SeverityLevel::Trace, template, args);
    }

    pub fn debug(&self, template: &str, args: &[Value]) {
        self.log(SeverityLevel::Debug, template, args);
    }

    pub fn info(&self, template: &str, args: &[Value]) {
        self.log(SeverityLevel::Info, template, args);
    }

    pub fn warn(&self, template: &str, args: &[Value]) {
        self.log(SeverityLevel::Warn, template, args);
    }

    pub fn error(&self, template: &str, args: &[Value]) {
        self.log(SeverityLevel::Error, template, args);
    }

    /// Logs at FATAL; with the default sink the process exits afterwards.
    pub fn fatal(&self, template: &str, args: &[Value]) {
        self.log(SeverityLevel::Fatal, template, args);
    }

    /// Logs at PANIC; with the default sink the call unwinds afterwards.
    pub fn panic(&self, template: &str, args: &[Value]) {
        self.log(SeverityLevel::Panic, template, args);
    }

    /// Emits a rendered query report. The report is passed as an argument so
    /// `%` characters in the SQL are not read as directives.
    pub fn log_status(&self, level: SeverityLevel, status: &QueryStatus) {
        self.log(level, "%s", &[Value::Text(status.render())]);
    }

    /// Dispatches one message.
    ///
    /// The message is dropped when `level` is below the threshold. Otherwise
    /// the template is prefixed with the level name and handed to exactly one
    /// sink method: `panic_print` for PANIC, `fatal_print` for FATAL and
    /// `print` for everything else.
    pub fn log(&self, level: SeverityLevel, template: &str, args: &[Value]) {
        let sink = {
            let settings = self.read();
            if level < settings.level {
                return;
            }
            settings.sink.clone().unwrap_or_else(default_sink)
        };

        let template = format!("{}\n{}", level.name(), template);
        if level >= SeverityLevel::Panic {
            sink.panic_print(&template, args);
        } else if level >= SeverityLevel::Fatal {
            sink.fatal_print(&template, args);
        } else {
            sink.print(&template, args);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Settings> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Settings> {
        self.settings.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LogCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LogCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let settings = self.read();
        f.debug_struct("LogCollector")
            .field("level", &settings.level)
            .field("custom_sink", &settings.sink.is_some())
            .finish()
    }
}

/// Resolves the value of [`LEVEL_ENV_VAR`] to a starting level.
///
/// Unset or unrecognized values leave the default (WARN) in place.
pub fn level_from_env_value(value: Option<&str>) -> SeverityLevel {
    match value {
        None => DEFAULT_LEVEL,
        Some(name) => match name.parse::<SeverityLevel>() {
            Ok(level) => {
                debug!(%level, "log level set from {}", LEVEL_ENV_VAR);
                level
            }
            Err(err) => {
                warn!("ignoring {}: {}", LEVEL_ENV_VAR, err);
                DEFAULT_LEVEL
            }
        },
    }
}

static DEFAULT_COLLECTOR: Lazy<LogCollector> = Lazy::new(LogCollector::from_env);

/// Returns the process-wide collector.
///
/// It is built on first use, reading [`LEVEL_ENV_VAR`] exactly once.
pub fn log() -> &'static LogCollector {
    &DEFAULT_COLLECTOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::sink::{MemorySink, SinkCall};

    fn collector_with_memory(level: SeverityLevel) -> (LogCollector, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let collector = LogCollector::with_level(level);
        collector.set_sink(sink.clone());
        (collector, sink)
    }

    #[test]
    fn test_defaults() {
        let collector = LogCollector::new();
        assert_eq!(collector.level(), SeverityLevel::Warn);
        assert!(Arc::ptr_eq(&collector.sink(), &default_sink()));
    }

    #[test]
    fn test_below_threshold_is_suppressed() {
        let (collector, sink) = collector_with_memory(SeverityLevel::Error);
        collector.trace("t", &[]);
        collector.debug("d", &[]);
        collector.info("i", &[]);
        collector.warn("w", &[]);
        assert!(sink.records().is_empty());

        collector.error("e", &[]);
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn test_error_routes_to_custom_sink() {
        let (collector, sink) = collector_with_memory(SeverityLevel::Warn);
        collector.error("x=%d", &args![5]);

        let records = sink.take();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].call, SinkCall::Print);
        assert_eq!(records[0].template, "ERROR\nx=%d");
        assert_eq!(records[0].args, args![5]);
        assert_eq!(records[0].message(), "ERROR\nx=5");
    }

    #[test]
    fn test_escalation_is_exclusive() {
        let (collector, sink) = collector_with_memory(SeverityLevel::Trace);
        collector.fatal("f", &[]);
        collector.panic("p", &[]);

        let records = sink.take();
        let calls: Vec<SinkCall> = records.iter().map(|r| r.call).collect();
        assert_eq!(calls, vec![SinkCall::Fatal, SinkCall::Panic]);
        assert_eq!(records[0].template, "FATAL\nf");
        assert_eq!(records[1].template, "PANIC\np");
    }

    #[test]
    fn test_label_follows_call_level() {
        let (collector, sink) = collector_with_memory(SeverityLevel::Debug);
        collector.info("hello", &[]);
        assert_eq!(sink.take()[0].template, "INFO\nhello");
    }

    #[test]
    fn test_log_status_protects_percent_signs() {
        let (collector, sink) = collector_with_memory(SeverityLevel::Debug);
        let status = QueryStatus::builder()
            .query("SELECT * FROM t WHERE name LIKE '%d'")
            .build();
        collector.log_status(SeverityLevel::Debug, &status);

        let records = sink.take();
        let record = &records[0];
        assert_eq!(record.template, "DEBUG\n%s");
        assert_eq!(record.message(), format!("DEBUG\n{}", status.render()));
    }

    #[test]
    fn test_reset_sink() {
        let (collector, _sink) = collector_with_memory(SeverityLevel::Warn);
        assert!(!Arc::ptr_eq(&collector.sink(), &default_sink()));
        collector.reset_sink();
        assert!(Arc::ptr_eq(&collector.sink(), &default_sink()));
    }

    #[test]
    fn test_enabled() {
        let collector = LogCollector::with_level(SeverityLevel::Info);
        assert!(!collector.enabled(SeverityLevel::Debug));
        assert!(collector.enabled(SeverityLevel::Info));
        assert!(collector.enabled(SeverityLevel::Panic));
    }

    #[test]
    fn test_level_from_env_value() {
        assert_eq!(level_from_env_value(None), SeverityLevel::Warn);
        assert_eq!(level_from_env_value(Some("verbose")), SeverityLevel::Warn);
        assert_eq!(level_from_env_value(Some("debug")), SeverityLevel::Warn);
        assert_eq!(level_from_env_value(Some("DEBUG")), SeverityLevel::Debug);
        assert_eq!(level_from_env_value(Some("WARNING")), SeverityLevel::Warn);
        assert_eq!(level_from_env_value(Some("TRACE")), SeverityLevel::Trace);
    }
}
