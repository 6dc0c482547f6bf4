//! Output destinations for formatted log lines.
//!
//! A [`Sink`] owns the concrete output mechanism. The collector only holds an
//! `Arc<dyn Sink>` and never manages its lifecycle.
use crate::format::{sprintf, Value};
use chrono::Local;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Prefix written by the default sink before every message.
pub const DEFAULT_PREFIX: &str = "upper/db: ";

/// Capability interface for emitting formatted lines.
///
/// Every method receives the raw template and its arguments so that
/// implementations can forward both to a structured backend instead of the
/// substituted text.
pub trait Sink: Send + Sync {
    /// Emits the formatted line.
    fn print(&self, template: &str, args: &[Value]);

    /// Emits the formatted line, then terminates the process.
    fn fatal_print(&self, template: &str, args: &[Value]) {
        self.print(template, args);
        std::process::exit(1);
    }

    /// Emits the formatted line, then panics with the formatted message.
    fn panic_print(&self, template: &str, args: &[Value]) {
        let message = sprintf(template, args);
        self.print(template, args);
        panic!("{}", message);
    }
}

static DEFAULT_SINK: Lazy<Arc<dyn Sink>> =
    Lazy::new(|| Arc::new(WriterSink::stdout()) as Arc<dyn Sink>);

/// Returns the process-wide default sink, which writes to standard output.
pub fn default_sink() -> Arc<dyn Sink> {
    Arc::clone(&DEFAULT_SINK)
}

/// Writes one timestamped line per message to any `Write` implementation.
///
/// Line shape: `YYYY/MM/DD HH:MM:SS <prefix><message>`.
pub struct WriterSink<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl WriterSink<io::Stdout> {
    /// Sink writing to standard output with [`DEFAULT_PREFIX`].
    pub fn stdout() -> Self {
        WriterSink::new(io::stdout(), DEFAULT_PREFIX)
    }
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W, prefix: impl Into<String>) -> Self {
        WriterSink {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Consumes the sink and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn format_line(&self, message: &str) -> String {
        let mut line = format!(
            "{} {}{}",
            Local::now().format("%Y/%m/%d %H:%M:%S"),
            self.prefix,
            message
        );
        if !line.ends_with('\n') {
            line.push('\n');
        }
        line
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn print(&self, template: &str, args: &[Value]) {
        let line = self.format_line(&sprintf(template, args));
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        // A failed write has nowhere to be reported.
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }
}

/// Forwards messages to `tracing` under the `querylog` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn print(&self, template: &str, args: &[Value]) {
        tracing::info!(target: "querylog", "{}", sprintf(template, args));
    }

    fn fatal_print(&self, template: &str, args: &[Value]) {
        tracing::error!(target: "querylog", fatal = true, "{}", sprintf(template, args));
        std::process::exit(1);
    }

    fn panic_print(&self, template: &str, args: &[Value]) {
        let message = sprintf(template, args);
        tracing::error!(target: "querylog", panic = true, "{}", message);
        panic!("{}", message);
    }
}

/// Which sink method received a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkCall {
    Print,
    Fatal,
    Panic,
}

/// A call captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub call: SinkCall,
    pub template: String,
    pub args: Vec<Value>,
}

impl Record {
    /// The message as the default sink would have substituted it.
    pub fn message(&self) -> String {
        sprintf(&self.template, &self.args)
    }
}

/// Captures every call instead of writing it anywhere.
///
/// Escalating calls are recorded and then return normally, so the sink is
/// safe to use for the fatal and panic levels in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the captured calls, oldest first.
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Removes and returns the captured calls.
    pub fn take(&self) -> Vec<Record> {
        std::mem::take(&mut *self.records.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn push(&self, call: SinkCall, template: &str, args: &[Value]) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Record {
                call,
                template: template.to_string(),
                args: args.to_vec(),
            });
    }
}

impl Sink for MemorySink {
    fn print(&self, template: &str, args: &[Value]) {
        self.push(SinkCall::Print, template, args);
    }

    fn fatal_print(&self, template: &str, args: &[Value]) {
        self.push(SinkCall::Fatal, template, args);
    }

    fn panic_print(&self, template: &str, args: &[Value]) {
        self.push(SinkCall::Panic, template, args);
    }
}
