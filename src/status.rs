//! Query status reports.
//!
//! A [`QueryStatus`] captures one query execution and renders it into the
//! tab-indented, multi-line block the collector emits.
use crate::format::Value;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

// ASCII whitespace only; other spacing inside string literals is kept.
static INVISIBLE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\n\x0C]+").unwrap());

/// Opaque error attached to a report; only its `Display` form is used.
pub type QueryError = Arc<dyn Error + Send + Sync>;

/// Opaque request metadata attached to a report; only its `Display` form is used.
pub type QueryContext = Arc<dyn fmt::Display + Send + Sync>;

/// Metadata about one executed query.
///
/// Zero session and transaction ids mean "absent". Build one with
/// [`QueryStatus::builder`]; it is not mutated afterwards.
#[derive(Clone)]
pub struct QueryStatus {
    session_id: u64,
    tx_id: u64,
    rows_affected: Option<i64>,
    last_insert_id: Option<i64>,
    query: String,
    args: Vec<Value>,
    error: Option<QueryError>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    context: Option<QueryContext>,
}

impl QueryStatus {
    pub fn builder() -> QueryStatusBuilder {
        QueryStatusBuilder::default()
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn tx_id(&self) -> u64 {
        self.tx_id
    }

    pub fn rows_affected(&self) -> Option<i64> {
        self.rows_affected
    }

    pub fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.error.as_deref()
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Elapsed time in seconds at nanosecond resolution.
    pub fn seconds_taken(&self) -> f64 {
        let nanos = (self.end - self.start).num_nanoseconds().unwrap_or(i64::MAX);
        nanos as f64 / 1e9
    }

    /// Renders the report.
    ///
    /// Lines are only emitted for fields that are present, except the time
    /// taken, which is always there. Every line is indented with a tab and the
    /// block ends with an empty line.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(9);

        if self.session_id > 0 {
            lines.push(format!("Session ID:     {:05}", self.session_id));
        }
        if self.tx_id > 0 {
            lines.push(format!("Transaction ID: {:05}", self.tx_id));
        }
        if !self.query.is_empty() {
            let query = INVISIBLE_CHARS.replace_all(&self.query, " ");
            lines.push(format!("Query:          {}", query.trim()));
        }
        if !self.args.is_empty() {
            lines.push(format!("Arguments:      {:?}", self.args));
        }
        if let Some(rows) = self.rows_affected {
            lines.push(format!("Rows affected:  {}", rows));
        }
        if let Some(id) = self.last_insert_id {
            lines.push(format!("Last insert ID: {}", id));
        }
        if let Some(err) = &self.error {
            lines.push(format!("Error:          {}", err));
        }

        lines.push(format!("Time taken:     {:.5}s", self.seconds_taken()));

        if let Some(ctx) = &self.context {
            lines.push(format!("Context:        {}", ctx));
        }

        format!("\t{}\n\n", lines.join("\n").replace('\n', "\n\t"))
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Debug for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryStatus")
            .field("session_id", &self.session_id)
            .field("tx_id", &self.tx_id)
            .field("rows_affected", &self.rows_affected)
            .field("last_insert_id", &self.last_insert_id)
            .field("query", &self.query)
            .field("args", &self.args)
            .field("error", &self.error.as_ref().map(|e| e.to_string()))
            .field("start", &self.start)
            .field("end", &self.end)
            .field("context", &self.context.as_ref().map(|c| c.to_string()))
            .finish()
    }
}

/// Builder for [`QueryStatus`]. Start and end default to the time `build`
/// is called.
#[derive(Default)]
pub struct QueryStatusBuilder {
    session_id: u64,
    tx_id: u64,
    rows_affected: Option<i64>,
    last_insert_id: Option<i64>,
    query: String,
    args: Vec<Value>,
    error: Option<QueryError>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    context: Option<QueryContext>,
}

impl QueryStatusBuilder {
    pub fn session_id(mut self, id: u64) -> Self {
        self.session_id = id;
        self
    }

    pub fn tx_id(mut self, id: u64) -> Self {
        self.tx_id = id;
        self
    }

    pub fn rows_affected(mut self, rows: i64) -> Self {
        self.rows_affected = Some(rows);
        self
    }

    pub fn last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn error<E: Error + Send + Sync + 'static>(mut self, err: E) -> Self {
        self.error = Some(Arc::new(err));
        self
    }

    /// Attaches an error that is already shared.
    pub fn shared_error(mut self, err: QueryError) -> Self {
        self.error = Some(err);
        self
    }

    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn context<C: fmt::Display + Send + Sync + 'static>(mut self, ctx: C) -> Self {
        self.context = Some(Arc::new(ctx));
        self
    }

    pub fn build(self) -> QueryStatus {
        let now = Utc::now();
        let start = self.start.unwrap_or(now);
        QueryStatus {
            session_id: self.session_id,
            tx_id: self.tx_id,
            rows_affected: self.rows_affected,
            last_insert_id: self.last_insert_id,
            query: self.query,
            args: self.args,
            error: self.error,
            start,
            end: self.end.unwrap_or(now),
            context: self.context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_render_minimal_select() {
        let status = QueryStatus::builder()
            .session_id(7)
            .query("SELECT   1\n")
            .start(t0())
            .end(t0() + Duration::milliseconds(250))
            .build();

        assert_eq!(
            status.render(),
            "\tSession ID:     00007\n\tQuery:          SELECT 1\n\tTime taken:     0.25000s\n\n"
        );
    }

    #[test]
    fn test_render_all_fields() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let status = QueryStatus::builder()
            .session_id(12)
            .tx_id(3)
            .query("INSERT INTO t\r\n\t(a, b)   VALUES (?, ?)")
            .args(args![1, "x"])
            .rows_affected(1)
            .last_insert_id(42)
            .error(err)
            .start(t0())
            .end(t0() + Duration::nanoseconds(1_234_567))
            .context("request=abc")
            .build();

        let expected = [
            "\tSession ID:     00012",
            "\tTransaction ID: 00003",
            "\tQuery:          INSERT INTO t (a, b) VALUES (?, ?)",
            "\tArguments:      [1, \"x\"]",
            "\tRows affected:  1",
            "\tLast insert ID: 42",
            "\tError:          disk full",
            "\tTime taken:     0.00123s",
            "\tContext:        request=abc",
        ]
        .join("\n")
            + "\n\n";
        assert_eq!(status.render(), expected);
    }

    #[test]
    fn test_render_only_time_when_empty() {
        let status = QueryStatus::builder().start(t0()).end(t0()).build();
        assert_eq!(status.render(), "\tTime taken:     0.00000s\n\n");
    }

    #[test]
    fn test_argument_line_boundary() {
        let none = QueryStatus::builder().query("SELECT 1").build();
        assert!(!none.render().contains("Arguments:"));

        let one = QueryStatus::builder().query("SELECT ?").args(args![5]).build();
        assert!(one.render().contains("\tArguments:      [5]\n"));
    }

    #[test]
    fn test_zero_rows_affected_is_reported() {
        let status = QueryStatus::builder().rows_affected(0).build();
        assert!(status.render().contains("\tRows affected:  0\n"));
    }

    #[test]
    fn test_only_ascii_whitespace_is_collapsed() {
        let status = QueryStatus::builder()
            .query("SELECT 'a\u{00A0}\u{00A0}b',\x0C\t1\r\n")
            .build();
        assert!(status
            .render()
            .contains("\tQuery:          SELECT 'a\u{00A0}\u{00A0}b', 1\n"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let status = QueryStatus::builder()
            .session_id(1)
            .query(" UPDATE t SET a = 1 ")
            .rows_affected(2)
            .build();
        assert_eq!(status.render(), status.render());
        assert_eq!(status.to_string(), status.render());
    }

    #[test]
    fn test_large_ids_keep_all_digits() {
        let status = QueryStatus::builder().session_id(1_234_567).build();
        assert!(status.render().starts_with("\tSession ID:     1234567\n"));
    }
}
