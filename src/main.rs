use chrono::Utc;
use querylog::config::{self, Config};
use querylog::core::{QueryLogError, Result};
use querylog::{log, QueryStatus, RequestContext, SeverityLevel, TracingSink, Value, LEVEL_ENV_VAR};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str =
    "usage: querylog [--tracing] [--config PATH] [--level LEVEL] <db_path> <sql>...";

/// Parsed command line.
#[derive(Debug, PartialEq)]
struct Options {
    tracing: bool,
    config: Option<PathBuf>,
    level: Option<SeverityLevel>,
    db_path: String,
    statements: Vec<String>,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut tracing = false;
    let mut config = None;
    let mut level = None;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--tracing" => tracing = true,
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| QueryLogError::Config("--config needs a path".to_string()))?;
                config = Some(PathBuf::from(path));
            }
            "--level" => {
                let name = iter
                    .next()
                    .ok_or_else(|| QueryLogError::Config("--level needs a value".to_string()))?;
                level = Some(name.parse()?);
            }
            _ => positional.push(arg.clone()),
        }
    }

    let mut positional = positional.into_iter();
    let db_path = positional
        .next()
        .ok_or_else(|| QueryLogError::Config(USAGE.to_string()))?;
    let statements: Vec<String> = positional.collect();
    if statements.is_empty() {
        return Err(QueryLogError::Config(USAGE.to_string()));
    }

    Ok(Options {
        tracing,
        config,
        level,
        db_path,
        statements,
    })
}

/// What a statement produced.
enum Execution {
    Rows,
    Changes { rows: i64, last_insert_id: Option<i64> },
}

fn execute(conn: &Connection, sql: &str) -> rusqlite::Result<Execution> {
    let mut stmt = conn.prepare(sql)?;
    let column_count = stmt.column_count();
    if column_count > 0 {
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let values = (0..column_count)
                .map(|i| row.get_ref(i).map(|v| Value::from(v).to_string()))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            println!("{}", values.join("|"));
        }
        return Ok(Execution::Rows);
    }

    let rows = stmt.execute([])? as i64;
    let is_insert = sql.trim_start().to_uppercase().starts_with("INSERT");
    Ok(Execution::Changes {
        rows,
        last_insert_id: is_insert.then(|| conn.last_insert_rowid()),
    })
}

/// Runs every statement, logging a report for each. Returns false if any failed.
fn run(options: Options) -> Result<bool> {
    let collector = log();

    let config_path = options
        .config
        .clone()
        .or_else(|| config::default_config_path().filter(|p| p.exists()));
    if let Some(path) = config_path {
        let config: Config = config::load_config(&path)?;
        let env_value = std::env::var(LEVEL_ENV_VAR).ok();
        config.log.apply_with_env(collector, env_value.as_deref());
    }
    if options.tracing {
        collector.set_sink(Arc::new(TracingSink));
    }
    if let Some(level) = options.level {
        collector.set_level(level);
    }

    info!("Opening database {}", options.db_path);
    let conn = Connection::open(&options.db_path)?;
    let context = RequestContext::new();
    let session_id = 1;
    let mut next_tx = 0;
    let mut current_tx = 0;
    let mut all_ok = true;

    for sql in &options.statements {
        let was_in_tx = !conn.is_autocommit();
        let start = Utc::now();
        let outcome = execute(&conn, sql);
        let end = Utc::now();
        let in_tx = !conn.is_autocommit();

        if in_tx && !was_in_tx {
            next_tx += 1;
            current_tx = next_tx;
        }

        let mut builder = QueryStatus::builder()
            .session_id(session_id)
            .tx_id(if was_in_tx || in_tx { current_tx } else { 0 })
            .query(sql.as_str())
            .start(start)
            .end(end)
            .context(context.clone());

        let level = match outcome {
            Ok(Execution::Rows) => SeverityLevel::Debug,
            Ok(Execution::Changes { rows, last_insert_id }) => {
                builder = builder.rows_affected(rows);
                if let Some(id) = last_insert_id {
                    builder = builder.last_insert_id(id);
                }
                SeverityLevel::Debug
            }
            Err(err) => {
                all_ok = false;
                builder = builder.error(err);
                SeverityLevel::Error
            }
        };
        collector.log_status(level, &builder.build());

        if !in_tx {
            current_tx = 0;
        }
    }

    Ok(all_ok)
}

fn main() {
    // Diagnostics go to stderr so stdout only carries results and reports.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    match run(options) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("querylog: {}", e);
            std::process::exit(2);
        }
    }
}
