//! Query report rendering against real SQLite executions.

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use querylog::{args, LogCollector, MemorySink, QueryStatus, RequestContext, SeverityLevel};
    use rusqlite::Connection;
    use std::sync::Arc;

    fn query_line(report: &str) -> Option<String> {
        report
            .lines()
            .find_map(|l| l.strip_prefix("\tQuery:          ").map(str::to_string))
    }

    proptest! {
        #[test]
        fn prop_query_whitespace_is_collapsed(
            words in prop::collection::vec("[A-Za-z0-9_*=]{1,8}", 1..8),
            gaps in prop::collection::vec("[ \t\r\n]{1,4}", 8),
            lead in "[ \t\r\n]{0,3}",
            trail in "[ \t\r\n]{0,3}",
        ) {
            let mut sql = lead.clone();
            for (i, word) in words.iter().enumerate() {
                if i > 0 {
                    sql.push_str(&gaps[i]);
                }
                sql.push_str(word);
            }
            sql.push_str(&trail);

            let status = QueryStatus::builder().query(sql).build();
            prop_assert_eq!(query_line(&status.render()), Some(words.join(" ")));
        }

        #[test]
        fn prop_render_shape(
            session in 0u64..100_000,
            tx in 0u64..100_000,
            millis in 0i64..10_000,
        ) {
            let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let status = QueryStatus::builder()
                .session_id(session)
                .tx_id(tx)
                .start(start)
                .end(start + Duration::milliseconds(millis))
                .build();
            let report = status.render();

            prop_assert!(report.starts_with('\t'));
            prop_assert!(report.ends_with("\n\n"));
            prop_assert_eq!(report.contains("Session ID:"), session > 0);
            prop_assert_eq!(report.contains("Transaction ID:"), tx > 0);
            let expected_time = format!("\tTime taken:     {:.5}s\n", millis as f64 / 1000.0);
            prop_assert!(report.contains(&expected_time));
        }
    }

    #[test]
    fn test_report_for_sqlite_insert() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)")
            .unwrap();

        let sql = "INSERT INTO users (name, age)\n    VALUES (?1, ?2)";
        let start = Utc::now();
        let rows = conn.execute(sql, ("alice", 30)).unwrap();
        let end = Utc::now();

        let ctx = RequestContext::new();
        let status = QueryStatus::builder()
            .session_id(3)
            .query(sql)
            .args(args!["alice", 30])
            .rows_affected(rows as i64)
            .last_insert_id(conn.last_insert_rowid())
            .start(start)
            .end(end)
            .context(ctx.clone())
            .build();
        let report = status.render();

        assert!(report.contains("\tSession ID:     00003\n"));
        assert!(report
            .contains("\tQuery:          INSERT INTO users (name, age) VALUES (?1, ?2)\n"));
        assert!(report.contains("\tArguments:      [\"alice\", 30]\n"));
        assert!(report.contains("\tRows affected:  1\n"));
        assert!(report.contains("\tLast insert ID: 1\n"));
        assert!(report.contains(&format!("\tContext:        request={}", ctx.request_id())));
        assert!(!report.contains("Transaction ID"));
        assert!(!report.contains("Error:"));
    }

    #[test]
    fn test_report_for_sqlite_error() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn.execute("DELETE FROM missing", []).unwrap_err();
        let message = err.to_string();

        let status = QueryStatus::builder()
            .session_id(1)
            .tx_id(2)
            .query("DELETE FROM missing")
            .error(err)
            .build();

        let sink = Arc::new(MemorySink::new());
        let collector = LogCollector::with_level(SeverityLevel::Debug);
        collector.set_sink(sink.clone());
        collector.log_status(SeverityLevel::Error, &status);

        let logged = sink.take()[0].message();
        assert!(logged.starts_with("ERROR\n\tSession ID:     00001\n\tTransaction ID: 00002\n"));
        assert!(logged.contains(&format!("\tError:          {}\n", message)));
        assert!(message.contains("no such table"));
    }
}
