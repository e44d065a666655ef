//! Structured diagnostics written to the SQLite `event_log` table.
//!
//! Every row is also mirrored to the process logger so events show up on
//! stderr without querying the database.

use r2d2_sqlite::rusqlite::{params, Connection};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// Severity of a diagnostics row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

impl EventLevel {
    /// Stable label stored in the `level` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    fn as_log(self) -> log::Level {
        match self {
            Self::Info => log::Level::Info,
            Self::Warn => log::Level::Warn,
            Self::Error => log::Level::Error,
        }
    }
}

pub fn log_event(
    conn: &Connection,
    level: EventLevel,
    code: Option<&str>,
    module: &str,
    message: &str,
    explain: Option<&str>,
    data: Option<Value>,
) -> rusqlite::Result<()> {
    log::log!(level.as_log(), "[{module}] {message}");
    let id = Uuid::new_v4().to_string();
    let ts = OffsetDateTime::now_utc().unix_timestamp();
    let data_str = data.map(|v| v.to_string());
    conn.execute(
        "INSERT INTO event_log (id, ts, level, code, module, message, explain, data) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![id, ts, level.as_str(), code, module, message, explain, data_str],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_stable_labels() {
        assert_eq!(EventLevel::Info.as_str(), "info");
        assert_eq!(EventLevel::Warn.as_str(), "warn");
        assert_eq!(EventLevel::Error.as_str(), "error");
    }

    #[test]
    fn log_event_inserts_row() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../migrations/0001_init.sql"
        )))
        .unwrap();
        log_event(
            &conn,
            EventLevel::Info,
            Some("SES-0000"),
            "session",
            "session created",
            None,
            Some(serde_json::json!({ "id": "abc" })),
        )
        .unwrap();
        let level: String = conn
            .query_row("SELECT level FROM event_log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(level, "info");
        let count: i64 = conn
            .query_row("SELECT COUNT(1) FROM event_log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
