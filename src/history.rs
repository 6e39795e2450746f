use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::session::{LoggedExercise, SessionLog};

/// Accepts finished session logs
pub trait LogSink {
    fn persist(&mut self, log: &SessionLog) -> Result<()>;
}

impl LogSink for Vec<SessionLog> {
    fn persist(&mut self, log: &SessionLog) -> Result<()> {
        self.push(log.clone());
        Ok(())
    }
}

/// SQLite store for session logs
#[derive(Debug)]
pub struct SqliteLogStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteLogStore {
    /// Open (or create) the store at `path`, creating parent directories
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS session_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                plan_id TEXT NOT NULL,
                title TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                completed_at TEXT NOT NULL,
                total_volume REAL NOT NULL,
                exercises TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_session_logs_plan ON session_logs(plan_id)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_session_logs_completed_at ON session_logs(completed_at)",
            [],
        )?;

        Ok(Self { conn, path })
    }

    /// Database file backing this store, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record_log(&self, log: &SessionLog) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO session_logs
            (plan_id, title, duration_secs, completed_at, total_volume, exercises)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                log.plan_id,
                log.title,
                log.duration_secs as i64,
                log.completed_at.with_timezone(&Utc).to_rfc3339(),
                log.total_volume,
                serde_json::to_string(&log.exercises)?,
            ],
        )?;
        Ok(())
    }

    /// Most recent logs first
    pub fn recent_logs(&self, limit: usize) -> Result<Vec<SessionLog>> {
        self.query_logs(
            "SELECT plan_id, title, duration_secs, completed_at, total_volume, exercises
             FROM session_logs ORDER BY completed_at DESC, id DESC LIMIT ?1",
            params![limit as i64],
        )
    }

    pub fn logs_for_plan(&self, plan_id: &str) -> Result<Vec<SessionLog>> {
        self.query_logs(
            "SELECT plan_id, title, duration_secs, completed_at, total_volume, exercises
             FROM session_logs WHERE plan_id = ?1 ORDER BY completed_at DESC, id DESC",
            params![plan_id],
        )
    }

    pub fn log_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM session_logs", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Sum of total volume over every stored session
    pub fn lifetime_volume(&self) -> Result<f64> {
        let volume: Option<f64> =
            self.conn
                .query_row("SELECT SUM(total_volume) FROM session_logs", [], |row| {
                    row.get(0)
                })?;
        Ok(volume.unwrap_or(0.0))
    }

    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM session_logs", [])?;
        Ok(())
    }

    /// Write every stored log as CSV, one row per completed set, oldest first
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let logs = self.query_logs(
            "SELECT plan_id, title, duration_secs, completed_at, total_volume, exercises
             FROM session_logs ORDER BY completed_at ASC, id ASC",
            [],
        )?;

        let mut wtr = csv::Writer::from_writer(writer);
        let mut rows = 0;
        for log in &logs {
            for (exercise, set_index, set) in log.exercises.iter().flat_map(|e| {
                e.sets
                    .iter()
                    .enumerate()
                    .map(move |(i, s)| (e.name.as_str(), i + 1, s))
            }) {
                wtr.serialize(CsvRow {
                    completed_at: log.completed_at.to_rfc3339(),
                    plan_id: &log.plan_id,
                    title: &log.title,
                    duration_secs: log.duration_secs,
                    exercise,
                    set: set_index,
                    reps: set.reps,
                    load: set.load,
                    volume: set.load * set.reps as f64,
                })?;
                rows += 1;
            }
        }
        wtr.flush()?;
        info!(rows, "exported session history");
        Ok(rows)
    }

    fn query_logs<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<SessionLog>> {
        let mut stmt = self.conn.prepare(sql)?;

        let rows = stmt.query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut logs = Vec::new();
        for row in rows {
            let (plan_id, title, duration_secs, completed_at, total_volume, exercises) = row?;
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        3,
                        "completed_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);
            let exercises: Vec<LoggedExercise> = serde_json::from_str(&exercises)?;

            logs.push(SessionLog {
                plan_id,
                title,
                duration_secs: duration_secs.max(0) as u64,
                completed_at,
                exercises,
                total_volume,
            });
        }

        Ok(logs)
    }
}

impl LogSink for SqliteLogStore {
    fn persist(&mut self, log: &SessionLog) -> Result<()> {
        self.record_log(log)?;
        info!(plan = %log.plan_id, "session log stored");
        Ok(())
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    completed_at: String,
    plan_id: &'a str,
    title: &'a str,
    duration_secs: u64,
    exercise: &'a str,
    set: usize,
    reps: u32,
    load: f64,
    volume: f64,
}
