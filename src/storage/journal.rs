//! SQLite journal of detector verdicts, with time-based retention.

use crate::error::Result;
use crate::model::ClassificationResult;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub ts_ms: i64,
    pub attack: bool,
    pub throughput_bps: f64,
    pub ratio_ce: f64,
    pub cwr_count: u64,
    pub features_json: String,
}

pub struct AlertStore {
    conn: Mutex<Connection>,
}

impl AlertStore {
    /// Open or create the journal at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS verdicts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ts INTEGER NOT NULL,
                attack INTEGER NOT NULL,
                throughput_bps REAL NOT NULL,
                ratio_ce REAL NOT NULL,
                cwr_count INTEGER NOT NULL,
                features_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_verdicts_ts ON verdicts(ts);
            "#,
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn record(&self, result: &ClassificationResult) -> Result<()> {
        let f = &result.features;
        let features_json = serde_json::to_string(f)?;
        self.conn.lock().execute(
            "INSERT INTO verdicts (ts, attack, throughput_bps, ratio_ce, cwr_count, features_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                f.timestamp.timestamp_millis(),
                result.label.is_attack(),
                f.throughput_bps,
                f.ratio_ce,
                f.cwr_count as i64,
                features_json
            ],
        )?;
        Ok(())
    }

    /// Most recent entries first.
    pub fn recent(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT ts, attack, throughput_bps, ratio_ce, cwr_count, features_json
             FROM verdicts ORDER BY ts DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(JournalEntry {
                ts_ms: row.get(0)?,
                attack: row.get(1)?,
                throughput_bps: row.get(2)?,
                ratio_ce: row.get(3)?,
                cwr_count: row.get::<_, i64>(4)?.max(0) as u64,
                features_json: row.get(5)?,
            })
        })?;
        let entries = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM verdicts", [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }

    /// Retention: delete verdicts recorded before `cutoff`.
    pub fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let n = self
            .conn
            .lock()
            .execute("DELETE FROM verdicts WHERE ts < ?1", params![cutoff.timestamp_millis()])?;
        Ok(n as u64)
    }

    /// Zero days keeps everything.
    pub fn apply_retention(&self, days: u32, now: DateTime<Utc>) -> Result<u64> {
        if days == 0 {
            return Ok(0);
        }
        self.prune_before(now - Duration::days(i64::from(days)))
    }
}
