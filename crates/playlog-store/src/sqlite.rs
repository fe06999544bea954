use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use playlog_core::{OpenStore, PlaytimeItem, Snapshot, SnapshotStore, StoreStats};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type SnapshotRow = (String, String, i64, Option<String>, i64);

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("opening {}", db_path.display()))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS playtime_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                captured_at_utc TEXT NOT NULL,
                subject_id TEXT NOT NULL,
                item_id INTEGER NOT NULL,
                item_name TEXT,
                cumulative_value INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_snapshots_subject_item_time
                ON playtime_snapshots (subject_id, item_id, captured_at_utc);
            ",
        )?;
        Ok(())
    }

    fn row_to_snapshot(row: SnapshotRow) -> Result<Snapshot> {
        let (captured_at, subject_id, item_id, item_name, value) = row;
        Ok(Snapshot {
            captured_at: parse_timestamp(&captured_at)?,
            subject_id,
            item_id,
            item_name,
            cumulative_value: value.max(0) as u64,
        })
    }
}

impl SnapshotStore for SqliteStore {
    fn append(
        &mut self,
        subject_id: &str,
        items: &[PlaytimeItem],
        captured_at: Option<DateTime<Utc>>,
    ) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        let captured_at = format_timestamp(captured_at.unwrap_or_else(Utc::now));

        // Dropping an uncommitted transaction rolls it back
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO playtime_snapshots (
                    captured_at_utc, subject_id, item_id, item_name, cumulative_value
                 ) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for item in items {
                stmt.execute(params![
                    captured_at,
                    subject_id,
                    item.item_id,
                    item.item_name,
                    item.cumulative_value as i64,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(subject = %subject_id, rows = items.len(), "appended snapshot batch");
        Ok(items.len())
    }

    fn fetch_ordered(&self, subject_id: &str) -> Result<Vec<Snapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT captured_at_utc, subject_id, item_id, item_name, cumulative_value
             FROM playtime_snapshots
             WHERE subject_id = ?1
             ORDER BY item_id, captured_at_utc, id",
        )?;
        let rows = stmt
            .query_map(params![subject_id], |row| -> rusqlite::Result<SnapshotRow> {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?
            .collect::<Result<Vec<SnapshotRow>, _>>()?;

        rows.into_iter().map(Self::row_to_snapshot).collect()
    }

    fn list_subjects(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT subject_id FROM playtime_snapshots ORDER BY subject_id",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<String>, _>>().map_err(Into::into)
    }

    fn latest_batch(&self, subject_id: &str) -> Result<Option<Vec<PlaytimeItem>>> {
        let latest: Option<String> = self.conn.query_row(
            "SELECT MAX(captured_at_utc) FROM playtime_snapshots WHERE subject_id = ?1",
            params![subject_id],
            |row| row.get(0),
        )?;
        let Some(latest) = latest else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT item_id, item_name, cumulative_value
             FROM playtime_snapshots
             WHERE subject_id = ?1 AND captured_at_utc = ?2
             ORDER BY item_id, id",
        )?;
        let rows = stmt.query_map(params![subject_id, latest], |row| {
            Ok(PlaytimeItem {
                item_id: row.get(0)?,
                item_name: row.get(1)?,
                cumulative_value: row.get::<_, i64>(2)?.max(0) as u64,
            })
        })?;
        Ok(Some(rows.collect::<Result<Vec<_>, _>>()?))
    }

    fn stats(&self) -> Result<StoreStats> {
        let (subjects, snapshots, last): (i64, i64, Option<String>) = self.conn.query_row(
            "SELECT COUNT(DISTINCT subject_id), COUNT(*), MAX(captured_at_utc)
             FROM playtime_snapshots",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(StoreStats {
            subjects: subjects as usize,
            snapshots: snapshots as usize,
            last_captured_at: last.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

/// Opens one SQLite connection per unit of work
#[derive(Debug, Clone)]
pub struct SqliteOpener {
    db_path: PathBuf,
}

impl SqliteOpener {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open without creating the file when it is missing
    pub fn open_existing(&self) -> Result<Option<SqliteStore>> {
        if !self.db_path.exists() {
            return Ok(None);
        }
        self.open().map(Some)
    }
}

impl OpenStore for SqliteOpener {
    type Store = SqliteStore;

    fn open(&self) -> Result<SqliteStore> {
        SqliteStore::new(&self.db_path)
    }
}

/// Fixed-width UTC text so that lexical order is time order
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("bad captured_at_utc {:?}", raw))?
        .with_timezone(&Utc))
}
