use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use duckdb::{params, Connection};
use log::{debug, info};

use super::schema::DatabaseSchema;
use super::store::{GestureStore, StoreError};
use crate::types::{GestureSet, RawSample};

/// Gesture samples in a DuckDB table, one row per sample.
pub struct DuckDbGestureStore {
    conn: Connection,
}

impl DuckDbGestureStore {
    pub fn open(path: impl AsRef<Path>, auto_create_dir: bool) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if auto_create_dir {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        info!("Database connection established at: {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        DatabaseSchema::create_tables(&conn)?;
        Ok(Self { conn })
    }

    pub fn count_samples(&self) -> Result<usize, StoreError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM gesture_samples", [], |row| {
                row.get::<_, i64>(0)
            })?;
        Ok(count as usize)
    }
}

impl GestureStore for DuckDbGestureStore {
    fn save(&mut self, name: &str, samples: &[RawSample]) -> Result<(), StoreError> {
        let recorded_at = Utc::now().timestamp_millis();
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM gesture_samples WHERE gesture_name = ?", params![name])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO gesture_samples (gesture_name, seq_no, gx, gy, gz, ax, ay, az, recorded_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for (seq_no, s) in samples.iter().enumerate() {
                stmt.execute(params![
                    name,
                    seq_no as i64,
                    s.gx,
                    s.gy,
                    s.gz,
                    s.ax,
                    s.ay,
                    s.az,
                    recorded_at
                ])?;
            }
        }
        tx.commit()?;

        info!("Saved {} samples for gesture '{}' to database", samples.len(), name);
        Ok(())
    }

    fn load_all(&mut self) -> Result<GestureSet, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT gesture_name, gx, gy, gz, ax, ay, az FROM gesture_samples
             ORDER BY gesture_name, seq_no",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                RawSample::new(
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ),
            ))
        })?;

        let mut grouped: BTreeMap<String, Vec<RawSample>> = BTreeMap::new();
        for row in rows {
            let (name, sample) = row?;
            grouped.entry(name).or_default().push(sample);
        }

        debug!("Loaded {} gestures from database", grouped.len());
        Ok(grouped.into_iter().collect())
    }

    fn remove(&mut self, name: &str) -> Result<(), StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM gesture_samples WHERE gesture_name = ?", params![name])?;
        info!("Deleted {} rows for gesture '{}'", deleted, name);
        Ok(())
    }
}
