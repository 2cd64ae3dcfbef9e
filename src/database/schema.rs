use duckdb::{Connection, Result as DuckResult};
use log::info;

pub struct DatabaseSchema;

impl DatabaseSchema {
    pub fn create_tables(conn: &Connection) -> DuckResult<()> {
        conn.execute("CREATE SEQUENCE IF NOT EXISTS gesture_samples_seq", [])?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS gesture_samples (
                id INTEGER PRIMARY KEY DEFAULT nextval('gesture_samples_seq'),
                gesture_name VARCHAR NOT NULL,
                seq_no INTEGER NOT NULL,
                gx DOUBLE,
                gy DOUBLE,
                gz DOUBLE,
                ax DOUBLE,
                ay DOUBLE,
                az DOUBLE,
                recorded_at BIGINT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        info!("Gesture tables ready");
        Ok(())
    }
}
