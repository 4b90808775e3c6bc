// src/database.rs
mod models;

use std::path::Path;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{
    config::DatabaseConfig,
    errors::RecorderError,
    models::{NewReading, Reading},
};
use self::models::ReadingRow;

/// Append-only store of committed readings
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    /// Single active writer; SQLite would otherwise report busy under load
    write_lock: Arc<Mutex<()>>,
}

impl Database {
    /// Wrap an existing pool, creating the schema if needed
    pub async fn new(pool: SqlitePool) -> Result<Self, RecorderError> {
        Self::create_tables_indices(&pool).await?;
        Ok(Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, RecorderError> {
        config.validate()?;

        info!(
            "Opening database: path={}, max_connections={}",
            config.path.display(),
            config.max_connections
        );

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                error!("Failed to open database: {}", e);
                e
            })?;

        Self::new(pool).await
    }

    /// Open a database file with default pool settings
    pub async fn from_path(path: &Path) -> Result<Self, RecorderError> {
        Self::from_config(&DatabaseConfig {
            path: path.to_path_buf(),
            max_connections: 5,
            busy_timeout: std::time::Duration::from_secs(5),
        })
        .await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create table `motor_data`
    async fn create_tables_indices(pool: &SqlitePool) -> Result<(), RecorderError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS motor_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                motor_name TEXT NOT NULL,
                date_time TEXT NOT NULL,
                power REAL,
                duty REAL,
                erpm REAL,
                i_batt REAL,
                i_motor REAL,
                t_fet REAL,
                t_motor REAL,
                volts_in REAL,
                normal_erpm REAL,
                rpm_48v REAL,
                image_url TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_motor_data_motor_name ON motor_data(motor_name)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Insert a reading and return it with its assigned id
    pub async fn insert_reading(&self, reading: NewReading) -> Result<Reading, RecorderError> {
        let _writer = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO motor_data (
                motor_name, date_time, power, duty, erpm, i_batt, i_motor,
                t_fet, t_motor, volts_in, normal_erpm, rpm_48v, image_url
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(&reading.motor_name)
        .bind(reading.captured_at)
        .bind(reading.fields.power)
        .bind(reading.fields.duty)
        .bind(reading.fields.erpm)
        .bind(reading.fields.i_batt)
        .bind(reading.fields.i_motor)
        .bind(reading.fields.t_fet)
        .bind(reading.fields.t_motor)
        .bind(reading.fields.volts_in)
        .bind(reading.derived.normal_erpm)
        .bind(reading.derived.rpm_48v)
        .bind(&reading.image_url)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let id = result.last_insert_rowid();
        debug!(id, motor = %reading.motor_name, "Inserted reading");
        Ok(Reading::from_new(id, reading))
    }

    /// All readings in insertion order
    pub async fn list_readings(&self) -> Result<Vec<Reading>, RecorderError> {
        let rows: Vec<ReadingRow> = sqlx::query_as(
            "SELECT id, motor_name, date_time, power, duty, erpm, i_batt, i_motor,
                    t_fet, t_motor, volts_in, normal_erpm, rpm_48v, image_url
             FROM motor_data ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Reading::from).collect())
    }

    /// Checkpoint the WAL and close all connections
    pub async fn close(&self) -> Result<(), RecorderError> {
        let _writer = self.write_lock.lock().await;
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;
        self.pool.close().await;
        info!("Database closed");
        Ok(())
    }
}
