//! SQLite-backed job tracker and artifact sink

use crate::StoreError;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sparkmill_domain::traits::{ArtifactSink, JobTracker};
use sparkmill_domain::{
    current_timestamp, ArtifactId, GeneratedArtifact, JobId, JobRecord, JobStatus,
};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// SQLite implementation of [`JobTracker`] and [`ArtifactSink`]
///
/// The connection sits behind a mutex, so one store can be shared (usually
/// as an `Arc`) between the orchestrator and pollers. Every job mutation is
/// a read-modify-write under that lock.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sparkmill_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("sparkmill.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn artifact_id_to_bytes(id: ArtifactId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    fn bytes_to_artifact_id(bytes: &[u8]) -> Result<ArtifactId, StoreError> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| {
            StoreError::InvalidData(format!(
                "Expected 16 bytes for ArtifactId, got {}",
                bytes.len()
            ))
        })?;
        Ok(ArtifactId::from_value(u128::from_be_bytes(arr)))
    }

    fn read_job(conn: &Connection, id: &JobId) -> Result<Option<JobRecord>, StoreError> {
        let row = conn
            .query_row(
                "SELECT id, status, current_step, message, artifact_ids, error, created_at, updated_at
                 FROM jobs WHERE id = ?1",
                params![id.as_str()],
                RawJob::from_row,
            )
            .optional()?;
        row.map(RawJob::into_record).transpose()
    }

    fn write_job(conn: &Connection, record: &JobRecord) -> Result<(), StoreError> {
        conn.execute(
            "UPDATE jobs SET status = ?2, current_step = ?3, message = ?4, artifact_ids = ?5,
                             error = ?6, updated_at = ?7
             WHERE id = ?1",
            params![
                record.id.as_str(),
                record.status.as_str(),
                record.current_step,
                record.message,
                serde_json::to_string(&record.artifact_ids)?,
                record.error,
                record.updated_at as i64,
            ],
        )?;
        Ok(())
    }

    /// Load, mutate and write back one job record under the lock
    fn mutate_job(
        &self,
        id: &JobId,
        f: impl FnOnce(&mut JobRecord, u64) -> Result<(), sparkmill_domain::JobTransitionError>,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let mut record =
            Self::read_job(&conn, id)?.ok_or_else(|| StoreError::JobNotFound(id.to_string()))?;
        f(&mut record, current_timestamp())?;
        Self::write_job(&conn, &record)
    }

    /// Number of persisted ideas
    pub fn artifact_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM ideas", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Jobs currently in `status`, oldest first
    pub fn jobs_with_status(&self, status: JobStatus) -> Result<Vec<JobRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, status, current_step, message, artifact_ids, error, created_at, updated_at
             FROM jobs WHERE status = ?1 ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map(params![status.as_str()], RawJob::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }
}

/// Job row before status and artifact-id decoding
struct RawJob {
    id: String,
    status: String,
    current_step: Option<String>,
    message: Option<String>,
    artifact_ids: String,
    error: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl RawJob {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            status: row.get(1)?,
            current_step: row.get(2)?,
            message: row.get(3)?,
            artifact_ids: row.get(4)?,
            error: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<JobRecord, StoreError> {
        let status = JobStatus::parse(&self.status)
            .ok_or_else(|| StoreError::InvalidData(format!("Unknown job status: {}", self.status)))?;
        Ok(JobRecord {
            id: JobId::new(self.id),
            status,
            current_step: self.current_step,
            message: self.message,
            artifact_ids: serde_json::from_str(&self.artifact_ids)?,
            error: self.error,
            created_at: self.created_at as u64,
            updated_at: self.updated_at as u64,
        })
    }
}

impl JobTracker for SqliteStore {
    type Error = StoreError;

    fn create(&self, id: &JobId) -> Result<JobRecord, StoreError> {
        let conn = self.conn()?;
        if Self::read_job(&conn, id)?.is_some() {
            return Err(StoreError::DuplicateJob(id.to_string()));
        }

        let record = JobRecord::new(id.clone(), current_timestamp());
        conn.execute(
            "INSERT INTO jobs (id, status, current_step, message, artifact_ids, error, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, '[]', NULL, ?5, ?6)",
            params![
                record.id.as_str(),
                record.status.as_str(),
                record.current_step,
                record.message,
                record.created_at as i64,
                record.updated_at as i64,
            ],
        )?;
        debug!("Created job {}", id);
        Ok(record)
    }

    fn start(&self, id: &JobId) -> Result<(), StoreError> {
        self.mutate_job(id, |record, now| record.start(now))
    }

    fn update(&self, id: &JobId, step: &str, message: &str) -> Result<(), StoreError> {
        self.mutate_job(id, |record, now| record.record_progress(step, message, now))
    }

    fn complete(&self, id: &JobId, artifact_ids: &[ArtifactId]) -> Result<(), StoreError> {
        self.mutate_job(id, |record, now| record.complete(artifact_ids.to_vec(), now))
    }

    fn fail(&self, id: &JobId, message: &str) -> Result<(), StoreError> {
        self.mutate_job(id, |record, now| record.fail(message, now))
    }

    fn read(&self, id: &JobId) -> Result<Option<JobRecord>, StoreError> {
        let conn = self.conn()?;
        Self::read_job(&conn, id)
    }
}

impl ArtifactSink for SqliteStore {
    type Error = StoreError;

    /// Writes the trend, monetization and scoring rows, then the idea row
    /// referencing them, then links the scoring row back to the idea. All of
    /// it commits together or not at all.
    fn persist(&self, artifact: &GeneratedArtifact) -> Result<ArtifactId, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO trend_summaries (summary, payload, created_at) VALUES (?1, ?2, ?3)",
            params![
                artifact.trend.summary,
                serde_json::to_string(&artifact.trend)?,
                artifact.created_at as i64,
            ],
        )?;
        let trend_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO monetization_plans (model, ltv, cac, payload) VALUES (?1, ?2, ?3, ?4)",
            params![
                artifact.monetization.model,
                artifact.monetization.key_metrics.ltv,
                artifact.monetization.key_metrics.cac,
                serde_json::to_string(&artifact.monetization)?,
            ],
        )?;
        let monetization_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO scorings (idea_id, scores, average) VALUES (NULL, ?1, ?2)",
            params![
                serde_json::to_string(&artifact.scores)?,
                artifact.scores.average(),
            ],
        )?;
        let scoring_id = tx.last_insert_rowid();

        let id = ArtifactId::new();
        let id_bytes = Self::artifact_id_to_bytes(id);
        tx.execute(
            "INSERT INTO ideas (id, title, tagline, description, tags, directive, user_id,
                                trend_id, monetization_id, scoring_id, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                &id_bytes,
                artifact.title,
                artifact.tagline,
                artifact.description,
                serde_json::to_string(&artifact.tags)?,
                artifact.directive,
                artifact.user_id,
                trend_id,
                monetization_id,
                scoring_id,
                serde_json::to_string(artifact)?,
                artifact.created_at as i64,
            ],
        )?;

        tx.execute(
            "UPDATE scorings SET idea_id = ?1 WHERE id = ?2",
            params![&id_bytes, scoring_id],
        )?;

        tx.commit()?;
        debug!("Persisted idea {} '{}'", id, artifact.title);
        Ok(id)
    }

    fn recent_titles(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT title FROM ideas ORDER BY created_at DESC, id DESC LIMIT ?1")?;
        let titles = stmt
            .query_map(params![limit as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(titles)
    }

    fn load(&self, id: ArtifactId) -> Result<Option<GeneratedArtifact>, StoreError> {
        let conn = self.conn()?;
        let row: Option<(Vec<u8>, String)> = conn
            .query_row(
                "SELECT id, payload FROM ideas WHERE id = ?1",
                params![Self::artifact_id_to_bytes(id)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((id_bytes, payload)) => {
                let stored_id = Self::bytes_to_artifact_id(&id_bytes)?;
                if stored_id != id {
                    return Err(StoreError::InvalidData(format!(
                        "Idea row {} returned for {}",
                        stored_id, id
                    )));
                }
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => Ok(None),
        }
    }
}
