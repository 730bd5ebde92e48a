//! SQLite-backed job store for the durable backend.

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::telemetry::SiteCode;

use super::error::JobError;
use super::store::{truncate_message, JobStore};
use super::types::{InsightListFilter, Job, JobKind, JobStatus, ERROR_MESSAGE_CAP};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS jobs (
    job_id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    site TEXT NOT NULL,
    asin TEXT,
    range_days INTEGER,
    status TEXT NOT NULL,
    operator TEXT NOT NULL,
    queue_ref TEXT,
    error_message TEXT,
    result TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    started_at TEXT,
    finished_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_jobs_kind_created ON jobs(kind, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_jobs_operator ON jobs(operator);
";

/// Job records in SQLite, surviving process restarts.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, JobError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, JobError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn row_to_job(row: &Row<'_>) -> rusqlite::Result<Job> {
        fn bad(idx: usize, msg: String) -> rusqlite::Error {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg)),
            )
        }
        fn ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
            DateTime::parse_from_rfc3339(&raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| bad(idx, e.to_string()))
        }

        let kind: String = row.get(1)?;
        let site: String = row.get(2)?;
        let status: String = row.get(5)?;
        let result: Option<String> = row.get(9)?;
        let created_at: String = row.get(10)?;
        let updated_at: String = row.get(11)?;
        let started_at: Option<String> = row.get(12)?;
        let finished_at: Option<String> = row.get(13)?;

        Ok(Job {
            job_id: row.get(0)?,
            kind: JobKind::from_str(&kind).map_err(|e| bad(1, e))?,
            site: SiteCode::from_str(&site).map_err(|e| bad(2, e.to_string()))?,
            asin: row.get(3)?,
            range_days: row.get(4)?,
            status: JobStatus::from_str(&status).map_err(|e| bad(5, e))?,
            operator: row.get(6)?,
            queue_ref: row.get(7)?,
            error_message: row.get(8)?,
            result: result
                .map(|raw| serde_json::from_str(&raw).map_err(|e| bad(9, e.to_string())))
                .transpose()?,
            created_at: ts(10, created_at)?,
            updated_at: ts(11, updated_at)?,
            started_at: started_at.map(|raw| ts(12, raw)).transpose()?,
            finished_at: finished_at.map(|raw| ts(13, raw)).transpose()?,
        })
    }

    /// Transition updates guard on non-terminal status; zero affected rows
    /// means either a terminal job (ignored) or a missing one (error).
    fn ensure_exists(conn: &Connection, job_id: &str) -> Result<(), JobError> {
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM jobs WHERE job_id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(JobError::NotFound(job_id.to_string()));
        }
        Ok(())
    }
}

impl JobStore for SqliteJobStore {
    fn insert(&self, job: &Job) -> Result<(), JobError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO jobs (job_id, kind, site, asin, range_days, status, operator,
                               queue_ref, error_message, result, created_at, updated_at,
                               started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                job.job_id,
                job.kind.as_str(),
                job.site.as_str(),
                job.asin,
                job.range_days,
                job.status.as_str(),
                job.operator,
                job.queue_ref,
                job.error_message,
                job.result
                    .as_ref()
                    .map(|v| v.to_string()),
                job.created_at.to_rfc3339(),
                job.updated_at.to_rfc3339(),
                job.started_at.map(|t| t.to_rfc3339()),
                job.finished_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn get(&self, job_id: &str) -> Result<Option<Job>, JobError> {
        let conn = self.conn.lock().unwrap();
        let job = conn
            .query_row(
                "SELECT job_id, kind, site, asin, range_days, status, operator, queue_ref,
                        error_message, result, created_at, updated_at, started_at, finished_at
                 FROM jobs WHERE job_id = ?1",
                params![job_id],
                Self::row_to_job,
            )
            .optional()?;
        Ok(job)
    }

    fn set_queue_ref(&self, job_id: &str, queue_ref: &str) -> Result<(), JobError> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE jobs SET queue_ref = ?1, updated_at = ?2
             WHERE job_id = ?3 AND status NOT IN ('success', 'failed')",
            params![queue_ref, Utc::now().to_rfc3339(), job_id],
        )?;
        if n == 0 {
            Self::ensure_exists(&conn, job_id)?;
        }
        Ok(())
    }

    fn mark_running(&self, job_id: &str) -> Result<(), JobError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let n = conn.execute(
            "UPDATE jobs SET status = 'running', started_at = ?1, updated_at = ?1
             WHERE job_id = ?2 AND status NOT IN ('success', 'failed')",
            params![now, job_id],
        )?;
        if n == 0 {
            Self::ensure_exists(&conn, job_id)?;
        }
        Ok(())
    }

    fn mark_success(&self, job_id: &str, result: &serde_json::Value) -> Result<(), JobError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let n = conn.execute(
            "UPDATE jobs SET status = 'success', result = ?1, finished_at = ?2, updated_at = ?2
             WHERE job_id = ?3 AND status NOT IN ('success', 'failed')",
            params![result.to_string(), now, job_id],
        )?;
        if n == 0 {
            Self::ensure_exists(&conn, job_id)?;
        }
        Ok(())
    }

    fn mark_failed(&self, job_id: &str, error_message: &str) -> Result<(), JobError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let n = conn.execute(
            "UPDATE jobs SET status = 'failed', error_message = ?1, finished_at = ?2, updated_at = ?2
             WHERE job_id = ?3 AND status NOT IN ('success', 'failed')",
            params![
                truncate_message(error_message, ERROR_MESSAGE_CAP),
                now,
                job_id
            ],
        )?;
        if n == 0 {
            Self::ensure_exists(&conn, job_id)?;
        }
        Ok(())
    }

    fn list_insight(
        &self,
        filter: &InsightListFilter,
        operator: Option<&str>,
    ) -> Result<Vec<Job>, JobError> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from(
            "SELECT job_id, kind, site, asin, range_days, status, operator, queue_ref,
                    error_message, result, created_at, updated_at, started_at, finished_at
             FROM jobs WHERE kind = 'insight'",
        );
        let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(op) = operator {
            sql.push_str(&format!(" AND operator = ?{}", args.len() + 1));
            args.push(Box::new(op.to_string()));
        }
        if let Some(site) = filter.site {
            sql.push_str(&format!(" AND site = ?{}", args.len() + 1));
            args.push(Box::new(site.as_str().to_string()));
        }
        if let Some(ref asin) = filter.asin {
            sql.push_str(&format!(" AND asin = ?{}", args.len() + 1));
            args.push(Box::new(asin.clone()));
        }
        if let Some(status) = filter.status {
            sql.push_str(&format!(" AND status = ?{}", args.len() + 1));
            args.push(Box::new(status.as_str().to_string()));
        }
        sql.push_str(&format!(
            " ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
            args.len() + 1,
            args.len() + 2
        ));
        args.push(Box::new(filter.limit() as i64));
        args.push(Box::new(filter.offset() as i64));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
            Self::row_to_job,
        )?;
        let mut jobs = Vec::new();
        for job in rows {
            jobs.push(job?);
        }
        Ok(jobs)
    }
}
