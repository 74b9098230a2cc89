use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::adapters::{RawArtifact, SourceFormat};
use crate::validation::ValidationReport;

use super::ingest_errors::{IngestError, Result};

/// Outcome status of an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// In progress
    #[default]
    Running,
    /// All records accepted (or idempotent no-ops)
    Completed,
    /// Run finished with quarantined or duplicate records
    Partial,
    /// Adapter/mapper/store failure aborted the artifact
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Partial => "PARTIAL",
            RunStatus::Failed => "FAILED",
        }
    }

    pub fn from_storage(s: &str) -> Result<Self> {
        match s {
            "RUNNING" => Ok(RunStatus::Running),
            "COMPLETED" => Ok(RunStatus::Completed),
            "PARTIAL" => Ok(RunStatus::Partial),
            "FAILED" => Ok(RunStatus::Failed),
            other => Err(IngestError::DatabaseError(format!(
                "unknown run status '{}'",
                other
            ))),
        }
    }
}

/// Per-run flags and overrides.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Pins a specific mapping version instead of date-based selection.
    pub mapping_version: Option<i32>,
    /// Flags an explicit backfill import, bypassing the monotonic-date
    /// check.
    pub backfill: bool,
    /// Treats same-key appends as corrections (superseding generation).
    pub supersede: bool,
}

/// One unit of ingestion work: a (fund, artifact) pair.
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub fund_id: String,
    pub format: SourceFormat,
    pub artifact: RawArtifact,
    pub options: IngestOptions,
}

/// The persisted run report for one artifact's ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRun {
    pub id: String,
    pub fund_id: String,
    pub source_format: String,
    pub status: RunStatus,
    pub accepted_count: i32,
    pub quarantined_count: i32,
    pub error: Option<String>,
    pub started_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
}

impl IngestRun {
    pub fn new(fund_id: &str, format: SourceFormat) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            fund_id: fund_id.to_string(),
            source_format: format.to_string(),
            status: RunStatus::Running,
            accepted_count: 0,
            quarantined_count: 0,
            error: None,
            started_at: Utc::now().naive_utc(),
            finished_at: None,
        }
    }

    /// Marks the run finished from a validation report: clean reports
    /// complete, anything quarantined or duplicated is partial.
    pub fn complete(&mut self, report: &ValidationReport) {
        self.accepted_count = (report.accepted + report.already_present) as i32;
        self.quarantined_count = report.quarantined as i32;
        self.status = if report.is_clean() {
            RunStatus::Completed
        } else {
            RunStatus::Partial
        };
        self.finished_at = Some(Utc::now().naive_utc());
    }

    pub fn fail(&mut self, error: String) {
        self.status = RunStatus::Failed;
        self.error = Some(error);
        self.finished_at = Some(Utc::now().naive_utc());
    }
}

/// Database model for ingest runs
#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::ingest_runs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct IngestRunDB {
    pub id: String,
    pub fund_id: String,
    pub source_format: String,
    pub status: String,
    pub accepted_count: i32,
    pub quarantined_count: i32,
    pub error: Option<String>,
    pub started_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
}

impl IngestRunDB {
    pub fn to_domain(&self) -> Result<IngestRun> {
        Ok(IngestRun {
            id: self.id.clone(),
            fund_id: self.fund_id.clone(),
            source_format: self.source_format.clone(),
            status: RunStatus::from_storage(&self.status)?,
            accepted_count: self.accepted_count,
            quarantined_count: self.quarantined_count,
            error: self.error.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        })
    }
}

impl From<&IngestRun> for IngestRunDB {
    fn from(run: &IngestRun) -> Self {
        Self {
            id: run.id.clone(),
            fund_id: run.fund_id.clone(),
            source_format: run.source_format.clone(),
            status: run.status.as_str().to_string(),
            accepted_count: run.accepted_count,
            quarantined_count: run.quarantined_count,
            error: run.error.clone(),
            started_at: run.started_at,
            finished_at: run.finished_at,
        }
    }
}
