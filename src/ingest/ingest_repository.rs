use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use crate::db::get_connection;
use crate::ingest::{IngestError, Result};
use crate::schema::ingest_runs;
use crate::schema::ingest_runs::dsl::*;

use super::ingest_model::{IngestRun, IngestRunDB};

/// Repository for persisted run reports
pub struct IngestRunRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
}

impl IngestRunRepository {
    pub fn new(pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>) -> Self {
        Self { pool }
    }

    pub fn create(&self, run: &IngestRun) -> Result<()> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| IngestError::DatabaseError(e.to_string()))?;

        diesel::insert_into(ingest_runs::table)
            .values(IngestRunDB::from(run))
            .execute(&mut conn)
            .map_err(|e| IngestError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    pub fn update(&self, run: &IngestRun) -> Result<()> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| IngestError::DatabaseError(e.to_string()))?;

        diesel::update(ingest_runs.find(&run.id))
            .set(IngestRunDB::from(run))
            .execute(&mut conn)
            .map_err(|e| IngestError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    pub fn get_by_id(&self, run_id: &str) -> Result<IngestRun> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| IngestError::DatabaseError(e.to_string()))?;

        let row = ingest_runs
            .find(run_id)
            .first::<IngestRunDB>(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => {
                    IngestError::NotFound(format!("Run with id {} not found", run_id))
                }
                _ => IngestError::DatabaseError(e.to_string()),
            })?;

        row.to_domain()
    }

    pub fn list_for_fund(&self, for_fund: &str, limit: i64) -> Result<Vec<IngestRun>> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| IngestError::DatabaseError(e.to_string()))?;

        let rows = ingest_runs
            .filter(fund_id.eq(for_fund))
            .order(started_at.desc())
            .limit(limit)
            .load::<IngestRunDB>(&mut conn)
            .map_err(|e| IngestError::DatabaseError(e.to_string()))?;

        rows.iter().map(IngestRunDB::to_domain).collect()
    }
}
