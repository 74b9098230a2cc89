use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use crate::constants::DATE_FORMAT;
use crate::db::get_connection;
use crate::schema::quarantine_entries;
use crate::schema::quarantine_entries::dsl::*;
use crate::store::{Result, StoreError};

use super::store_model::{
    DateRange, FundSelector, NewQuarantineEntry, QuarantineEntry, QuarantineEntryDB,
};

/// Repository for the quarantine audit log. Entries are retained for manual
/// review, never deleted by the pipeline.
pub struct QuarantineRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
}

impl QuarantineRepository {
    pub fn new(pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>) -> Self {
        Self { pool }
    }

    pub fn append(&self, entries: Vec<NewQuarantineEntry>) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let rows: Vec<QuarantineEntryDB> = entries
            .into_iter()
            .map(QuarantineEntryDB::from_new)
            .collect();

        let mut conn = get_connection(&self.pool)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut inserted = 0;
        for chunk in rows.chunks(100) {
            inserted += diesel::insert_into(quarantine_entries::table)
                .values(chunk)
                .execute(&mut conn)
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        }
        Ok(inserted)
    }

    pub fn list(
        &self,
        selector: &FundSelector,
        range: &DateRange,
    ) -> Result<Vec<QuarantineEntry>> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut query = quarantine_entries::table.into_boxed();

        if let Some(ids) = selector.as_ids() {
            query = query.filter(fund_id.eq_any(ids));
        }
        if let Some(start) = range.start {
            query = query.filter(as_of_date.ge(start.format(DATE_FORMAT).to_string()));
        }
        if let Some(end) = range.end {
            query = query.filter(as_of_date.le(end.format(DATE_FORMAT).to_string()));
        }

        let rows = query
            .order(created_at.asc())
            .load::<QuarantineEntryDB>(&mut conn)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        rows.iter().map(QuarantineEntryDB::to_domain).collect()
    }
}
