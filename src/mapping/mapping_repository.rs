use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use crate::constants::DATE_FORMAT;
use crate::db::get_connection;
use crate::mapping::{MappingError, Result};
use crate::schema::field_mappings;
use crate::schema::field_mappings::dsl::*;

use super::mapping_model::{FieldMapping, FieldMappingDB, NewFieldMapping};

/// Repository for versioned field-mapping rule sets
pub struct MappingRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
}

impl MappingRepository {
    pub fn new(pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>) -> Self {
        Self { pool }
    }

    /// Registers a new mapping version. Versions are immutable; the next
    /// version number per (fund, format) is assigned here.
    pub fn create(&self, new_mapping: NewFieldMapping) -> Result<FieldMapping> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| MappingError::DatabaseError(e.to_string()))?;

        let latest: Option<i32> = field_mappings::table
            .filter(fund_id.eq(&new_mapping.fund_id))
            .filter(source_format.eq(&new_mapping.source_format))
            .select(diesel::dsl::max(version))
            .first(&mut conn)
            .map_err(|e| MappingError::DatabaseError(e.to_string()))?;

        let next_version = latest.unwrap_or(0) + 1;
        let mapping_db = FieldMappingDB::from_new(&new_mapping, next_version)?;

        diesel::insert_into(field_mappings::table)
            .values(&mapping_db)
            .execute(&mut conn)
            .map_err(|e| MappingError::DatabaseError(e.to_string()))?;

        mapping_db.to_domain()
    }

    /// All versions for a (fund, format), newest effective date first.
    pub fn list_versions(
        &self,
        for_fund: &str,
        for_format: &str,
    ) -> Result<Vec<FieldMapping>> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| MappingError::DatabaseError(e.to_string()))?;

        let rows = field_mappings::table
            .filter(fund_id.eq(for_fund))
            .filter(source_format.eq(for_format))
            .order((effective_from.desc(), version.desc()))
            .load::<FieldMappingDB>(&mut conn)
            .map_err(|e| MappingError::DatabaseError(e.to_string()))?;

        rows.iter().map(FieldMappingDB::to_domain).collect()
    }

    /// A specific mapping version.
    pub fn get_version(
        &self,
        for_fund: &str,
        for_format: &str,
        mapping_version: i32,
    ) -> Result<FieldMapping> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| MappingError::DatabaseError(e.to_string()))?;

        let row = field_mappings::table
            .filter(fund_id.eq(for_fund))
            .filter(source_format.eq(for_format))
            .filter(version.eq(mapping_version))
            .first::<FieldMappingDB>(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => MappingError::NotFound(format!(
                    "Mapping version {} for fund '{}' format '{}' not found",
                    mapping_version, for_fund, for_format
                )),
                _ => MappingError::DatabaseError(e.to_string()),
            })?;

        row.to_domain()
    }

    /// The most recent version applicable on `as_of`: highest
    /// (effective_from, version) with effective_from on or before the date.
    pub fn get_applicable(
        &self,
        for_fund: &str,
        for_format: &str,
        as_of: chrono::NaiveDate,
    ) -> Result<FieldMapping> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| MappingError::DatabaseError(e.to_string()))?;

        let cutoff = as_of.format(DATE_FORMAT).to_string();
        let row = field_mappings::table
            .filter(fund_id.eq(for_fund))
            .filter(source_format.eq(for_format))
            .filter(effective_from.le(&cutoff))
            .order((effective_from.desc(), version.desc()))
            .first::<FieldMappingDB>(&mut conn)
            .optional()
            .map_err(|e| MappingError::DatabaseError(e.to_string()))?;

        match row {
            Some(row) => row.to_domain(),
            None => Err(MappingError::NoApplicableVersion {
                fund_id: for_fund.to_string(),
                source_format: for_format.to_string(),
                as_of_date: cutoff,
            }),
        }
    }
}
