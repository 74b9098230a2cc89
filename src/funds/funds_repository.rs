use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use crate::db::get_connection;
use crate::funds::{FundError, Result};
use crate::schema::funds;
use crate::schema::funds::dsl::*;

use super::funds_model::{FundDB, FundIdentity, NewFund};

/// Repository for the fund registry
pub struct FundRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
}

impl FundRepository {
    pub fn new(pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>) -> Self {
        Self { pool }
    }

    /// Registers a new fund. Fund ids are stable; pass one explicitly to keep
    /// it aligned with external references, otherwise a uuid is assigned.
    pub fn create(&self, new_fund: NewFund) -> Result<FundIdentity> {
        new_fund.validate()?;

        let mut fund_db: FundDB = new_fund.into();
        if fund_db.id.is_empty() {
            fund_db.id = uuid::Uuid::new_v4().to_string();
        }

        let mut conn = get_connection(&self.pool)
            .map_err(|e| FundError::DatabaseError(e.to_string()))?;

        diesel::insert_into(funds::table)
            .values(&fund_db)
            .execute(&mut conn)
            .map_err(|e| FundError::DatabaseError(e.to_string()))?;

        Ok(fund_db.into())
    }

    pub fn get_by_id(&self, fund_id: &str) -> Result<FundIdentity> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| FundError::DatabaseError(e.to_string()))?;

        let fund = funds
            .find(fund_id)
            .first::<FundDB>(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => {
                    FundError::NotFound(format!("Fund with id {} not found", fund_id))
                }
                _ => FundError::DatabaseError(e.to_string()),
            })?;

        Ok(fund.into())
    }

    pub fn list(&self) -> Result<Vec<FundIdentity>> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| FundError::DatabaseError(e.to_string()))?;

        funds::table
            .order(name.asc())
            .load::<FundDB>(&mut conn)
            .map_err(|e| FundError::DatabaseError(e.to_string()))
            .map(|results| results.into_iter().map(FundIdentity::from).collect())
    }
}
