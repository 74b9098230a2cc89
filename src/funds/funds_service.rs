use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use log::debug;
use std::sync::Arc;

use super::funds_model::{FundIdentity, NewFund};
use super::funds_repository::FundRepository;
use super::funds_traits::FundServiceTrait;
use crate::funds::Result;

/// Service for the fund registry
pub struct FundService {
    repository: FundRepository,
}

impl FundService {
    pub fn new(pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>) -> Self {
        Self {
            repository: FundRepository::new(pool),
        }
    }
}

impl FundServiceTrait for FundService {
    fn register_fund(&self, new_fund: NewFund) -> Result<FundIdentity> {
        debug!("Registering fund '{}'", new_fund.name);
        self.repository.create(new_fund)
    }

    fn get_fund(&self, fund_id: &str) -> Result<FundIdentity> {
        self.repository.get_by_id(fund_id)
    }

    fn list_funds(&self) -> Result<Vec<FundIdentity>> {
        self.repository.list()
    }
}
