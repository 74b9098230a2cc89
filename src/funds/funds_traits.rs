use super::funds_model::{FundIdentity, NewFund};
use crate::funds::Result;

/// Trait defining the contract for fund registry operations.
pub trait FundServiceTrait: Send + Sync {
    fn register_fund(&self, new_fund: NewFund) -> Result<FundIdentity>;
    fn get_fund(&self, fund_id: &str) -> Result<FundIdentity>;
    fn list_funds(&self) -> Result<Vec<FundIdentity>>;
}
