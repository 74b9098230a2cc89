use chrono::NaiveDate;

use crate::mapping::{CandidateHolding, CandidatePrice};

use super::store_errors::Result;
use super::store_model::{
    DateRange, FundSelector, GroupAppendOutcome, HoldingRecord, NewQuarantineEntry,
    PriceAppendOutcome, PricePoint, QuarantineEntry,
};

/// Contract of the canonical store: append-only writes keyed by
/// (fund, date), latest-generation reads ordered by date ascending.
pub trait CanonicalStoreTrait: Send + Sync {
    /// Appends one holdings group (all rows share fund and as-of date).
    /// Re-appending an identical group is a no-op; a different group for an
    /// existing key fails with `DuplicateKey` unless `supersede` starts a new
    /// generation.
    fn append_holdings_group(
        &self,
        rows: &[CandidateHolding],
        supersede: bool,
    ) -> Result<GroupAppendOutcome>;

    /// Appends price points atomically: on any duplicate-key conflict the
    /// whole batch rolls back and prior content is unchanged. Identical
    /// already-stored points are counted, not re-inserted.
    fn append_prices(
        &self,
        points: &[CandidatePrice],
        supersede: bool,
    ) -> Result<PriceAppendOutcome>;

    /// Latest stored price date for a fund (monotonic-date reference).
    fn latest_price_date(&self, fund_id: &str) -> Result<Option<NaiveDate>>;

    /// Latest-generation price stored under (fund, date), if any.
    fn get_price(&self, fund_id: &str, date: NaiveDate) -> Result<Option<PricePoint>>;

    /// Appends entries to the quarantine audit log.
    fn append_quarantine(&self, entries: Vec<NewQuarantineEntry>) -> Result<usize>;

    /// One page of latest-generation holdings, ordered by
    /// (as-of date, fund, row index).
    fn get_holdings_page(
        &self,
        selector: &FundSelector,
        range: &DateRange,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<HoldingRecord>>;

    /// One page of latest-generation prices, ordered by (date, fund).
    fn get_prices_page(
        &self,
        selector: &FundSelector,
        range: &DateRange,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PricePoint>>;

    /// Every generation of one holdings key, oldest generation first.
    /// Audit access to superseded corrections.
    fn get_holding_generations(
        &self,
        fund_id: &str,
        as_of_date: NaiveDate,
    ) -> Result<Vec<HoldingRecord>>;

    /// Every generation of one price key, oldest generation first.
    fn get_price_generations(
        &self,
        fund_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<PricePoint>>;

    /// Quarantine entries for audit review, oldest first.
    fn list_quarantine(
        &self,
        selector: &FundSelector,
        range: &DateRange,
    ) -> Result<Vec<QuarantineEntry>>;
}
