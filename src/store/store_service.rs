use std::collections::VecDeque;
use std::sync::Arc;

use crate::constants::QUERY_PAGE_SIZE;
use crate::store::Result;

use super::store_model::{DateRange, FundSelector, HoldingRecord, PricePoint, QuarantineEntry};
use super::store_traits::CanonicalStoreTrait;

/// Read facade over the canonical store exposed to downstream consumers.
/// Writes are not exposed here; only the validator commits records.
pub struct CanonicalStoreService {
    store: Arc<dyn CanonicalStoreTrait>,
}

impl CanonicalStoreService {
    pub fn new(store: Arc<dyn CanonicalStoreTrait>) -> Self {
        Self { store }
    }

    /// Lazily-paged holdings scan, latest generation per key, date ascending.
    pub fn query_holdings(&self, selector: FundSelector, range: DateRange) -> HoldingsCursor {
        HoldingsCursor::new(self.store.clone(), selector, range, 0)
    }

    /// Lazily-paged price scan, latest generation per key, date ascending.
    pub fn query_prices(&self, selector: FundSelector, range: DateRange) -> PricesCursor {
        PricesCursor::new(self.store.clone(), selector, range, 0)
    }

    /// Restarts a holdings scan from a cursor checkpoint.
    pub fn resume_holdings(
        &self,
        selector: FundSelector,
        range: DateRange,
        checkpoint: i64,
    ) -> HoldingsCursor {
        HoldingsCursor::new(self.store.clone(), selector, range, checkpoint)
    }

    /// Restarts a price scan from a cursor checkpoint.
    pub fn resume_prices(
        &self,
        selector: FundSelector,
        range: DateRange,
        checkpoint: i64,
    ) -> PricesCursor {
        PricesCursor::new(self.store.clone(), selector, range, checkpoint)
    }

    /// Full generation history of one holdings key, for audit of
    /// superseded corrections.
    pub fn holding_generations(
        &self,
        fund_id: &str,
        as_of_date: chrono::NaiveDate,
    ) -> Result<Vec<HoldingRecord>> {
        self.store.get_holding_generations(fund_id, as_of_date)
    }

    /// Full generation history of one price key.
    pub fn price_generations(
        &self,
        fund_id: &str,
        date: chrono::NaiveDate,
    ) -> Result<Vec<PricePoint>> {
        self.store.get_price_generations(fund_id, date)
    }

    /// Quarantine entries for audit review.
    pub fn list_quarantine(
        &self,
        selector: FundSelector,
        range: DateRange,
    ) -> Result<Vec<QuarantineEntry>> {
        self.store.list_quarantine(&selector, &range)
    }
}

/// Restartable, batch-paged holdings scan. Dropping the cursor abandons the
/// scan; `checkpoint()` captures a resume position.
pub struct HoldingsCursor {
    store: Arc<dyn CanonicalStoreTrait>,
    selector: FundSelector,
    range: DateRange,
    buffer: VecDeque<HoldingRecord>,
    offset: i64,
    exhausted: bool,
    poisoned: bool,
}

impl HoldingsCursor {
    fn new(
        store: Arc<dyn CanonicalStoreTrait>,
        selector: FundSelector,
        range: DateRange,
        offset: i64,
    ) -> Self {
        Self {
            store,
            selector,
            range,
            buffer: VecDeque::new(),
            offset,
            exhausted: false,
            poisoned: false,
        }
    }

    /// Offset of the next unread record; feed it into `resume_holdings` to
    /// restart the scan here.
    pub fn checkpoint(&self) -> i64 {
        self.offset - self.buffer.len() as i64
    }
}

impl Iterator for HoldingsCursor {
    type Item = Result<HoldingRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned {
            return None;
        }
        if self.buffer.is_empty() && !self.exhausted {
            match self
                .store
                .get_holdings_page(&self.selector, &self.range, QUERY_PAGE_SIZE, self.offset)
            {
                Ok(page) => {
                    self.exhausted = (page.len() as i64) < QUERY_PAGE_SIZE;
                    self.offset += page.len() as i64;
                    self.buffer.extend(page);
                }
                Err(e) => {
                    self.poisoned = true;
                    return Some(Err(e));
                }
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

/// Restartable, batch-paged price scan.
pub struct PricesCursor {
    store: Arc<dyn CanonicalStoreTrait>,
    selector: FundSelector,
    range: DateRange,
    buffer: VecDeque<PricePoint>,
    offset: i64,
    exhausted: bool,
    poisoned: bool,
}

impl PricesCursor {
    fn new(
        store: Arc<dyn CanonicalStoreTrait>,
        selector: FundSelector,
        range: DateRange,
        offset: i64,
    ) -> Self {
        Self {
            store,
            selector,
            range,
            buffer: VecDeque::new(),
            offset,
            exhausted: false,
            poisoned: false,
        }
    }

    /// Offset of the next unread record; feed it into `resume_prices` to
    /// restart the scan here.
    pub fn checkpoint(&self) -> i64 {
        self.offset - self.buffer.len() as i64
    }
}

impl Iterator for PricesCursor {
    type Item = Result<PricePoint>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned {
            return None;
        }
        if self.buffer.is_empty() && !self.exhausted {
            match self
                .store
                .get_prices_page(&self.selector, &self.range, QUERY_PAGE_SIZE, self.offset)
            {
                Ok(page) => {
                    self.exhausted = (page.len() as i64) < QUERY_PAGE_SIZE;
                    self.offset += page.len() as i64;
                    self.buffer.extend(page);
                }
                Err(e) => {
                    self.poisoned = true;
                    return Some(Err(e));
                }
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
