use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use log::debug;
use std::sync::Arc;

use crate::constants::DATE_FORMAT;
use crate::db::get_connection;
use crate::mapping::{CandidateHolding, CandidatePrice};
use crate::schema::{holdings, unit_prices};
use crate::store::{Result, StoreError};

use super::quarantine_repository::QuarantineRepository;
use super::store_model::{
    holdings_group_digest, parse_stored_date, DateRange, FundSelector, GroupAppendOutcome,
    HoldingDB, HoldingRecord, NewQuarantineEntry, PriceAppendOutcome, PricePoint, PricePointDB,
    QuarantineEntry,
};
use super::store_traits::CanonicalStoreTrait;

/// Append-only repository over the canonical holdings and price tables.
/// Existing generations are never mutated; corrections insert a superseding
/// generation for the same key.
pub struct CanonicalStoreRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    quarantine: QuarantineRepository,
}

impl CanonicalStoreRepository {
    pub fn new(pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>) -> Self {
        let quarantine = QuarantineRepository::new(pool.clone());
        Self { pool, quarantine }
    }
}

impl CanonicalStoreTrait for CanonicalStoreRepository {
    fn append_holdings_group(
        &self,
        rows: &[CandidateHolding],
        supersede: bool,
    ) -> Result<GroupAppendOutcome> {
        let first = rows.first().ok_or_else(|| {
            StoreError::InvalidData("cannot append an empty holdings group".to_string())
        })?;
        let group_fund = first.fund_id.clone();
        let group_date = first.as_of_date;
        if rows
            .iter()
            .any(|r| r.fund_id != group_fund || r.as_of_date != group_date)
        {
            return Err(StoreError::InvalidData(
                "holdings group spans multiple (fund, as-of date) keys".to_string(),
            ));
        }

        let digest = holdings_group_digest(rows);
        let date_str = group_date.format(DATE_FORMAT).to_string();

        let mut conn = get_connection(&self.pool)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.transaction::<GroupAppendOutcome, StoreError, _>(|conn| {
            let existing: Option<(i64, String)> = holdings::table
                .filter(holdings::fund_id.eq(&group_fund))
                .filter(holdings::as_of_date.eq(&date_str))
                .order(holdings::generation.desc())
                .select((holdings::generation, holdings::group_digest))
                .first(conn)
                .optional()?;

            let generation = match existing {
                Some((_, ref stored_digest)) if *stored_digest == digest => {
                    debug!(
                        "Holdings group for fund '{}' at {} already stored; no-op",
                        group_fund, date_str
                    );
                    return Ok(GroupAppendOutcome::AlreadyPresent);
                }
                Some((latest_gen, _)) if supersede => latest_gen + 1,
                Some(_) => {
                    return Err(StoreError::DuplicateKey {
                        kind: "holdings",
                        fund_id: group_fund.clone(),
                        date: date_str.clone(),
                    })
                }
                None => 0,
            };

            let db_rows: Vec<HoldingDB> = rows
                .iter()
                .enumerate()
                .map(|(idx, row)| HoldingDB::from_candidate(row, idx as i32, generation, &digest))
                .collect();

            for chunk in db_rows.chunks(100) {
                diesel::insert_into(holdings::table)
                    .values(chunk)
                    .execute(conn)
                    .map_err(|e| {
                        StoreError::from_diesel(e, "holdings", &group_fund, &date_str)
                    })?;
            }

            Ok(GroupAppendOutcome::Inserted {
                generation,
                rows: rows.len(),
            })
        })
    }

    fn append_prices(
        &self,
        points: &[CandidatePrice],
        supersede: bool,
    ) -> Result<PriceAppendOutcome> {
        if points.is_empty() {
            return Ok(PriceAppendOutcome::default());
        }

        let mut conn = get_connection(&self.pool)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.transaction::<PriceAppendOutcome, StoreError, _>(|conn| {
            let mut outcome = PriceAppendOutcome::default();

            for point in points {
                let date_str = point.date.format(DATE_FORMAT).to_string();

                let existing: Option<PricePointDB> = unit_prices::table
                    .filter(unit_prices::fund_id.eq(&point.fund_id))
                    .filter(unit_prices::date.eq(&date_str))
                    .order(unit_prices::generation.desc())
                    .first(conn)
                    .optional()?;

                let generation = match existing {
                    Some(ref stored) => {
                        let stored_point = stored.to_domain()?;
                        if stored_point.price == point.price
                            && stored_point.currency == point.currency
                        {
                            outcome.already_present += 1;
                            continue;
                        }
                        if !supersede {
                            return Err(StoreError::DuplicateKey {
                                kind: "unit_prices",
                                fund_id: point.fund_id.clone(),
                                date: date_str,
                            });
                        }
                        stored.generation + 1
                    }
                    None => 0,
                };

                diesel::insert_into(unit_prices::table)
                    .values(PricePointDB::from_candidate(point, generation))
                    .execute(conn)
                    .map_err(|e| {
                        StoreError::from_diesel(e, "unit_prices", &point.fund_id, &date_str)
                    })?;
                outcome.inserted += 1;
            }

            Ok(outcome)
        })
    }

    fn latest_price_date(&self, for_fund: &str) -> Result<Option<NaiveDate>> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let latest: Option<String> = unit_prices::table
            .filter(unit_prices::fund_id.eq(for_fund))
            .select(diesel::dsl::max(unit_prices::date))
            .first(&mut conn)?;

        latest.map(|raw| parse_stored_date(&raw)).transpose()
    }

    fn get_price(&self, for_fund: &str, on_date: NaiveDate) -> Result<Option<PricePoint>> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let date_str = on_date.format(DATE_FORMAT).to_string();
        let row: Option<PricePointDB> = unit_prices::table
            .filter(unit_prices::fund_id.eq(for_fund))
            .filter(unit_prices::date.eq(&date_str))
            .order(unit_prices::generation.desc())
            .first(&mut conn)
            .optional()?;

        row.map(|r| r.to_domain()).transpose()
    }

    fn append_quarantine(&self, entries: Vec<NewQuarantineEntry>) -> Result<usize> {
        self.quarantine.append(entries)
    }

    fn get_holdings_page(
        &self,
        selector: &FundSelector,
        range: &DateRange,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<HoldingRecord>> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let sql = format!(
            "SELECT h.* FROM holdings h
             INNER JOIN (
                 SELECT fund_id, as_of_date, MAX(generation) AS max_gen
                 FROM holdings
                 GROUP BY fund_id, as_of_date
             ) latest ON h.fund_id = latest.fund_id
                     AND h.as_of_date = latest.as_of_date
                     AND h.generation = latest.max_gen
             WHERE 1=1{}{}
             ORDER BY h.as_of_date ASC, h.fund_id ASC, h.row_index ASC
             LIMIT {} OFFSET {}",
            selector_clause(selector, "h.fund_id"),
            range_clause(range, "h.as_of_date"),
            limit,
            offset
        );

        let rows = diesel::sql_query(sql)
            .load::<HoldingDB>(&mut conn)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        rows.iter().map(HoldingDB::to_domain).collect()
    }

    fn get_prices_page(
        &self,
        selector: &FundSelector,
        range: &DateRange,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PricePoint>> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let sql = format!(
            "SELECT p.* FROM unit_prices p
             INNER JOIN (
                 SELECT fund_id, date, MAX(generation) AS max_gen
                 FROM unit_prices
                 GROUP BY fund_id, date
             ) latest ON p.fund_id = latest.fund_id
                     AND p.date = latest.date
                     AND p.generation = latest.max_gen
             WHERE 1=1{}{}
             ORDER BY p.date ASC, p.fund_id ASC
             LIMIT {} OFFSET {}",
            selector_clause(selector, "p.fund_id"),
            range_clause(range, "p.date"),
            limit,
            offset
        );

        let rows = diesel::sql_query(sql)
            .load::<PricePointDB>(&mut conn)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        rows.iter().map(PricePointDB::to_domain).collect()
    }

    fn get_holding_generations(
        &self,
        for_fund: &str,
        on_date: NaiveDate,
    ) -> Result<Vec<HoldingRecord>> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let date_str = on_date.format(DATE_FORMAT).to_string();
        let rows = holdings::table
            .filter(holdings::fund_id.eq(for_fund))
            .filter(holdings::as_of_date.eq(&date_str))
            .order((holdings::generation.asc(), holdings::row_index.asc()))
            .load::<HoldingDB>(&mut conn)?;

        rows.iter().map(HoldingDB::to_domain).collect()
    }

    fn get_price_generations(
        &self,
        for_fund: &str,
        on_date: NaiveDate,
    ) -> Result<Vec<PricePoint>> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let date_str = on_date.format(DATE_FORMAT).to_string();
        let rows = unit_prices::table
            .filter(unit_prices::fund_id.eq(for_fund))
            .filter(unit_prices::date.eq(&date_str))
            .order(unit_prices::generation.asc())
            .load::<PricePointDB>(&mut conn)?;

        rows.iter().map(PricePointDB::to_domain).collect()
    }

    fn list_quarantine(
        &self,
        selector: &FundSelector,
        range: &DateRange,
    ) -> Result<Vec<QuarantineEntry>> {
        self.quarantine.list(selector, range)
    }
}

fn selector_clause(selector: &FundSelector, column: &str) -> String {
    match selector.as_ids() {
        None => String::new(),
        Some(ids) if ids.is_empty() => " AND 1=0".to_string(),
        Some(ids) => {
            let quoted: Vec<String> = ids
                .iter()
                .map(|id| format!("'{}'", id.replace('\'', "''")))
                .collect();
            format!(" AND {} IN ({})", column, quoted.join(","))
        }
    }
}

fn range_clause(range: &DateRange, column: &str) -> String {
    let mut clause = String::new();
    if let Some(start) = range.start {
        clause.push_str(&format!(
            " AND {} >= '{}'",
            column,
            start.format(DATE_FORMAT)
        ));
    }
    if let Some(end) = range.end {
        clause.push_str(&format!(" AND {} <= '{}'", column, end.format(DATE_FORMAT)));
    }
    clause
}
