use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::{Decimal, MathematicalOps};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::constants::{DECIMAL_PRECISION, QUERY_PAGE_SIZE};
use crate::metrics::Result;
use crate::store::{CanonicalStoreTrait, DateRange, FundSelector, HoldingRecord, PricePoint};

use super::metrics_model::{
    AlignedPricePoint, AlignedSeries, DerivedMetric, MetricKind, MetricsConfig, NewDerivedMetric,
    RecomputeSummary,
};
use super::metrics_repository::MetricsRepository;

/// Dimension a holdings allocation aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationDimension {
    AssetClass,
    Sector,
    Geography,
}

impl AllocationDimension {
    fn metric_kind(&self) -> MetricKind {
        match self {
            AllocationDimension::AssetClass => MetricKind::AllocationAssetClass,
            AllocationDimension::Sector => MetricKind::AllocationSector,
            AllocationDimension::Geography => MetricKind::AllocationGeography,
        }
    }

    fn key_of(&self, holding: &HoldingRecord) -> String {
        match self {
            AllocationDimension::AssetClass => holding.asset_class.as_str().to_string(),
            AllocationDimension::Sector => holding
                .sector
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            AllocationDimension::Geography => holding.geography.as_str().to_string(),
        }
    }
}

/// Trait defining the contract for metric engine operations.
pub trait MetricsServiceTrait: Send + Sync {
    /// Aligns the selected funds' price series onto their shared union
    /// calendar, stale-filling gaps.
    fn aligned_series(
        &self,
        funds: &[String],
        range: DateRange,
    ) -> Result<Vec<AlignedSeries>>;

    /// Recomputes and persists all derived metrics for the selected funds
    /// over a date range. Idempotent and re-entrant; each pass writes fresh
    /// generations.
    fn recompute(
        &self,
        funds: &[String],
        range: DateRange,
        config: &MetricsConfig,
    ) -> Result<RecomputeSummary>;

    /// Latest-generation metrics for downstream consumers.
    fn latest_metrics(
        &self,
        selector: &FundSelector,
        kind: Option<MetricKind>,
    ) -> Result<Vec<DerivedMetric>>;
}

/// The metric engine: reads the canonical store, derives comparative
/// metrics, and persists them generation-stamped.
pub struct MetricsService {
    store: Arc<dyn CanonicalStoreTrait>,
    repository: MetricsRepository,
}

impl MetricsService {
    pub fn new(
        store: Arc<dyn CanonicalStoreTrait>,
        repository: MetricsRepository,
    ) -> Self {
        Self { store, repository }
    }

    fn fetch_prices(&self, selector: &FundSelector, range: &DateRange) -> Result<Vec<PricePoint>> {
        let mut all = Vec::new();
        let mut offset = 0i64;
        loop {
            let page = self
                .store
                .get_prices_page(selector, range, QUERY_PAGE_SIZE, offset)?;
            let len = page.len() as i64;
            offset += len;
            all.extend(page);
            if len < QUERY_PAGE_SIZE {
                break;
            }
        }
        Ok(all)
    }

    fn fetch_holdings(
        &self,
        selector: &FundSelector,
        range: &DateRange,
    ) -> Result<Vec<HoldingRecord>> {
        let mut all = Vec::new();
        let mut offset = 0i64;
        loop {
            let page = self
                .store
                .get_holdings_page(selector, range, QUERY_PAGE_SIZE, offset)?;
            let len = page.len() as i64;
            offset += len;
            all.extend(page);
            if len < QUERY_PAGE_SIZE {
                break;
            }
        }
        Ok(all)
    }
}

impl MetricsServiceTrait for MetricsService {
    fn aligned_series(&self, funds: &[String], range: DateRange) -> Result<Vec<AlignedSeries>> {
        let selector = FundSelector::Many(funds.to_vec());
        let prices = self.fetch_prices(&selector, &range)?;
        Ok(align_on_union_calendar(prices))
    }

    fn recompute(
        &self,
        funds: &[String],
        range: DateRange,
        config: &MetricsConfig,
    ) -> Result<RecomputeSummary> {
        let mut summary = RecomputeSummary::default();
        let series_set = self.aligned_series(funds, range)?;

        for series in &series_set {
            summary.funds += 1;
            let (period_start, period_end) = match (series.points.first(), series.points.last()) {
                (Some(first), Some(last)) => (first.date, last.date),
                _ => continue,
            };

            let cumulative =
                match cumulative_return(series, period_start, period_end, config.max_staleness_days)
                {
                    Ok(value) => Some(value.round_dp(DECIMAL_PRECISION)),
                    Err(e) => {
                        warn!(
                            "Cumulative return not computable for fund '{}': {}",
                            series.fund_id, e
                        );
                        None
                    }
                };
            let annualized = cumulative
                .map(|value| annualized_return(period_start, period_end, value))
                .map(|value| value.round_dp(DECIMAL_PRECISION));
            let volatility = log_return_volatility(
                series,
                config.volatility_window,
                config.min_volatility_observations,
            )
            .map(|value| value.round_dp(DECIMAL_PRECISION));
            let drawdown = max_drawdown(series).map(|value| value.round_dp(DECIMAL_PRECISION));

            let point_metrics = [
                (MetricKind::CumulativeReturn, cumulative),
                (MetricKind::AnnualizedReturn, annualized),
                (MetricKind::Volatility, volatility),
                (MetricKind::MaxDrawdown, drawdown),
            ];

            for (kind, value) in point_metrics {
                if value.is_none() {
                    summary.not_computable += 1;
                }
                self.repository.save_metrics(
                    &series.fund_id,
                    kind,
                    vec![NewDerivedMetric {
                        fund_id: series.fund_id.clone(),
                        metric_kind: kind,
                        dimension: None,
                        period_start,
                        period_end,
                        value,
                    }],
                )?;
                summary.metrics_written += 1;
            }
        }

        // Allocation aggregates come from the latest holdings group of each
        // fund inside the range.
        let holdings = self.fetch_holdings(&FundSelector::Many(funds.to_vec()), &range)?;
        let mut latest_by_fund: HashMap<String, NaiveDate> = HashMap::new();
        for holding in &holdings {
            latest_by_fund
                .entry(holding.fund_id.clone())
                .and_modify(|d| *d = (*d).max(holding.as_of_date))
                .or_insert(holding.as_of_date);
        }

        for (fund_id, as_of_date) in &latest_by_fund {
            let group: Vec<&HoldingRecord> = holdings
                .iter()
                .filter(|h| &h.fund_id == fund_id && h.as_of_date == *as_of_date)
                .collect();

            for dimension in [
                AllocationDimension::AssetClass,
                AllocationDimension::Sector,
                AllocationDimension::Geography,
            ] {
                let sums = allocation_weights(&group, dimension);
                let rows: Vec<NewDerivedMetric> = sums
                    .into_iter()
                    .map(|(key, total)| NewDerivedMetric {
                        fund_id: fund_id.clone(),
                        metric_kind: dimension.metric_kind(),
                        dimension: Some(key),
                        period_start: *as_of_date,
                        period_end: *as_of_date,
                        value: Some(total.round_dp(DECIMAL_PRECISION)),
                    })
                    .collect();

                summary.metrics_written += rows.len();
                self.repository
                    .save_metrics(fund_id, dimension.metric_kind(), rows)?;
            }
        }

        debug!(
            "Recompute pass: {} funds, {} metrics written, {} not computable",
            summary.funds, summary.metrics_written, summary.not_computable
        );
        Ok(summary)
    }

    fn latest_metrics(
        &self,
        selector: &FundSelector,
        kind: Option<MetricKind>,
    ) -> Result<Vec<DerivedMetric>> {
        self.repository.latest_metrics(selector, kind)
    }
}

/// Aligns per-fund price series onto the union of all observed dates.
/// Gaps are stale-filled: the last known price carries forward, flagged so
/// consumers can distinguish observed from filled values. Never
/// interpolates. Dates before a fund's first observation are omitted for
/// that fund.
pub fn align_on_union_calendar(prices: Vec<PricePoint>) -> Vec<AlignedSeries> {
    let calendar: BTreeSet<NaiveDate> = prices.iter().map(|p| p.date).collect();

    let mut by_fund: BTreeMap<String, BTreeMap<NaiveDate, PricePoint>> = BTreeMap::new();
    for point in prices {
        by_fund
            .entry(point.fund_id.clone())
            .or_default()
            .insert(point.date, point);
    }

    by_fund
        .into_iter()
        .map(|(fund_id, observations)| {
            let currency = observations
                .values()
                .next()
                .map(|p| p.currency.clone())
                .unwrap_or_default();

            let mut points = Vec::with_capacity(calendar.len());
            let mut last: Option<(Decimal, NaiveDate)> = None;

            for date in &calendar {
                match observations.get(date) {
                    Some(observed) => {
                        last = Some((observed.price, *date));
                        points.push(AlignedPricePoint {
                            date: *date,
                            price: observed.price,
                            stale: false,
                            observed_date: *date,
                        });
                    }
                    None => {
                        if let Some((price, observed_date)) = last {
                            points.push(AlignedPricePoint {
                                date: *date,
                                price,
                                stale: true,
                                observed_date,
                            });
                        }
                        // No observation yet: the fund's series starts later.
                    }
                }
            }

            AlignedSeries {
                fund_id,
                currency,
                points,
            }
        })
        .collect()
}

/// Price usable at `at`: the latest point on or before the date, with the
/// age of its underlying observation in days.
fn endpoint_price(series: &AlignedSeries, at: NaiveDate) -> Option<(Decimal, i64)> {
    series
        .points
        .iter()
        .rev()
        .find(|p| p.date <= at)
        .map(|p| (p.price, (at - p.observed_date).num_days()))
}

/// Cumulative return over [start, end]: price(end)/price(start) − 1.
/// Undefined when either endpoint has no observation within the staleness
/// window.
pub fn cumulative_return(
    series: &AlignedSeries,
    start: NaiveDate,
    end: NaiveDate,
    max_staleness_days: i64,
) -> Result<Decimal> {
    let insufficient = |detail: String| crate::metrics::MetricError::InsufficientData {
        fund_id: series.fund_id.clone(),
        detail,
    };

    let (start_price, start_age) = endpoint_price(series, start)
        .ok_or_else(|| insufficient(format!("no observation on or before {}", start)))?;
    let (end_price, end_age) = endpoint_price(series, end)
        .ok_or_else(|| insufficient(format!("no observation on or before {}", end)))?;

    if start_age > max_staleness_days {
        return Err(insufficient(format!(
            "start endpoint {} is {} days stale (max {})",
            start, start_age, max_staleness_days
        )));
    }
    if end_age > max_staleness_days {
        return Err(insufficient(format!(
            "end endpoint {} is {} days stale (max {})",
            end, end_age, max_staleness_days
        )));
    }
    if start_price.is_zero() {
        return Err(insufficient(format!("zero price at start endpoint {}", start)));
    }

    Ok(end_price / start_price - Decimal::ONE)
}

/// Annualized return derived from a cumulative return over the period.
/// Periods under a year report the unannualized figure.
pub fn annualized_return(start: NaiveDate, end: NaiveDate, total_return: Decimal) -> Decimal {
    if start > end {
        return Decimal::ZERO;
    }
    if total_return <= Decimal::NEGATIVE_ONE {
        return Decimal::NEGATIVE_ONE;
    }

    let days = (end - start).num_days();
    if days <= 0 {
        return total_return;
    }

    let years = Decimal::from(days) / Decimal::new(36525, 2);
    if years < Decimal::ONE {
        return total_return;
    }

    let base = Decimal::ONE + total_return;
    if base <= Decimal::ZERO {
        return Decimal::NEGATIVE_ONE;
    }

    let exponent = Decimal::ONE / years;
    base.powd(exponent) - Decimal::ONE
}

/// Standard deviation of period-over-period log returns over the trailing
/// window of observed points. `None` when fewer than `min_observations`
/// observations fall in the window; a sparse series must report "not
/// computable" rather than a misleading zero.
pub fn log_return_volatility(
    series: &AlignedSeries,
    window: usize,
    min_observations: usize,
) -> Option<Decimal> {
    let observed: Vec<Decimal> = series.observed_points().map(|p| p.price).collect();
    let start = observed.len().saturating_sub(window);
    let windowed = &observed[start..];

    if windowed.len() < min_observations.max(2) {
        return None;
    }

    let mut log_returns = Vec::with_capacity(windowed.len() - 1);
    for pair in windowed.windows(2) {
        if pair[0] <= Decimal::ZERO || pair[1] <= Decimal::ZERO {
            return None;
        }
        let ratio = pair[1] / pair[0];
        log_returns.push(ratio.ln());
    }

    let count = Decimal::from(log_returns.len());
    let mean: Decimal = log_returns.iter().sum::<Decimal>() / count;
    let sum_squared_diff: Decimal = log_returns
        .iter()
        .map(|r| {
            let diff = *r - mean;
            diff * diff
        })
        .sum();

    let divisor = count - Decimal::ONE;
    if divisor <= Decimal::ZERO {
        return None;
    }
    let variance = sum_squared_diff / divisor;
    variance.sqrt()
}

/// Largest peak-to-trough decline over the aligned series. `None` for
/// series with fewer than two points.
pub fn max_drawdown(series: &AlignedSeries) -> Option<Decimal> {
    if series.points.len() < 2 {
        return None;
    }

    let mut peak = series.points[0].price;
    let mut worst = Decimal::ZERO;

    for point in &series.points[1..] {
        peak = peak.max(point.price);
        if !peak.is_zero() {
            let drawdown = (peak - point.price) / peak;
            worst = worst.max(drawdown);
        }
    }

    Some(worst)
}

/// Deterministic group-by-and-sum of holding weights along one dimension.
/// Input order never changes the result.
pub fn allocation_weights(
    group: &[&HoldingRecord],
    dimension: AllocationDimension,
) -> BTreeMap<String, Decimal> {
    let mut sums: BTreeMap<String, Decimal> = BTreeMap::new();
    for holding in group {
        let key = dimension.key_of(holding);
        *sums.entry(key).or_insert(Decimal::ZERO) += holding.weight;
    }
    sums
}
