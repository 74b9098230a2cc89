use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DATE_FORMAT, DEFAULT_MAX_STALENESS_DAYS, DEFAULT_MIN_VOLATILITY_OBSERVATIONS,
    DEFAULT_VOLATILITY_WINDOW,
};

use super::metrics_errors::{MetricError, Result};

/// Kinds of derived comparative metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricKind {
    CumulativeReturn,
    AnnualizedReturn,
    Volatility,
    MaxDrawdown,
    AllocationAssetClass,
    AllocationSector,
    AllocationGeography,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::CumulativeReturn => "CUMULATIVE_RETURN",
            MetricKind::AnnualizedReturn => "ANNUALIZED_RETURN",
            MetricKind::Volatility => "VOLATILITY",
            MetricKind::MaxDrawdown => "MAX_DRAWDOWN",
            MetricKind::AllocationAssetClass => "ALLOCATION_ASSET_CLASS",
            MetricKind::AllocationSector => "ALLOCATION_SECTOR",
            MetricKind::AllocationGeography => "ALLOCATION_GEOGRAPHY",
        }
    }

    pub fn from_storage(s: &str) -> Result<Self> {
        match s {
            "CUMULATIVE_RETURN" => Ok(MetricKind::CumulativeReturn),
            "ANNUALIZED_RETURN" => Ok(MetricKind::AnnualizedReturn),
            "VOLATILITY" => Ok(MetricKind::Volatility),
            "MAX_DRAWDOWN" => Ok(MetricKind::MaxDrawdown),
            "ALLOCATION_ASSET_CLASS" => Ok(MetricKind::AllocationAssetClass),
            "ALLOCATION_SECTOR" => Ok(MetricKind::AllocationSector),
            "ALLOCATION_GEOGRAPHY" => Ok(MetricKind::AllocationGeography),
            other => Err(MetricError::InvalidData(format!(
                "unknown metric kind '{}'",
                other
            ))),
        }
    }
}

/// A derived, generation-stamped comparative metric. Recomputed, never
/// hand-edited; superseded rows are retained under earlier generations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetric {
    pub id: String,
    pub fund_id: String,
    pub metric_kind: MetricKind,
    /// Group key for allocation metrics (e.g. the asset class token).
    pub dimension: Option<String>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// `None` means the metric is not computable from available data.
    pub value: Option<Decimal>,
    pub generation: i64,
    pub computed_at: NaiveDateTime,
}

impl DerivedMetric {
    pub fn is_computable(&self) -> bool {
        self.value.is_some()
    }
}

/// Database model for derived metrics
#[derive(Queryable, Identifiable, Insertable, Selectable, QueryableByName, Debug, Clone)]
#[diesel(table_name = crate::schema::derived_metrics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DerivedMetricDB {
    pub id: String,
    pub fund_id: String,
    pub metric_kind: String,
    pub dimension: Option<String>,
    pub period_start: String,
    pub period_end: String,
    pub value: Option<String>,
    pub generation: i64,
    pub computed_at: NaiveDateTime,
}

impl DerivedMetricDB {
    pub fn to_domain(&self) -> Result<DerivedMetric> {
        let parse_date = |raw: &str| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
                MetricError::InvalidData(format!("stored date '{}' is not a date", raw))
            })
        };
        let value = self
            .value
            .as_deref()
            .map(|raw| {
                raw.parse::<Decimal>().map_err(|_| {
                    MetricError::InvalidData(format!("stored value '{}' is not a decimal", raw))
                })
            })
            .transpose()?;

        Ok(DerivedMetric {
            id: self.id.clone(),
            fund_id: self.fund_id.clone(),
            metric_kind: MetricKind::from_storage(&self.metric_kind)?,
            dimension: self.dimension.clone(),
            period_start: parse_date(&self.period_start)?,
            period_end: parse_date(&self.period_end)?,
            value,
            generation: self.generation,
            computed_at: self.computed_at,
        })
    }
}

/// A metric value pending persistence (generation assigned by the
/// repository).
#[derive(Debug, Clone)]
pub struct NewDerivedMetric {
    pub fund_id: String,
    pub metric_kind: MetricKind,
    pub dimension: Option<String>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub value: Option<Decimal>,
}

impl NewDerivedMetric {
    pub fn into_db(self, generation: i64) -> DerivedMetricDB {
        DerivedMetricDB {
            id: uuid::Uuid::new_v4().to_string(),
            fund_id: self.fund_id,
            metric_kind: self.metric_kind.as_str().to_string(),
            dimension: self.dimension,
            period_start: self.period_start.format(DATE_FORMAT).to_string(),
            period_end: self.period_end.format(DATE_FORMAT).to_string(),
            value: self.value.map(|v| v.to_string()),
            generation,
            computed_at: Utc::now().naive_utc(),
        }
    }
}

/// One date on a fund's aligned price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignedPricePoint {
    pub date: NaiveDate,
    pub price: Decimal,
    /// True when the price was carried forward from an earlier observation
    /// (stale-fill), false for an actual observation on this date.
    pub stale: bool,
    /// Date of the observation the price came from; equals `date` for
    /// observed points.
    pub observed_date: NaiveDate,
}

/// A fund's price series aligned onto the shared union calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignedSeries {
    pub fund_id: String,
    pub currency: String,
    pub points: Vec<AlignedPricePoint>,
}

impl AlignedSeries {
    pub fn observed_points(&self) -> impl Iterator<Item = &AlignedPricePoint> {
        self.points.iter().filter(|p| !p.stale)
    }
}

/// Tunables of the metric engine, sourced from pipeline settings.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Maximum age, in days, of a stale-filled price usable as a return
    /// endpoint.
    pub max_staleness_days: i64,
    /// Trailing window length, in observations, for volatility.
    pub volatility_window: usize,
    /// Minimum observations in the window before volatility is computable.
    pub min_volatility_observations: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            max_staleness_days: DEFAULT_MAX_STALENESS_DAYS,
            volatility_window: DEFAULT_VOLATILITY_WINDOW,
            min_volatility_observations: DEFAULT_MIN_VOLATILITY_OBSERVATIONS,
        }
    }
}

/// Summary of one recomputation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeSummary {
    pub funds: usize,
    pub metrics_written: usize,
    pub not_computable: usize,
}
