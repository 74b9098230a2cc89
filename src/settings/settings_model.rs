use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_GROUP_TIMEOUT_SECS, DEFAULT_MAX_STALENESS_DAYS, DEFAULT_MIN_VOLATILITY_OBSERVATIONS,
    DEFAULT_VOLATILITY_WINDOW, DEFAULT_WEIGHT_SUM_TOLERANCE,
};
use crate::metrics::MetricsConfig;
use crate::validation::ValidationConfig;

/// The externally tunable knobs of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSettings {
    pub weight_sum_tolerance: Decimal,
    pub group_timeout_secs: u64,
    pub max_staleness_days: i64,
    pub volatility_window: usize,
    pub min_volatility_observations: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            weight_sum_tolerance: Decimal::from_str(DEFAULT_WEIGHT_SUM_TOLERANCE)
                .unwrap_or(Decimal::ZERO),
            group_timeout_secs: DEFAULT_GROUP_TIMEOUT_SECS,
            max_staleness_days: DEFAULT_MAX_STALENESS_DAYS,
            volatility_window: DEFAULT_VOLATILITY_WINDOW,
            min_volatility_observations: DEFAULT_MIN_VOLATILITY_OBSERVATIONS,
        }
    }
}

impl PipelineSettings {
    /// Validation config for a run with the given flags.
    pub fn validation_config(&self, backfill: bool, supersede: bool) -> ValidationConfig {
        ValidationConfig {
            weight_sum_tolerance: self.weight_sum_tolerance,
            group_timeout: Duration::from_secs(self.group_timeout_secs),
            backfill,
            supersede,
        }
    }

    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            max_staleness_days: self.max_staleness_days,
            volatility_window: self.volatility_window,
            min_volatility_observations: self.min_volatility_observations,
        }
    }
}

/// Database model for one settings row
#[derive(Queryable, Insertable, AsChangeset, Serialize, Deserialize, Debug)]
#[diesel(table_name = crate::schema::app_settings)]
#[serde(rename_all = "camelCase")]
pub struct AppSetting {
    pub setting_key: String,
    pub setting_value: String,
}

pub(crate) const SETTING_WEIGHT_SUM_TOLERANCE: &str = "weight_sum_tolerance";
pub(crate) const SETTING_GROUP_TIMEOUT_SECS: &str = "group_timeout_secs";
pub(crate) const SETTING_MAX_STALENESS_DAYS: &str = "max_staleness_days";
pub(crate) const SETTING_VOLATILITY_WINDOW: &str = "volatility_window";
pub(crate) const SETTING_MIN_VOLATILITY_OBSERVATIONS: &str = "min_volatility_observations";
