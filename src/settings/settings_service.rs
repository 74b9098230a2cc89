use log::warn;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::{DatabaseError, Error, Result};

use super::settings_model::{
    PipelineSettings, SETTING_GROUP_TIMEOUT_SECS, SETTING_MAX_STALENESS_DAYS,
    SETTING_MIN_VOLATILITY_OBSERVATIONS, SETTING_VOLATILITY_WINDOW,
    SETTING_WEIGHT_SUM_TOLERANCE,
};
use super::settings_repository::SettingsRepositoryTrait;

/// Trait defining the contract for settings operations.
pub trait SettingsServiceTrait: Send + Sync {
    /// Current pipeline settings; unset keys fall back to defaults.
    fn get_pipeline_settings(&self) -> Result<PipelineSettings>;
    fn update_pipeline_settings(&self, settings: &PipelineSettings) -> Result<()>;
}

/// Service exposing the typed pipeline settings over the key-value store
pub struct SettingsService {
    repository: Arc<dyn SettingsRepositoryTrait>,
}

impl SettingsService {
    pub fn new(repository: Arc<dyn SettingsRepositoryTrait>) -> Self {
        Self { repository }
    }

    /// Reads one key, treating "not found" as unset.
    fn get_optional(&self, key: &str) -> Result<Option<String>> {
        match self.repository.get_setting(key) {
            Ok(value) => Ok(Some(value)),
            Err(Error::Database(DatabaseError::QueryFailed(diesel::result::Error::NotFound))) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn get_parsed<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get_optional(key)? {
            Some(raw) => match raw.parse::<T>() {
                Ok(value) => Ok(value),
                Err(_) => {
                    warn!("Setting '{}' has unparseable value '{}'; using default", key, raw);
                    Ok(default)
                }
            },
            None => Ok(default),
        }
    }
}

impl SettingsServiceTrait for SettingsService {
    fn get_pipeline_settings(&self) -> Result<PipelineSettings> {
        let defaults = PipelineSettings::default();

        Ok(PipelineSettings {
            weight_sum_tolerance: self
                .get_optional(SETTING_WEIGHT_SUM_TOLERANCE)?
                .and_then(|raw| Decimal::from_str(&raw).ok())
                .unwrap_or(defaults.weight_sum_tolerance),
            group_timeout_secs: self
                .get_parsed(SETTING_GROUP_TIMEOUT_SECS, defaults.group_timeout_secs)?,
            max_staleness_days: self
                .get_parsed(SETTING_MAX_STALENESS_DAYS, defaults.max_staleness_days)?,
            volatility_window: self
                .get_parsed(SETTING_VOLATILITY_WINDOW, defaults.volatility_window)?,
            min_volatility_observations: self.get_parsed(
                SETTING_MIN_VOLATILITY_OBSERVATIONS,
                defaults.min_volatility_observations,
            )?,
        })
    }

    fn update_pipeline_settings(&self, settings: &PipelineSettings) -> Result<()> {
        self.repository.update_setting(
            SETTING_WEIGHT_SUM_TOLERANCE,
            &settings.weight_sum_tolerance.to_string(),
        )?;
        self.repository.update_setting(
            SETTING_GROUP_TIMEOUT_SECS,
            &settings.group_timeout_secs.to_string(),
        )?;
        self.repository.update_setting(
            SETTING_MAX_STALENESS_DAYS,
            &settings.max_staleness_days.to_string(),
        )?;
        self.repository.update_setting(
            SETTING_VOLATILITY_WINDOW,
            &settings.volatility_window.to_string(),
        )?;
        self.repository.update_setting(
            SETTING_MIN_VOLATILITY_OBSERVATIONS,
            &settings.min_volatility_observations.to_string(),
        )?;
        Ok(())
    }
}
