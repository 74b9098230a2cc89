use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use crate::db::get_connection;
use crate::errors::{DatabaseError, Error, Result};
use crate::schema::app_settings;
use crate::schema::app_settings::dsl::*;

use super::settings_model::AppSetting;

/// Trait defining the contract for settings persistence.
pub trait SettingsRepositoryTrait: Send + Sync {
    fn get_setting(&self, key: &str) -> Result<String>;
    fn update_setting(&self, key: &str, value: &str) -> Result<()>;
}

/// Key-value settings repository
pub struct SettingsRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
}

impl SettingsRepository {
    pub fn new(pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>) -> Self {
        Self { pool }
    }
}

impl SettingsRepositoryTrait for SettingsRepository {
    fn get_setting(&self, key: &str) -> Result<String> {
        let mut conn = get_connection(&self.pool)?;

        app_settings
            .filter(setting_key.eq(key))
            .select(setting_value)
            .first::<String>(&mut conn)
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(e)))
    }

    fn update_setting(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;

        let setting = AppSetting {
            setting_key: key.to_string(),
            setting_value: value.to_string(),
        };

        diesel::replace_into(app_settings::table)
            .values(&setting)
            .execute(&mut conn)
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(e)))?;

        Ok(())
    }
}
