use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Domain model for a registered superannuation fund
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundIdentity {
    pub id: String,
    pub name: String,
    pub reporting_entity: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Database model for funds
#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::funds)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FundDB {
    pub id: String,
    pub name: String,
    pub reporting_entity: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input model for registering a new fund
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFund {
    pub id: Option<String>,
    pub name: String,
    pub reporting_entity: Option<String>,
}

impl NewFund {
    pub fn validate(&self) -> crate::funds::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::funds::FundError::InvalidData(
                "Fund name cannot be empty".to_string(),
            ));
        }
        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(crate::funds::FundError::InvalidData(
                    "Fund id cannot be blank".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl From<FundDB> for FundIdentity {
    fn from(db: FundDB) -> Self {
        Self {
            id: db.id,
            name: db.name,
            reporting_entity: db.reporting_entity,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl From<NewFund> for FundDB {
    fn from(domain: NewFund) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: domain.id.unwrap_or_default(),
            name: domain.name,
            reporting_entity: domain.reporting_entity,
            created_at: now,
            updated_at: now,
        }
    }
}
