use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use crate::db::get_connection;
use crate::metrics::{MetricError, Result};
use crate::schema::derived_metrics;
use crate::store::FundSelector;

use super::metrics_model::{DerivedMetric, DerivedMetricDB, MetricKind, NewDerivedMetric};

/// Repository for generation-stamped derived metrics. Writes supersede,
/// never delete: each save takes the next generation for its
/// (fund, metric kind) and earlier generations stay queryable for audit.
pub struct MetricsRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
}

impl MetricsRepository {
    pub fn new(pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>) -> Self {
        Self { pool }
    }

    /// Persists one fund's metrics of one kind under a single fresh
    /// generation. The counter increments inside the insert transaction, so
    /// concurrent recomputations serialize cleanly instead of corrupting it.
    pub fn save_metrics(
        &self,
        for_fund: &str,
        kind: MetricKind,
        metrics: Vec<NewDerivedMetric>,
    ) -> Result<i64> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| MetricError::DatabaseError(e.to_string()))?;

        conn.transaction::<i64, MetricError, _>(|conn| {
            let latest: Option<i64> = derived_metrics::table
                .filter(derived_metrics::fund_id.eq(for_fund))
                .filter(derived_metrics::metric_kind.eq(kind.as_str()))
                .select(diesel::dsl::max(derived_metrics::generation))
                .first(conn)?;

            let generation = latest.unwrap_or(-1) + 1;

            let rows: Vec<DerivedMetricDB> = metrics
                .into_iter()
                .map(|metric| metric.into_db(generation))
                .collect();

            for chunk in rows.chunks(100) {
                diesel::insert_into(derived_metrics::table)
                    .values(chunk)
                    .execute(conn)?;
            }

            Ok(generation)
        })
    }

    /// Latest-generation metrics, optionally narrowed by fund and kind.
    pub fn latest_metrics(
        &self,
        selector: &FundSelector,
        kind: Option<MetricKind>,
    ) -> Result<Vec<DerivedMetric>> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| MetricError::DatabaseError(e.to_string()))?;

        let mut filters = String::new();
        if let Some(ids) = selector.as_ids() {
            if ids.is_empty() {
                filters.push_str(" AND 1=0");
            } else {
                let quoted: Vec<String> = ids
                    .iter()
                    .map(|id| format!("'{}'", id.replace('\'', "''")))
                    .collect();
                filters.push_str(&format!(" AND m.fund_id IN ({})", quoted.join(",")));
            }
        }
        if let Some(kind) = kind {
            filters.push_str(&format!(" AND m.metric_kind = '{}'", kind.as_str()));
        }

        let sql = format!(
            "SELECT m.* FROM derived_metrics m
             INNER JOIN (
                 SELECT fund_id, metric_kind, MAX(generation) AS max_gen
                 FROM derived_metrics
                 GROUP BY fund_id, metric_kind
             ) latest ON m.fund_id = latest.fund_id
                     AND m.metric_kind = latest.metric_kind
                     AND m.generation = latest.max_gen
             WHERE 1=1{}
             ORDER BY m.fund_id ASC, m.metric_kind ASC, m.dimension ASC",
            filters
        );

        let rows = diesel::sql_query(sql)
            .load::<DerivedMetricDB>(&mut conn)
            .map_err(|e| MetricError::DatabaseError(e.to_string()))?;

        rows.iter().map(DerivedMetricDB::to_domain).collect()
    }
}
