use async_trait::async_trait;
use futures::future::join_all;
use log::{error, info, warn};
use std::sync::Arc;

use crate::adapters::AdapterRegistry;
use crate::funds::FundServiceTrait;
use crate::mapping::{FieldMapping, MappingServiceTrait};
use crate::metrics::MetricsServiceTrait;
use crate::settings::SettingsServiceTrait;
use crate::store::DateRange;
use crate::validation::{ValidationReport, ValidationServiceTrait};

use super::ingest_errors::{IngestError, Result};
use super::ingest_model::{IngestJob, IngestRun};
use super::ingest_repository::IngestRunRepository;

/// Trait defining the contract for orchestration operations.
#[async_trait]
pub trait IngestServiceTrait: Send + Sync {
    /// Drives one artifact through adapter, mapper, validator, and store,
    /// and returns the persisted run report. Never propagates per-artifact
    /// failures; they land in the run's status instead.
    fn run_artifact(&self, job: IngestJob) -> Result<IngestRun>;

    /// Runs a batch of jobs, one task per (fund, artifact). Funds are
    /// disjoint in the store keyspace, so jobs run concurrently; one job's
    /// failure never blocks the others.
    async fn run_batch(self: Arc<Self>, jobs: Vec<IngestJob>) -> Vec<IngestRun>;

    /// Quarantines validation groups held open past the configured timeout.
    fn expire_stale_groups(&self) -> Result<usize>;

    /// Recent run reports for a fund, newest first.
    fn list_runs(&self, fund_id: &str, limit: i64) -> Result<Vec<IngestRun>>;
}

/// The ingestion orchestrator.
pub struct IngestService {
    adapters: AdapterRegistry,
    funds: Arc<dyn FundServiceTrait>,
    mapping: Arc<dyn MappingServiceTrait>,
    validator: Arc<dyn ValidationServiceTrait>,
    metrics: Arc<dyn MetricsServiceTrait>,
    settings: Arc<dyn SettingsServiceTrait>,
    runs: IngestRunRepository,
}

impl IngestService {
    pub fn new(
        adapters: AdapterRegistry,
        funds: Arc<dyn FundServiceTrait>,
        mapping: Arc<dyn MappingServiceTrait>,
        validator: Arc<dyn ValidationServiceTrait>,
        metrics: Arc<dyn MetricsServiceTrait>,
        settings: Arc<dyn SettingsServiceTrait>,
        runs: IngestRunRepository,
    ) -> Self {
        Self {
            adapters,
            funds,
            mapping,
            validator,
            metrics,
            settings,
            runs,
        }
    }

    /// The fallible pipeline body; any error here fails the whole artifact.
    fn process_artifact(&self, job: &IngestJob) -> Result<ValidationReport> {
        self.funds.get_fund(&job.fund_id)?;

        let adapter = self.adapters.get(job.format)?;
        let records = adapter.parse(&job.artifact)?;
        info!(
            "Parsed {} records from '{}' for fund '{}'",
            records.len(),
            job.artifact.name(),
            job.fund_id
        );

        let format_str = job.format.to_string();
        let mappings: Vec<FieldMapping> = match job.options.mapping_version {
            Some(version) => vec![self
                .mapping
                .get_mapping_version(&job.fund_id, &format_str, version)?],
            None => self
                .mapping
                .list_mapping_versions(&job.fund_id, &format_str)?,
        };

        let batch = self
            .mapping
            .map_records(&job.fund_id, job.format, records, &mappings);

        let settings = self.settings.get_pipeline_settings()?;
        let config =
            settings.validation_config(job.options.backfill, job.options.supersede);

        let mut report = ValidationReport::default();
        report.quarantined += self
            .validator
            .quarantine_mapping_rejects(&job.fund_id, batch.rejects)?;

        if job.format.is_holdings() {
            let submit = self.validator.submit_holdings(batch.holdings, &config)?;
            report.merge(&submit);
            // End-of-artifact closes every group this artifact opened.
            let closed = self.validator.close_groups(&job.fund_id, &config)?;
            report.merge(&closed);
        } else {
            let prices = self.validator.validate_prices(batch.prices, &config)?;
            report.merge(&prices);
        }

        Ok(report)
    }

    /// Metric recomputation, triggered only once accepted records are
    /// durably committed. A recompute failure is logged, not folded into
    /// the ingest run outcome.
    fn trigger_recompute(&self, fund_id: &str) {
        let settings = match self.settings.get_pipeline_settings() {
            Ok(settings) => settings,
            Err(e) => {
                error!("Skipping metric recompute for '{}': {}", fund_id, e);
                return;
            }
        };
        if let Err(e) = self.metrics.recompute(
            &[fund_id.to_string()],
            DateRange::default(),
            &settings.metrics_config(),
        ) {
            error!("Metric recompute failed for fund '{}': {}", fund_id, e);
        }
    }
}

#[async_trait]
impl IngestServiceTrait for IngestService {
    fn run_artifact(&self, job: IngestJob) -> Result<IngestRun> {
        let mut run = IngestRun::new(&job.fund_id, job.format);
        self.runs.create(&run)?;

        match self.process_artifact(&job) {
            Ok(report) => {
                run.complete(&report);
                self.runs.update(&run)?;
                info!(
                    "Run {} for fund '{}': {:?}, {} accepted, {} quarantined",
                    run.id, run.fund_id, run.status, run.accepted_count, run.quarantined_count
                );
                if report.accepted > 0 {
                    self.trigger_recompute(&job.fund_id);
                }
            }
            Err(e) => {
                warn!("Run for fund '{}' failed: {}", job.fund_id, e);
                run.fail(e.to_string());
                self.runs.update(&run)?;
            }
        }

        Ok(run)
    }

    async fn run_batch(self: Arc<Self>, jobs: Vec<IngestJob>) -> Vec<IngestRun> {
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let service = self.clone();
                tokio::task::spawn_blocking(move || service.run_artifact(job))
            })
            .collect();

        let mut runs = Vec::with_capacity(handles.len());
        for outcome in join_all(handles).await {
            match outcome {
                Ok(Ok(run)) => runs.push(run),
                Ok(Err(e)) => {
                    // Run bookkeeping itself failed; the artifact outcome is
                    // lost but other funds continue.
                    error!("Run could not be recorded: {}", e);
                }
                Err(e) => {
                    error!("Ingestion task panicked: {}", e);
                }
            }
        }

        if let Err(e) = self.expire_stale_groups() {
            error!("Expiring stale validation groups failed: {}", e);
        }

        runs
    }

    fn expire_stale_groups(&self) -> Result<usize> {
        let settings = self.settings.get_pipeline_settings()?;
        let config = settings.validation_config(false, false);
        let report = self.validator.close_expired_groups(&config)?;
        Ok(report.quarantined)
    }

    fn list_runs(&self, fund_id: &str, limit: i64) -> Result<Vec<IngestRun>> {
        self.runs.list_for_fund(fund_id, limit)
    }
}
