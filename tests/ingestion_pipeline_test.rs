mod common;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use superfund_core::adapters::{AdapterRegistry, RawArtifact, SourceFormat};
use superfund_core::db::DbPool;
use superfund_core::funds::{FundService, FundServiceTrait, NewFund};
use superfund_core::ingest::{
    IngestJob, IngestOptions, IngestRunRepository, IngestService, IngestServiceTrait, RunStatus,
};
use superfund_core::mapping::{
    FieldMappingRules, MappingService, MappingServiceTrait, NewFieldMapping,
};
use superfund_core::metrics::{
    MetricKind, MetricsRepository, MetricsService, MetricsServiceTrait,
};
use superfund_core::settings::{SettingsRepository, SettingsService};
use superfund_core::store::{
    CanonicalStoreRepository, CanonicalStoreService, CanonicalStoreTrait, DateRange, FundSelector,
    StoreError,
};
use superfund_core::validation::ValidationService;

struct Pipeline {
    ingest: Arc<IngestService>,
    store: Arc<dyn CanonicalStoreTrait>,
    reader: CanonicalStoreService,
    metrics: Arc<MetricsService>,
    funds: FundService,
    mapping: MappingService,
}

fn build_pipeline(pool: &Arc<DbPool>) -> Pipeline {
    let store: Arc<dyn CanonicalStoreTrait> =
        Arc::new(CanonicalStoreRepository::new(pool.clone()));
    let funds = Arc::new(FundService::new(pool.clone()));
    let mapping = Arc::new(MappingService::new(pool.clone()));
    let validator = Arc::new(ValidationService::new(store.clone()));
    let metrics = Arc::new(MetricsService::new(
        store.clone(),
        MetricsRepository::new(pool.clone()),
    ));
    let settings = Arc::new(SettingsService::new(Arc::new(SettingsRepository::new(
        pool.clone(),
    ))));

    let ingest = Arc::new(IngestService::new(
        AdapterRegistry::new(),
        funds.clone(),
        mapping.clone(),
        validator,
        metrics.clone(),
        settings,
        IngestRunRepository::new(pool.clone()),
    ));

    Pipeline {
        ingest,
        store,
        reader: CanonicalStoreService::new(Arc::new(CanonicalStoreRepository::new(pool.clone()))),
        metrics,
        funds: FundService::new(pool.clone()),
        mapping: MappingService::new(pool.clone()),
    }
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn register_fund(pipeline: &Pipeline, id: &str, name: &str) {
    pipeline
        .funds
        .register_fund(NewFund {
            id: Some(id.to_string()),
            name: name.to_string(),
            reporting_entity: None,
        })
        .expect("fund registration");
}

fn register_default_mapping(pipeline: &Pipeline, fund_id: &str, format: SourceFormat) {
    pipeline
        .mapping
        .register_mapping(NewFieldMapping {
            fund_id: fund_id.to_string(),
            source_format: format.to_string(),
            effective_from: date("2020-01-01"),
            rules: FieldMappingRules::default(),
        })
        .expect("mapping registration");
}

fn holdings_job(fund_id: &str, body: &str) -> IngestJob {
    IngestJob {
        fund_id: fund_id.to_string(),
        format: SourceFormat::DelimitedHoldings,
        artifact: RawArtifact::from_bytes("holdings.csv", body.as_bytes().to_vec()),
        options: IngestOptions::default(),
    }
}

fn prices_job(fund_id: &str, body: &str) -> IngestJob {
    IngestJob {
        fund_id: fund_id.to_string(),
        format: SourceFormat::DelimitedPrices,
        artifact: RawArtifact::from_bytes("prices.csv", body.as_bytes().to_vec()),
        options: IngestOptions::default(),
    }
}

const HOLDINGS_OK: &str = "\
Effective Date,Asset Class Name,Int/Ext,Name/Kind of Investment Item,Currency,Listed Country,Weighting
2024-06-30,Listed Equity,Externally Managed,Global Shares Fund,USD,US,55.0
2024-06-30,Fixed Interest,Externally Managed,Government Bonds,AUD,AU,25.0
2024-06-30,Cash,Internally Managed,Cash at bank,AUD,AU,19.9
";

const HOLDINGS_BAD_SUM: &str = "\
Effective Date,Asset Class Name,Int/Ext,Name/Kind of Investment Item,Currency,Listed Country,Weighting
2024-06-30,Listed Equity,Externally Managed,Global Shares Fund,USD,US,50.0
2024-06-30,Fixed Interest,Externally Managed,Government Bonds,AUD,AU,30.0
2024-06-30,Cash,Internally Managed,Cash at bank,AUD,AU,10.0
";

const PRICES_WEEK: &str = "\
Date,Unit Price,Currency
2024-07-01,1.00,AUD
2024-07-02,1.02,AUD
2024-07-03,1.05,AUD
2024-07-04,1.08,AUD
2024-07-05,1.10,AUD
";

#[test]
fn test_holdings_artifact_ingested_end_to_end() {
    let db = common::setup_test_db();
    let pipeline = build_pipeline(&db.pool);
    register_fund(&pipeline, "unisuper", "UniSuper");
    register_default_mapping(&pipeline, "unisuper", SourceFormat::DelimitedHoldings);

    let run = pipeline
        .ingest
        .run_artifact(holdings_job("unisuper", HOLDINGS_OK))
        .expect("run recorded");

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.accepted_count, 3);
    assert_eq!(run.quarantined_count, 0);

    let stored: Vec<_> = pipeline
        .reader
        .query_holdings(FundSelector::One("unisuper".to_string()), DateRange::default())
        .collect::<Result<Vec<_>, _>>()
        .expect("query holdings");

    assert_eq!(stored.len(), 3);
    let total: Decimal = stored.iter().map(|h| h.weight).sum();
    assert_eq!(total, dec!(0.999));
    assert!(stored.iter().all(|h| h.as_of_date == date("2024-06-30")));
}

#[test]
fn test_weight_sum_violation_quarantines_whole_group() {
    let db = common::setup_test_db();
    let pipeline = build_pipeline(&db.pool);
    register_fund(&pipeline, "unisuper", "UniSuper");
    register_default_mapping(&pipeline, "unisuper", SourceFormat::DelimitedHoldings);

    let run = pipeline
        .ingest
        .run_artifact(holdings_job("unisuper", HOLDINGS_BAD_SUM))
        .expect("run recorded");

    assert_eq!(run.status, RunStatus::Partial);
    assert_eq!(run.accepted_count, 0);
    assert_eq!(run.quarantined_count, 3);

    let entries = pipeline
        .reader
        .list_quarantine(FundSelector::One("unisuper".to_string()), DateRange::default())
        .expect("quarantine listing");
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.check_name == "weight-sum"));

    let stored: Vec<_> = pipeline
        .reader
        .query_holdings(FundSelector::One("unisuper".to_string()), DateRange::default())
        .collect::<Result<Vec<_>, _>>()
        .expect("query holdings");
    assert!(stored.is_empty());
}

#[test]
fn test_reingesting_same_artifact_is_idempotent() {
    let db = common::setup_test_db();
    let pipeline = build_pipeline(&db.pool);
    register_fund(&pipeline, "rest", "Rest Super");
    register_default_mapping(&pipeline, "rest", SourceFormat::DelimitedHoldings);

    let first = pipeline
        .ingest
        .run_artifact(holdings_job("rest", HOLDINGS_OK))
        .expect("first run");
    let second = pipeline
        .ingest
        .run_artifact(holdings_job("rest", HOLDINGS_OK))
        .expect("second run");

    assert_eq!(first.status, RunStatus::Completed);
    assert_eq!(second.status, RunStatus::Completed);
    assert_eq!(second.quarantined_count, 0);

    let stored: Vec<_> = pipeline
        .reader
        .query_holdings(FundSelector::One("rest".to_string()), DateRange::default())
        .collect::<Result<Vec<_>, _>>()
        .expect("query holdings");
    assert_eq!(stored.len(), 3);
}

#[test]
fn test_price_series_ingestion_and_metrics() {
    let db = common::setup_test_db();
    let pipeline = build_pipeline(&db.pool);
    register_fund(&pipeline, "caresuper", "CareSuper");
    register_default_mapping(&pipeline, "caresuper", SourceFormat::DelimitedPrices);

    let run = pipeline
        .ingest
        .run_artifact(prices_job("caresuper", PRICES_WEEK))
        .expect("run recorded");

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.accepted_count, 5);

    // 1.00 -> 1.10 over the period.
    let metrics = pipeline
        .metrics
        .latest_metrics(
            &FundSelector::One("caresuper".to_string()),
            Some(MetricKind::CumulativeReturn),
        )
        .expect("latest metrics");
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].value, Some(dec!(0.10)));
    assert_eq!(metrics[0].period_start, date("2024-07-01"));
    assert_eq!(metrics[0].period_end, date("2024-07-05"));

    // 5 observations < minimum 10: volatility must be "not computable".
    let volatility = pipeline
        .metrics
        .latest_metrics(
            &FundSelector::One("caresuper".to_string()),
            Some(MetricKind::Volatility),
        )
        .expect("latest metrics");
    assert_eq!(volatility.len(), 1);
    assert_eq!(volatility[0].value, None);
}

#[test]
fn test_out_of_order_price_quarantined_and_run_partial() {
    let db = common::setup_test_db();
    let pipeline = build_pipeline(&db.pool);
    register_fund(&pipeline, "caresuper", "CareSuper");
    register_default_mapping(&pipeline, "caresuper", SourceFormat::DelimitedPrices);

    pipeline
        .ingest
        .run_artifact(prices_job("caresuper", PRICES_WEEK))
        .expect("first run");

    // An earlier date than the stored latest, without a backfill flag.
    let run = pipeline
        .ingest
        .run_artifact(prices_job(
            "caresuper",
            "Date,Unit Price,Currency\n2024-06-28,0.99,AUD\n",
        ))
        .expect("second run");

    assert_eq!(run.status, RunStatus::Partial);
    assert_eq!(run.quarantined_count, 1);

    let entries = pipeline
        .reader
        .list_quarantine(FundSelector::One("caresuper".to_string()), DateRange::default())
        .expect("quarantine listing");
    assert!(entries.iter().any(|e| e.check_name == "monotonic-date"));
}

#[test]
fn test_backfill_override_accepts_earlier_dates() {
    let db = common::setup_test_db();
    let pipeline = build_pipeline(&db.pool);
    register_fund(&pipeline, "caresuper", "CareSuper");
    register_default_mapping(&pipeline, "caresuper", SourceFormat::DelimitedPrices);

    pipeline
        .ingest
        .run_artifact(prices_job("caresuper", PRICES_WEEK))
        .expect("first run");

    let mut job = prices_job(
        "caresuper",
        "Date,Unit Price,Currency\n2024-06-28,0.99,AUD\n",
    );
    job.options.backfill = true;
    let run = pipeline.ingest.run_artifact(job).expect("backfill run");

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.accepted_count, 1);
}

#[test]
fn test_duplicate_append_rejected_and_store_unchanged() {
    let db = common::setup_test_db();
    let pipeline = build_pipeline(&db.pool);
    register_fund(&pipeline, "artsuper", "Australian Retirement Trust");

    use superfund_core::mapping::CandidatePrice;
    let point = CandidatePrice {
        fund_id: "artsuper".to_string(),
        date: date("2024-07-01"),
        price: dec!(2.00),
        currency: "AUD".to_string(),
        line_number: 1,
    };
    pipeline
        .store
        .append_prices(std::slice::from_ref(&point), false)
        .expect("initial append");

    let conflicting = CandidatePrice {
        price: dec!(2.50),
        ..point.clone()
    };
    let err = pipeline
        .store
        .append_prices(std::slice::from_ref(&conflicting), false)
        .expect_err("conflicting append must fail");
    assert!(matches!(err, StoreError::DuplicateKey { .. }));

    let stored: Vec<_> = pipeline
        .reader
        .query_prices(FundSelector::One("artsuper".to_string()), DateRange::default())
        .collect::<Result<Vec<_>, _>>()
        .expect("query prices");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].price, dec!(2.00));
}

#[test]
fn test_correction_supersedes_and_query_returns_latest_generation() {
    let db = common::setup_test_db();
    let pipeline = build_pipeline(&db.pool);
    register_fund(&pipeline, "aussuper", "AustralianSuper");
    register_default_mapping(&pipeline, "aussuper", SourceFormat::DelimitedHoldings);

    pipeline
        .ingest
        .run_artifact(holdings_job("aussuper", HOLDINGS_OK))
        .expect("initial run");

    let corrected = "\
Effective Date,Asset Class Name,Int/Ext,Name/Kind of Investment Item,Currency,Listed Country,Weighting
2024-06-30,Listed Equity,Externally Managed,Global Shares Fund,USD,US,60.0
2024-06-30,Cash,Internally Managed,Cash at bank,AUD,AU,40.0
";
    let mut job = holdings_job("aussuper", corrected);
    job.options.supersede = true;
    let run = pipeline.ingest.run_artifact(job).expect("correction run");

    assert_eq!(run.status, RunStatus::Completed);

    let stored: Vec<_> = pipeline
        .reader
        .query_holdings(FundSelector::One("aussuper".to_string()), DateRange::default())
        .collect::<Result<Vec<_>, _>>()
        .expect("query holdings");

    // Only the superseding generation comes back.
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|h| h.generation == 1));
    let total: Decimal = stored.iter().map(|h| h.weight).sum();
    assert_eq!(total, dec!(1.0));

    // The superseded generation stays on record for audit.
    let history = pipeline
        .reader
        .holding_generations("aussuper", date("2024-06-30"))
        .expect("generation history");
    assert_eq!(history.len(), 5);
    assert!(history.iter().any(|h| h.generation == 0));
}

#[test]
fn test_sectioned_artifact_ingested() {
    let db = common::setup_test_db();
    let pipeline = build_pipeline(&db.pool);
    register_fund(&pipeline, "unisuper", "UniSuper");

    // The sectioned layout carries asset class and management kind as label
    // lines; the table itself has no such columns.
    let mut rules = FieldMappingRules::default();
    rules.fields.insert(
        "asOfDate".to_string(),
        "Effective Date".to_string(),
    );
    pipeline
        .mapping
        .register_mapping(NewFieldMapping {
            fund_id: "unisuper".to_string(),
            source_format: SourceFormat::SectionedHoldings.to_string(),
            effective_from: date("2020-01-01"),
            rules,
        })
        .expect("mapping registration");

    let body = "\
CASH
Internally Managed
Effective Date,Name/Kind of Investment Item,Currency,Listed Country,Weighting
2024-06-30,Cash at bank,AUD,AU,40.0

LISTED EQUITY
Externally Managed
Effective Date,Name/Kind of Investment Item,Currency,Listed Country,Weighting
2024-06-30,Global Shares Fund,USD,US,60.0
";
    let job = IngestJob {
        fund_id: "unisuper".to_string(),
        format: SourceFormat::SectionedHoldings,
        artifact: RawArtifact::from_bytes("phd.csv", body.as_bytes().to_vec()),
        options: IngestOptions::default(),
    };

    let run = pipeline.ingest.run_artifact(job).expect("run recorded");

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.accepted_count, 2);

    let stored: Vec<_> = pipeline
        .reader
        .query_holdings(FundSelector::One("unisuper".to_string()), DateRange::default())
        .collect::<Result<Vec<_>, _>>()
        .expect("query holdings");
    assert_eq!(stored.len(), 2);
    assert!(stored
        .iter()
        .any(|h| h.asset_class == superfund_core::mapping::AssetClass::Cash));
}

#[test]
fn test_unparseable_artifact_fails_run_without_side_effects() {
    let db = common::setup_test_db();
    let pipeline = build_pipeline(&db.pool);
    register_fund(&pipeline, "unisuper", "UniSuper");
    register_default_mapping(&pipeline, "unisuper", SourceFormat::DelimitedHoldings);

    let job = IngestJob {
        fund_id: "unisuper".to_string(),
        format: SourceFormat::DelimitedHoldings,
        artifact: RawArtifact::from_bytes("broken.csv", vec![0xFF, 0x00, 0x41]),
        options: IngestOptions::default(),
    };
    let run = pipeline.ingest.run_artifact(job).expect("run recorded");

    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error.is_some());

    let stored: Vec<_> = pipeline
        .reader
        .query_holdings(FundSelector::One("unisuper".to_string()), DateRange::default())
        .collect::<Result<Vec<_>, _>>()
        .expect("query holdings");
    assert!(stored.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_batch_isolates_failures_across_funds() {
    let db = common::setup_test_db();
    let pipeline = build_pipeline(&db.pool);
    register_fund(&pipeline, "good-fund", "Good Fund");
    register_fund(&pipeline, "bad-fund", "Bad Fund");
    register_default_mapping(&pipeline, "good-fund", SourceFormat::DelimitedHoldings);
    register_default_mapping(&pipeline, "bad-fund", SourceFormat::DelimitedHoldings);

    let jobs = vec![
        holdings_job("good-fund", HOLDINGS_OK),
        IngestJob {
            fund_id: "bad-fund".to_string(),
            format: SourceFormat::DelimitedHoldings,
            artifact: RawArtifact::from_bytes("broken.csv", vec![0xFF, 0x00]),
            options: IngestOptions::default(),
        },
    ];

    let runs = pipeline.ingest.clone().run_batch(jobs).await;

    assert_eq!(runs.len(), 2);
    let good = runs.iter().find(|r| r.fund_id == "good-fund").unwrap();
    let bad = runs.iter().find(|r| r.fund_id == "bad-fund").unwrap();
    assert_eq!(good.status, RunStatus::Completed);
    assert_eq!(bad.status, RunStatus::Failed);

    let stored: Vec<_> = pipeline
        .reader
        .query_holdings(FundSelector::One("good-fund".to_string()), DateRange::default())
        .collect::<Result<Vec<_>, _>>()
        .expect("query holdings");
    assert_eq!(stored.len(), 3);
}

#[test]
fn test_run_reports_listed_for_fund() {
    let db = common::setup_test_db();
    let pipeline = build_pipeline(&db.pool);
    register_fund(&pipeline, "rest", "Rest Super");
    register_default_mapping(&pipeline, "rest", SourceFormat::DelimitedHoldings);

    pipeline
        .ingest
        .run_artifact(holdings_job("rest", HOLDINGS_OK))
        .expect("run recorded");
    pipeline
        .ingest
        .run_artifact(holdings_job("rest", HOLDINGS_BAD_SUM))
        .expect("run recorded");

    let runs = pipeline.ingest.list_runs("rest", 10).expect("run listing");

    assert_eq!(runs.len(), 2);
    assert!(runs.iter().any(|r| r.status == RunStatus::Completed));
    assert!(runs.iter().any(|r| r.status == RunStatus::Partial));
}
