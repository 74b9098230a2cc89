use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::constants::{DEFAULT_GROUP_TIMEOUT_SECS, DEFAULT_WEIGHT_SUM_TOLERANCE};
use crate::mapping::CandidateHolding;

/// Per-run validation configuration. Tunables come from pipeline settings;
/// the flags come from the ingest options of the run being validated.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub weight_sum_tolerance: Decimal,
    pub group_timeout: Duration,
    /// Bypasses the monotonic-date check for explicitly flagged backfill
    /// imports.
    pub backfill: bool,
    /// Treats same-key, different-content appends as corrections, writing a
    /// superseding generation instead of rejecting.
    pub supersede: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            weight_sum_tolerance: Decimal::from_str(DEFAULT_WEIGHT_SUM_TOLERANCE)
                .unwrap_or(Decimal::ZERO),
            group_timeout: Duration::from_secs(DEFAULT_GROUP_TIMEOUT_SECS),
            backfill: false,
            supersede: false,
        }
    }
}

/// Key of a buffered holdings group.
pub(crate) type GroupKey = (String, NaiveDate);

/// Holdings buffered until their (fund, as-of date) group is complete. The
/// weight-sum check only runs on closed groups.
#[derive(Debug)]
pub(crate) struct BufferedGroup {
    pub rows: Vec<CandidateHolding>,
    pub opened_at: Instant,
}

impl BufferedGroup {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            opened_at: Instant::now(),
        }
    }
}

/// Outcome of validating and committing one artifact's records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Records newly committed to the canonical store.
    pub accepted: usize,
    /// Records already stored identically; the re-validation was a no-op.
    pub already_present: usize,
    /// Records quarantined with a reason.
    pub quarantined: usize,
    /// Same-key conflicts rejected by the store (run reports partial).
    pub duplicates: usize,
}

impl ValidationReport {
    pub fn merge(&mut self, other: &ValidationReport) {
        self.accepted += other.accepted;
        self.already_present += other.already_present;
        self.quarantined += other.quarantined;
        self.duplicates += other.duplicates;
    }

    pub fn is_clean(&self) -> bool {
        self.quarantined == 0 && self.duplicates == 0
    }
}
