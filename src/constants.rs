/// Decimal places kept on derived metric values.
pub const DECIMAL_PRECISION: u32 = 6;

/// Date format used for day-granularity keys in the canonical store.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default tolerance for the per-date holding weight-sum invariant (0.5%).
pub const DEFAULT_WEIGHT_SUM_TOLERANCE: &str = "0.005";

/// Default seconds before an unclosed validation group is quarantined.
pub const DEFAULT_GROUP_TIMEOUT_SECS: u64 = 300;

/// Default maximum age, in days, of a stale-filled price usable as a
/// return-calculation endpoint.
pub const DEFAULT_MAX_STALENESS_DAYS: i64 = 7;

/// Default trailing window length, in observations, for volatility.
pub const DEFAULT_VOLATILITY_WINDOW: usize = 30;

/// Default minimum observations required before volatility is computable.
pub const DEFAULT_MIN_VOLATILITY_OBSERVATIONS: usize = 10;

/// Rows fetched per page by canonical store query cursors.
pub const QUERY_PAGE_SIZE: i64 = 500;
