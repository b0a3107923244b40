use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default lifetime of a cached projection.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Cache keys for the per-loan projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKey {
    Outstanding(u64),
    Delinquent(u64),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Outstanding(id) => write!(f, "loan:{}:outstanding", id),
            CacheKey::Delinquent(id) => write!(f, "loan:{}:delinquent", id),
        }
    }
}

/// Renders a balance with six fraction digits, e.g. `1078.000000`.
pub fn encode_balance(balance: Decimal) -> String {
    format!("{:.6}", balance)
}

pub fn decode_balance(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw).ok()
}

pub fn encode_flag(flag: bool) -> String {
    flag.to_string()
}

pub fn decode_flag(raw: &str) -> Option<bool> {
    raw.parse().ok()
}
