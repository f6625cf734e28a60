//! Deterministic transaction time
//!
//! Every participant replaying a transaction agrees on one timestamp. `TxTime` wraps
//! it and provides the fixed-width nanosecond key used to order fee, pay and log rows.
//! Only times whose nanoseconds since the epoch fit that key are representable:
//! 1970-01-01T00:00:00Z through 2262-04-11T23:47:16.854775807Z.

use crate::types::error::LedgerError;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the zero-padded nanosecond prefix used in ordered ids and keys
pub const TIME_KEY_WIDTH: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "DateTime<Utc>", into = "DateTime<Utc>")]
pub struct TxTime(DateTime<Utc>);

impl TxTime {
    pub const EPOCH: TxTime = TxTime(DateTime::<Utc>::UNIX_EPOCH);

    /// Time at `seconds` and `nanos` past the epoch
    ///
    /// # Returns
    ///
    /// `None` before the epoch or past the last nanosecond an `i64` can count.
    pub fn from_unix(seconds: i64, nanos: u32) -> Option<Self> {
        DateTime::from_timestamp(seconds, nanos).and_then(Self::within_key_range)
    }

    fn within_key_range(time: DateTime<Utc>) -> Option<Self> {
        time.timestamp_nanos_opt()
            .filter(|nanos| *nanos >= 0)
            .map(|_| TxTime(time))
    }

    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// Nanoseconds since the epoch
    pub fn unix_nanos(&self) -> i64 {
        self.0.timestamp_nanos_opt().unwrap_or_default()
    }

    /// Zero-padded nanosecond string; lexicographic order equals time order
    pub fn sort_key(&self) -> String {
        format!("{:0width$}", self.unix_nanos(), width = TIME_KEY_WIDTH)
    }

    /// Sort key of the first instant after `self`, used as an exclusive upper bound
    pub fn sort_key_after(&self) -> String {
        format!(
            "{:0width$}",
            self.unix_nanos().saturating_add(1),
            width = TIME_KEY_WIDTH
        )
    }

    /// `minutes` earlier, stopping at the epoch
    pub fn minus_minutes(&self, minutes: i64) -> Self {
        self.0
            .checked_sub_signed(Duration::minutes(minutes))
            .and_then(Self::within_key_range)
            .unwrap_or(Self::EPOCH)
    }

    /// `seconds` later, or `self` when that leaves the representable range
    pub fn plus_seconds(&self, seconds: i64) -> Self {
        self.0
            .checked_add_signed(Duration::seconds(seconds))
            .and_then(Self::within_key_range)
            .unwrap_or(*self)
    }
}

impl TryFrom<DateTime<Utc>> for TxTime {
    type Error = LedgerError;

    fn try_from(time: DateTime<Utc>) -> Result<Self, Self::Error> {
        Self::within_key_range(time)
            .ok_or_else(|| LedgerError::invalid_argument(format!("time out of range: {}", time.to_rfc3339())))
    }
}

impl From<TxTime> for DateTime<Utc> {
    fn from(time: TxTime) -> Self {
        time.0
    }
}

impl fmt::Display for TxTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }
}
