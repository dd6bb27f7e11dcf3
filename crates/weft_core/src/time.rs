//! Time types for weft.
//!
//! History timestamps are wall clock, recorded by the workflow service.
//! They are compared and subtracted but never trusted to be monotonic, so
//! every subtraction here saturates instead of going negative.

use crate::error::CoreError;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wall clock timestamp with nanosecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    nanos: i64,
}

impl Timestamp {
    /// Create from nanoseconds since the unix epoch
    #[must_use]
    pub const fn from_unix_nanos(nanos: i64) -> Self {
        Self { nanos }
    }

    /// Create from milliseconds since the unix epoch
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self {
            nanos: millis.saturating_mul(1_000_000),
        }
    }

    /// Current wall clock time
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Create from a chrono datetime
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let nanos = dt
            .timestamp_nanos_opt()
            .unwrap_or_else(|| dt.timestamp_millis().saturating_mul(1_000_000));
        Self { nanos }
    }

    /// Parse an RFC 3339 timestamp
    ///
    /// # Errors
    ///
    /// Returns error if the string is not valid RFC 3339
    pub fn parse_rfc3339(s: &str) -> Result<Self, CoreError> {
        DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
            .map_err(|e| CoreError::InvalidTimestamp {
                reason: format!("{s:?}: {e}"),
            })
    }

    /// Nanoseconds since the unix epoch
    #[must_use]
    pub const fn as_unix_nanos(&self) -> i64 {
        self.nanos
    }

    /// Convert to a chrono datetime
    #[must_use]
    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.nanos)
    }

    /// Signed nanoseconds from `earlier` to `self`
    #[must_use]
    pub const fn signed_nanos_since(&self, earlier: &Timestamp) -> i64 {
        self.nanos.saturating_sub(earlier.nanos)
    }

    /// Duration since an earlier timestamp, zero if `earlier` is later
    #[must_use]
    pub fn duration_since(&self, earlier: &Timestamp) -> Duration {
        Duration::from_nanos(self.signed_nanos_since(earlier).max(0) as u64)
    }

    /// Add a duration
    #[must_use]
    pub fn add(&self, duration: Duration) -> Self {
        let delta = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        Self {
            nanos: self.nanos.saturating_add(delta),
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_datetime().to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(
            &self
                .to_datetime()
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        )
    }
}

/// Accepted encodings: RFC 3339 string or integer unix milliseconds
#[derive(Deserialize)]
#[serde(untagged)]
enum TimestampRepr {
    Millis(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match TimestampRepr::deserialize(deserializer)? {
            TimestampRepr::Millis(ms) => Ok(Self::from_unix_millis(ms)),
            TimestampRepr::Text(s) => Self::parse_rfc3339(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// A non-negative span of time with nanosecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Duration(u64);

impl Duration {
    /// Nanoseconds per microsecond
    pub const NANOS_PER_MICRO: u64 = 1_000;
    /// Nanoseconds per millisecond
    pub const NANOS_PER_MILLI: u64 = 1_000_000;
    /// Nanoseconds per second
    pub const NANOS_PER_SEC: u64 = 1_000_000_000;
    /// Nanoseconds per minute
    pub const NANOS_PER_MIN: u64 = 60 * Self::NANOS_PER_SEC;
    /// Nanoseconds per hour
    pub const NANOS_PER_HOUR: u64 = 60 * Self::NANOS_PER_MIN;

    /// Zero duration
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Duration from nanoseconds
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Duration from microseconds
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros.saturating_mul(Self::NANOS_PER_MICRO))
    }

    /// Duration from milliseconds
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(Self::NANOS_PER_MILLI))
    }

    /// Duration from seconds
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(Self::NANOS_PER_SEC))
    }

    /// Duration from minutes
    #[must_use]
    pub const fn from_mins(mins: u64) -> Self {
        Self(mins.saturating_mul(Self::NANOS_PER_MIN))
    }

    /// Duration from hours
    #[must_use]
    pub const fn from_hours(hours: u64) -> Self {
        Self(hours.saturating_mul(Self::NANOS_PER_HOUR))
    }

    /// Duration from fractional nanoseconds, negative and NaN become zero
    #[must_use]
    pub fn from_nanos_f64(nanos: f64) -> Self {
        if nanos.is_nan() || nanos <= 0.0 {
            Self(0)
        } else if nanos >= u64::MAX as f64 {
            Self(u64::MAX)
        } else {
            Self(nanos as u64)
        }
    }

    /// Get total nanoseconds
    #[must_use]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Get total milliseconds
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0 / Self::NANOS_PER_MILLI
    }

    /// Get total nanoseconds as a float, for layout arithmetic
    #[must_use]
    pub fn as_nanos_f64(&self) -> f64 {
        self.0 as f64
    }

    /// Whether this is the zero duration
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Saturating addition
    #[must_use]
    pub const fn saturating_add(&self, other: Duration) -> Duration {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction, floors at zero
    #[must_use]
    pub const fn saturating_sub(&self, other: Duration) -> Duration {
        Self(self.0.saturating_sub(other.0))
    }

    /// Round up to the next multiple of `granularity`
    #[must_use]
    pub const fn round_up_to(&self, granularity: Duration) -> Duration {
        if granularity.0 == 0 {
            return *self;
        }
        let rem = self.0 % granularity.0;
        if rem == 0 {
            *self
        } else {
            Self(self.0.saturating_add(granularity.0 - rem))
        }
    }

    /// Human string: µs below 1ms, ms below 1s, s below 1m, m below 1h, else h.
    ///
    /// One decimal place is shown only when the value is not integral.
    #[must_use]
    pub fn human(&self) -> String {
        // Each unit holds values that still round below the next unit's threshold
        let units = [
            (Self::NANOS_PER_MICRO, 1_000.0, "µs"),
            (Self::NANOS_PER_MILLI, 1_000.0, "ms"),
            (Self::NANOS_PER_SEC, 60.0, "s"),
            (Self::NANOS_PER_MIN, 60.0, "m"),
            (Self::NANOS_PER_HOUR, f64::INFINITY, "h"),
        ];
        let round = |divisor: u64| (self.0 as f64 / divisor as f64 * 10.0).round() / 10.0;

        let (value, unit) = units
            .iter()
            .map(|&(divisor, limit, unit)| (round(divisor), limit, unit))
            .find(|&(value, limit, _)| value < limit)
            .map_or((round(Self::NANOS_PER_HOUR), "h"), |(value, _, unit)| (value, unit));

        if value.fract() == 0.0 {
            format!("{value:.0}{unit}")
        } else {
            format!("{value:.1}{unit}")
        }
    }
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.human())
    }
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Self(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }
}

impl From<Duration> for std::time::Duration {
    fn from(d: Duration) -> Self {
        std::time::Duration::from_nanos(d.0)
    }
}
