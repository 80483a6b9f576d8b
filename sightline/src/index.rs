//! Daily partition resolution
//!
//! Analytics documents are written to one index per day, named
//! `<prefix>-yyyy.mm.dd`. The resolver turns a millisecond time range into the
//! list of those indices. Days are computed in a single fixed offset; the same
//! offset is handed to the backend for date-histogram bucketing so that
//! partition days and histogram days never drift apart.

use crate::error::Error;
use crate::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// `strftime` pattern for the date suffix of a partition name
pub const PARTITION_DATE_FORMAT: &str = "%Y.%m.%d";

/// Maps time ranges to daily partition names
#[derive(Debug, Clone)]
pub struct IndexResolver {
    prefix: String,
    zone: FixedOffset,
}

impl IndexResolver {
    pub fn new(prefix: impl Into<String>, zone: FixedOffset) -> Self {
        Self {
            prefix: prefix.into(),
            zone,
        }
    }

    /// Resolver that computes days in UTC
    pub fn utc(prefix: impl Into<String>) -> Self {
        Self::new(prefix, utc_offset())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn zone(&self) -> FixedOffset {
        self.zone
    }

    /// Offset in the `+hh:mm` form the backend accepts as `time_zone`
    pub fn zone_offset(&self) -> String {
        self.zone.to_string()
    }

    /// One partition per calendar day in `[date(from), date(to)]`, ascending.
    ///
    /// Returns an empty list when `from > to` or a bound is outside the
    /// representable date range; callers fall back to [`Self::all_partitions`].
    pub fn partitions_for(&self, from: i64, to: i64) -> Vec<String> {
        let (Some(start), Some(stop)) = (self.local_date(from), self.local_date(to)) else {
            return Vec::new();
        };

        start
            .iter_days()
            .take_while(|day| *day <= stop)
            .map(|day| self.partition_for_date(day))
            .collect()
    }

    pub fn partition_for_date(&self, date: NaiveDate) -> String {
        format!("{}-{}", self.prefix, date.format(PARTITION_DATE_FORMAT))
    }

    /// Wildcard matching every partition: `<prefix>-*`
    pub fn all_partitions(&self) -> String {
        format!("{}-*", self.prefix)
    }

    pub fn today_partition(&self) -> String {
        self.today_partition_at(Utc::now())
    }

    pub fn today_partition_at(&self, now: DateTime<Utc>) -> String {
        self.partition_for_date(now.with_timezone(&self.zone).date_naive())
    }

    fn local_date(&self, millis: i64) -> Option<NaiveDate> {
        DateTime::<Utc>::from_timestamp_millis(millis)
            .map(|instant| instant.with_timezone(&self.zone).date_naive())
    }
}

fn utc_offset() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap_or_else(|| unreachable!("zero offset is always valid"))
}

/// Parse a fixed offset: `Z`, `UTC`, `+02:00`, `-0530`, `+01`
pub fn parse_zone(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") || raw.is_empty() {
        return Ok(utc_offset());
    }

    let invalid = || Error::Config(format!("invalid time zone offset '{}'", raw));

    let (sign, rest) = if let Some(rest) = raw.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = raw.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
        4 => (
            digits[..2].parse::<i32>().map_err(|_| invalid())?,
            digits[2..].parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
