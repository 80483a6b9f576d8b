//! Argument parsers shared by the subcommands

use anyhow::Result;
use chrono::DateTime;
use clap::Args;
use sightline::query::{AggregationSpec, GroupRange, QueryFilter, RootScope, TimeRange};

/// Time window and scope shared by every query command
#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// Start of the window (RFC 3339 or epoch millis)
    #[arg(long, value_parser = parse_time)]
    pub from: Option<i64>,

    /// End of the window, defaults to now when --from is given
    #[arg(long, value_parser = parse_time, requires = "from")]
    pub to: Option<i64>,

    /// Window ending now, e.g. 15m, 1h, 7d
    #[arg(long, value_parser = parse_interval, conflicts_with_all = ["from", "to"])]
    pub last: Option<u64>,

    /// Restrict to one entity, e.g. api=1f2e or application=web
    #[arg(long, value_parser = parse_root)]
    pub root: Option<RootScope>,

    /// Free-text query (Lucene syntax)
    #[arg(short, long)]
    pub query: Option<String>,
}

impl WindowArgs {
    pub fn filter(&self, now: i64) -> Result<QueryFilter> {
        let time_range = match (self.last, self.from) {
            (Some(span), _) => Some(TimeRange::last(span as i64, now)),
            (None, Some(from)) => Some(TimeRange::new(from, self.to.unwrap_or(now))?),
            (None, None) => None,
        };

        Ok(QueryFilter {
            time_range,
            root: self.root.clone(),
            query: self.query.clone(),
        })
    }
}

/// `2024-01-01T00:00:00Z` or `1704067200000`
pub fn parse_time(raw: &str) -> Result<i64, String> {
    if let Ok(millis) = raw.parse::<i64>() {
        return Ok(millis);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.timestamp_millis())
        .map_err(|e| format!("'{}' is neither RFC 3339 nor epoch millis: {}", raw, e))
}

/// Duration in millis from `500ms`, `30s`, `5m`, `1h` or `1d`
pub fn parse_interval(raw: &str) -> Result<u64, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    let amount: u64 = digits
        .parse()
        .map_err(|_| format!("missing amount in '{}'", raw))?;
    let factor = match unit {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "" => return Err(format!("missing unit in '{}' (ms, s, m, h, d)", raw)),
        other => return Err(format!("unknown unit '{}' in '{}'", other, raw)),
    };
    if amount == 0 {
        return Err("interval must be positive".to_string());
    }
    amount
        .checked_mul(factor)
        .ok_or_else(|| format!("interval '{}' is too large", raw))
}

/// `field=id`
pub fn parse_root(raw: &str) -> Result<RootScope, String> {
    match raw.split_once('=') {
        Some((field, id)) if !field.is_empty() && !id.is_empty() => Ok(RootScope::new(field, id)),
        _ => Err(format!("expected field=id, got '{}'", raw)),
    }
}

/// `100-199`
pub fn parse_range(raw: &str) -> Result<GroupRange, String> {
    let invalid = || format!("expected from-to, got '{}'", raw);
    // skip the first char so a negative lower bound is not taken as the separator
    let split = raw.get(1..).and_then(|rest| rest.find('-')).ok_or_else(invalid)? + 1;
    let from: f64 = raw[..split].trim().parse().map_err(|_| invalid())?;
    let to: f64 = raw[split + 1..].trim().parse().map_err(|_| invalid())?;
    if from > to {
        return Err(format!("range '{}' starts after it ends", raw));
    }
    Ok(GroupRange::new(from, to))
}

/// `status` buckets by value; `avg:response-time`, `min:x`, `max:x` are metrics
pub fn parse_aggregation(raw: &str) -> Result<AggregationSpec, String> {
    match raw.split_once(':') {
        None if !raw.is_empty() => Ok(AggregationSpec::field(raw)),
        Some(("by", field)) if !field.is_empty() => Ok(AggregationSpec::field(field)),
        Some(("min", field)) if !field.is_empty() => Ok(AggregationSpec::min(field)),
        Some(("max", field)) if !field.is_empty() => Ok(AggregationSpec::max(field)),
        Some(("avg", field)) if !field.is_empty() => Ok(AggregationSpec::avg(field)),
        _ => Err(format!(
            "expected <field> or <by|min|max|avg>:<field>, got '{}'",
            raw
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sightline::query::AggregationKind;

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("1704067200000").unwrap(), 1_704_067_200_000);
        assert_eq!(parse_time("2024-01-01T00:00:00Z").unwrap(), 1_704_067_200_000);
        assert_eq!(parse_time("2024-01-01T01:00:00+01:00").unwrap(), 1_704_067_200_000);
        assert!(parse_time("yesterday").is_err());
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("500ms").unwrap(), 500);
        assert_eq!(parse_interval("30s").unwrap(), 30_000);
        assert_eq!(parse_interval("5m").unwrap(), 300_000);
        assert_eq!(parse_interval("1h").unwrap(), 3_600_000);
        assert_eq!(parse_interval("1d").unwrap(), 86_400_000);
        assert!(parse_interval("10").is_err());
        assert!(parse_interval("h").is_err());
        assert!(parse_interval("0s").is_err());
        assert!(parse_interval("3w").is_err());
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("100-199").unwrap(), GroupRange::new(100.0, 199.0));
        assert_eq!(parse_range("-10-10").unwrap(), GroupRange::new(-10.0, 10.0));
        assert!(parse_range("200-100").is_err());
        assert!(parse_range("100").is_err());
    }

    #[test]
    fn test_parse_aggregation() {
        assert_eq!(parse_aggregation("status").unwrap().kind, AggregationKind::Field);
        assert_eq!(parse_aggregation("avg:response-time").unwrap().name().encode(), "avg_response-time");
        assert_eq!(parse_aggregation("by:api").unwrap().name().encode(), "by_api");
        assert!(parse_aggregation("sum:x").is_err());
        assert!(parse_aggregation("max:").is_err());
    }

    #[test]
    fn test_window_filter() {
        let now = 10_000_000;

        let last = WindowArgs {
            last: Some(1_000),
            ..Default::default()
        };
        let range = last.filter(now).unwrap().time_range.unwrap();
        assert_eq!((range.from(), range.to()), (now - 1_000, now));

        let open_ended = WindowArgs {
            from: Some(5),
            ..Default::default()
        };
        assert_eq!(open_ended.filter(now).unwrap().time_range.unwrap().to(), now);

        let inverted = WindowArgs {
            from: Some(now + 1),
            to: Some(now),
            ..Default::default()
        };
        assert!(inverted.filter(now).is_err());

        assert!(WindowArgs::default().filter(now).unwrap().time_range.is_none());
    }
}
