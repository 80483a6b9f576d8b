//! Abstract query model
//!
//! Values here are built by the caller, validated on construction where a
//! malformed input is possible, and never mutated afterwards.

use crate::error::Error;
use crate::query::naming::{AggregationName, MetricKind};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive `[from, to]` range in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    from: i64,
    to: i64,
}

impl TimeRange {
    pub fn new(from: i64, to: i64) -> Result<Self> {
        if from > to {
            return Err(Error::InvalidQuery(format!(
                "time range starts after it ends ({} > {})",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// The `span_ms` milliseconds leading up to `now`
    pub fn last(span_ms: i64, now: i64) -> Self {
        Self {
            from: now.saturating_sub(span_ms.max(0)),
            to: now,
        }
    }

    pub fn from(&self) -> i64 {
        self.from
    }

    pub fn to(&self) -> i64 {
        self.to
    }

    pub fn span_ms(&self) -> i64 {
        self.to - self.from
    }
}

/// Date-histogram bucket width in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Interval(u64);

impl TryFrom<u64> for Interval {
    type Error = Error;

    fn try_from(millis: u64) -> Result<Self> {
        Self::new(millis)
    }
}

impl From<Interval> for u64 {
    fn from(interval: Interval) -> u64 {
        interval.0
    }
}

impl Interval {
    pub const SECOND: u64 = 1_000;
    pub const MINUTE: u64 = 60 * Self::SECOND;
    pub const HOUR: u64 = 60 * Self::MINUTE;
    pub const DAY: u64 = 24 * Self::HOUR;

    pub fn new(millis: u64) -> Result<Self> {
        if millis == 0 {
            return Err(Error::InvalidQuery("interval must be positive".to_string()));
        }
        Ok(Self(millis))
    }

    pub fn millis(&self) -> u64 {
        self.0
    }
}

/// Equality filter restricting a query to one parent entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootScope {
    pub field: String,
    pub id: String,
}

impl RootScope {
    pub fn new(field: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            id: id.into(),
        }
    }
}

/// Filter shared by every archetype
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub time_range: Option<TimeRange>,
    pub root: Option<RootScope>,
    /// Free-text query in Lucene syntax
    pub query: Option<String>,
}

impl QueryFilter {
    pub fn between(range: TimeRange) -> Self {
        Self {
            time_range: Some(range),
            ..Default::default()
        }
    }

    pub fn with_root(mut self, root: RootScope) -> Self {
        self.root = Some(root);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    /// Bucket by distinct values of the field
    Field,
    Min,
    Max,
    Avg,
}

impl AggregationKind {
    pub fn metric(self) -> Option<MetricKind> {
        match self {
            Self::Field => None,
            Self::Min => Some(MetricKind::Min),
            Self::Max => Some(MetricKind::Max),
            Self::Avg => Some(MetricKind::Avg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub kind: AggregationKind,
    pub field: String,
}

impl AggregationSpec {
    pub fn new(kind: AggregationKind, field: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
        }
    }

    pub fn field(field: impl Into<String>) -> Self {
        Self::new(AggregationKind::Field, field)
    }

    pub fn min(field: impl Into<String>) -> Self {
        Self::new(AggregationKind::Min, field)
    }

    pub fn max(field: impl Into<String>) -> Self {
        Self::new(AggregationKind::Max, field)
    }

    pub fn avg(field: impl Into<String>) -> Self {
        Self::new(AggregationKind::Avg, field)
    }

    /// Tagged aggregation name this spec compiles to
    pub fn name(&self) -> AggregationName {
        match self.kind.metric() {
            Some(metric) => AggregationName::Metric(metric, self.field.clone()),
            None => AggregationName::By(self.field.clone()),
        }
    }
}

/// Numeric range for group-by queries, `from` inclusive and `to` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupRange {
    pub from: f64,
    pub to: f64,
}

impl GroupRange {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    /// Bucket key, e.g. `100-199`
    pub fn key(&self) -> String {
        format!("{}-{}", trim_number(self.from), trim_number(self.to))
    }
}

fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Order group-by buckets by the average of a numeric field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOrder {
    pub field: String,
    pub direction: SortDirection,
}

/// Field health-check aggregations bucket on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthField {
    #[default]
    Endpoint,
    Gateway,
}

impl HealthField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Endpoint => "endpoint",
            Self::Gateway => "gateway",
        }
    }
}

/// Document type stored in the partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    #[default]
    Request,
    Health,
    Log,
    Monitor,
}

impl DocumentKind {
    /// Type name used in the search path
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Health => "health",
            Self::Log => "log",
            Self::Monitor => "monitor",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountQuery {
    pub filter: QueryFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupByQuery {
    pub filter: QueryFilter,
    pub field: String,
    /// Explicit numeric ranges; empty means bucket by distinct values
    pub ranges: Vec<GroupRange>,
    pub order: Option<GroupOrder>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateHistogramQuery {
    pub filter: QueryFilter,
    pub interval: Interval,
    pub aggregations: Vec<AggregationSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub filter: QueryFilter,
    pub field: HealthField,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageResponseTimeQuery {
    pub filter: QueryFilter,
    pub field: HealthField,
}

/// Paginated log search, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogsQuery {
    pub filter: QueryFilter,
    /// 1-based page number
    pub page: u32,
    pub size: u32,
}

impl LogsQuery {
    pub fn new(filter: QueryFilter, page: u32, size: u32) -> Self {
        Self { filter, page, size }
    }
}

/// Closed set of query archetypes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    Count(CountQuery),
    GroupBy(GroupByQuery),
    DateHistogram(DateHistogramQuery),
    Availability(AvailabilityQuery),
    AverageResponseTime(AverageResponseTimeQuery),
    Logs(LogsQuery),
}

impl Query {
    pub fn filter(&self) -> &QueryFilter {
        match self {
            Self::Count(q) => &q.filter,
            Self::GroupBy(q) => &q.filter,
            Self::DateHistogram(q) => &q.filter,
            Self::Availability(q) => &q.filter,
            Self::AverageResponseTime(q) => &q.filter,
            Self::Logs(q) => &q.filter,
        }
    }

    /// Archetype name used in logs and metric labels
    pub fn archetype(&self) -> &'static str {
        match self {
            Self::Count(_) => "count",
            Self::GroupBy(_) => "group_by",
            Self::DateHistogram(_) => "date_histogram",
            Self::Availability(_) => "availability",
            Self::AverageResponseTime(_) => "average_response_time",
            Self::Logs(_) => "logs",
        }
    }
}
