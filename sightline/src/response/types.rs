use crate::aggregation::Bucket;
use crate::document::{HealthLog, LogRecord};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupByValue {
    pub key: String,
    pub value: f64,
}

impl GroupByValue {
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupByResponse {
    pub field: String,
    pub values: Vec<GroupByValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DateHistogramResponse {
    pub timestamps: Vec<i64>,
    /// One slot per requested aggregation, in request order
    pub values: Vec<Option<Bucket>>,
}

/// Value of one time window, e.g. the last hour
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowValue<T> {
    pub key: String,
    pub from: i64,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSeries<T> {
    pub key: String,
    pub values: Vec<WindowValue<T>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AvailabilityResponse {
    pub endpoints: Vec<EndpointSeries<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AverageResponseTimeResponse {
    pub endpoints: Vec<EndpointSeries<i64>>,
}

/// A page of request logs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabularResponse {
    pub total: u64,
    pub logs: Vec<LogRecord>,
}

/// A page of health-check logs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthLogsResponse {
    pub total: u64,
    pub logs: Vec<HealthLog>,
}

/// Result of the dispatching `query()` entry points
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Count(CountResponse),
    GroupBy(GroupByResponse),
    DateHistogram(DateHistogramResponse),
    Availability(AvailabilityResponse),
    AverageResponseTime(AverageResponseTimeResponse),
    Tabular(TabularResponse),
    HealthLogs(HealthLogsResponse),
}
