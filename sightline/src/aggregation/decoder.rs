//! Aggregation decoder
//!
//! Walks named aggregation results and folds them into [`Bucket`] series.
//! The statistic kind and field come from the aggregation name alone (see
//! [`AggregationName`]); results whose name falls outside the convention are
//! ignored.

use crate::aggregation::tree::{AggregationResult, ResponseBucket, SearchResponse};
use crate::query::{AggregationName, DATE_HISTOGRAM_NAME};
use serde::Serialize;
use std::collections::BTreeMap;

/// One point of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Data {
    pub timestamp: i64,
    pub value: f64,
}

impl Data {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Series decoded from one aggregation name
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Bucket {
    pub name: String,
    pub field: String,
    pub data: BTreeMap<String, Vec<Data>>,
}

impl Bucket {
    fn new(name: &str, field: &str) -> Self {
        Self {
            name: name.to_string(),
            field: field.to_string(),
            data: BTreeMap::new(),
        }
    }

    fn push(&mut self, series: &str, point: Data) {
        self.data.entry(series.to_string()).or_default().push(point);
    }
}

/// How `by_<field>` terms inside a date bucket are folded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistogramMode {
    /// One series per term key, valued by doc count
    #[default]
    Counts,
    /// Boolean terms folded into one success percentage per date bucket
    Availability,
}

/// Output of [`AggregationDecoder::decode_date_histogram`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedHistogram {
    pub timestamps: Vec<i64>,
    pub buckets: BTreeMap<String, Bucket>,
}

/// `100` when nothing was counted, otherwise the success share in percent
pub fn availability_percent(success: u64, failure: u64) -> f64 {
    let total = success + failure;
    if total == 0 {
        100.0
    } else {
        success as f64 / total as f64 * 100.0
    }
}

/// Success and failure doc counts of a boolean terms aggregation
pub fn boolean_counts(buckets: &[ResponseBucket]) -> (u64, u64) {
    buckets
        .iter()
        .fold((0, 0), |(success, failure), bucket| {
            if bucket.key_label() == "true" {
                (success + bucket.doc_count, failure)
            } else {
                (success, failure + bucket.doc_count)
            }
        })
}

pub struct AggregationDecoder;

impl AggregationDecoder {
    /// Decode the top-level aggregations; points carry timestamp `0`.
    ///
    /// An absent or empty aggregation section yields an empty map.
    pub fn decode(response: &SearchResponse) -> BTreeMap<String, Bucket> {
        let mut buckets = BTreeMap::new();
        if let Some(aggregations) = &response.aggregations {
            for (name, result) in aggregations {
                Self::decode_one(&mut buckets, name, result, 0, HistogramMode::Counts);
            }
        }
        buckets
    }

    /// Decode the `by_date` histogram: one timestamp per date bucket, empty
    /// buckets included, and every sub-aggregation folded into its series.
    pub fn decode_date_histogram(
        response: &SearchResponse,
        mode: HistogramMode,
    ) -> DecodedHistogram {
        let mut decoded = DecodedHistogram::default();
        let Some(histogram) = response.aggregation(DATE_HISTOGRAM_NAME) else {
            return decoded;
        };

        for date_bucket in histogram.buckets() {
            let Some(timestamp) = date_bucket.key_millis() else {
                tracing::warn!(
                    key = %date_bucket.key_text(),
                    "Skipping date bucket without numeric key"
                );
                continue;
            };
            decoded.timestamps.push(timestamp);

            for (name, result) in date_bucket.sub_aggregations() {
                Self::decode_one(&mut decoded.buckets, name, &result, timestamp, mode);
            }
        }

        decoded
    }

    fn decode_one(
        buckets: &mut BTreeMap<String, Bucket>,
        name: &str,
        result: &AggregationResult,
        timestamp: i64,
        mode: HistogramMode,
    ) {
        let Some(parsed) = AggregationName::parse(name) else {
            return;
        };

        match (&parsed, result) {
            (
                AggregationName::By(_) | AggregationName::ByRange(_),
                AggregationResult::Buckets { buckets: terms },
            ) => {
                let bucket = buckets
                    .entry(name.to_string())
                    .or_insert_with(|| Bucket::new(name, parsed.field()));

                match mode {
                    HistogramMode::Counts => {
                        for term in terms {
                            let point = Data::new(timestamp, term.doc_count as f64);
                            bucket.push(&term.key_text(), point);
                        }
                    }
                    HistogramMode::Availability => {
                        if !terms.is_empty() {
                            let (success, failure) = boolean_counts(terms);
                            let percent = availability_percent(success, failure);
                            bucket.push(name, Data::new(timestamp, percent));
                        }
                    }
                }
            }
            (AggregationName::Metric(..), AggregationResult::Value { .. }) => {
                let bucket = buckets
                    .entry(name.to_string())
                    .or_insert_with(|| Bucket::new(name, parsed.field()));
                if let Some(value) = result.value() {
                    bucket.push(name, Data::new(timestamp, value));
                }
            }
            _ => {
                tracing::debug!(aggregation = name, "Aggregation shape does not match its name");
            }
        }
    }
}
