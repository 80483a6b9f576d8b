//! Converters from a decoded search response to the typed responses
//!
//! Every builder returns an empty response when the backend sent no
//! aggregations; none of them treat that as an error.

use super::types::{
    AvailabilityResponse, AverageResponseTimeResponse, CountResponse, DateHistogramResponse,
    EndpointSeries, GroupByResponse, GroupByValue, HealthLogsResponse, TabularResponse,
    WindowValue,
};
use crate::aggregation::{
    availability_percent, boolean_counts, AggregationDecoder, HistogramMode, ResponseBucket,
    SearchResponse,
};
use crate::document::{DocumentMapper, MappedLog};
use crate::query::{
    AggregationName, AggregationSpec, HEALTH_RANGES_NAME, HEALTH_RESULTS_NAME, HEALTH_TERMS_NAME,
};
use crate::Result;

pub fn to_count_response(response: &SearchResponse) -> CountResponse {
    CountResponse {
        count: response.total(),
    }
}

pub fn to_group_by_response(response: &SearchResponse) -> GroupByResponse {
    let Some((name, aggregation)) = response.aggregations.as_ref().and_then(|a| a.iter().next())
    else {
        return GroupByResponse::default();
    };
    let Some(parsed) = AggregationName::parse(name) else {
        tracing::warn!(aggregation = %name, "Unexpected group-by aggregation name");
        return GroupByResponse::default();
    };

    // counts come from the decoded series, order from the backend buckets
    let decoded = AggregationDecoder::decode(response);
    let series = decoded.get(name.as_str()).map(|bucket| &bucket.data);
    let count_of = |key: &str| {
        series
            .and_then(|data| data.get(key))
            .and_then(|points| points.first())
            .map_or(0.0, |point| point.value)
    };

    let values = match parsed {
        AggregationName::ByRange(_) => aggregation
            .buckets()
            .iter()
            .map(|b| {
                let key = b.key_text();
                let count = count_of(&key);
                GroupByValue::new(key, count)
            })
            .collect(),
        AggregationName::By(_) => aggregation
            .buckets()
            .iter()
            .filter_map(|b| group_by_value(b, count_of(&b.key_text())))
            .collect(),
        AggregationName::Metric(..) => Vec::new(),
    };

    GroupByResponse {
        field: parsed.field().to_string(),
        values,
    }
}

/// A bucket carrying a sub-metric is valued by it, and dropped when the metric
/// has no value; otherwise it is valued by its doc count.
fn group_by_value(bucket: &ResponseBucket, count: f64) -> Option<GroupByValue> {
    let metric = bucket
        .sub_aggregations()
        .find(|(name, _)| AggregationName::parse(name).is_some());

    match metric {
        Some((_, result)) => result
            .value()
            .map(|value| GroupByValue::new(bucket.key_text(), value)),
        None => Some(GroupByValue::new(bucket.key_text(), count)),
    }
}

pub fn to_date_histogram_response(
    response: &SearchResponse,
    specs: &[AggregationSpec],
    mode: HistogramMode,
) -> DateHistogramResponse {
    if response.has_no_aggregations() {
        return DateHistogramResponse::default();
    }

    let decoded = AggregationDecoder::decode_date_histogram(response, mode);
    let values = specs
        .iter()
        .map(|spec| decoded.buckets.get(&spec.name().encode()).cloned())
        .collect();

    DateHistogramResponse {
        timestamps: decoded.timestamps,
        values,
    }
}

/// Walk `terms` > `ranges` > `results`, valuing each window with `value_of`
fn endpoint_windows<T>(
    response: &SearchResponse,
    value_of: impl Fn(&ResponseBucket) -> T,
) -> Vec<EndpointSeries<T>> {
    let Some(terms) = response.aggregation(HEALTH_TERMS_NAME) else {
        return Vec::new();
    };

    terms
        .buckets()
        .iter()
        .map(|endpoint| {
            let values = endpoint
                .sub_aggregation(HEALTH_RANGES_NAME)
                .map(|ranges| {
                    ranges
                        .buckets()
                        .iter()
                        .map(|window| WindowValue {
                            key: window.key_text(),
                            from: window.from.map(|f| f as i64).unwrap_or_default(),
                            value: value_of(window),
                        })
                        .collect()
                })
                .unwrap_or_default();

            EndpointSeries {
                key: endpoint.key_text(),
                values,
            }
        })
        .collect()
}

pub fn to_availability_response(response: &SearchResponse) -> AvailabilityResponse {
    AvailabilityResponse {
        endpoints: endpoint_windows(response, |window| {
            let (success, failure) = window
                .sub_aggregation(HEALTH_RESULTS_NAME)
                .map(|results| boolean_counts(results.buckets()))
                .unwrap_or_default();
            availability_percent(success, failure)
        }),
    }
}

pub fn to_average_response_time_response(response: &SearchResponse) -> AverageResponseTimeResponse {
    let mut endpoints = endpoint_windows(response, |window| {
        window
            .sub_aggregation(HEALTH_RESULTS_NAME)
            .and_then(|results| results.value())
            .map(|avg| avg.round() as i64)
            .unwrap_or_default()
    });

    // an endpoint with no response time in any window carries no signal
    endpoints.retain(|endpoint| endpoint.values.iter().any(|w| w.value != 0));

    AverageResponseTimeResponse { endpoints }
}

/// Request logs in backend order (newest first)
pub fn to_tabular_response(response: &SearchResponse) -> Result<TabularResponse> {
    let logs = response
        .hits
        .hits
        .iter()
        .map(|hit| DocumentMapper::map(&hit.source, false).map(MappedLog::into_record))
        .collect::<Result<Vec<_>>>()?;

    Ok(TabularResponse {
        total: response.total(),
        logs,
    })
}

pub fn to_health_logs_response(response: &SearchResponse) -> Result<HealthLogsResponse> {
    let logs = response
        .hits
        .hits
        .iter()
        .map(DocumentMapper::health_log)
        .collect::<Result<Vec<_>>>()?;

    Ok(HealthLogsResponse {
        total: response.total(),
        logs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> SearchResponse {
        serde_json::from_value(value).unwrap()
    }

    // ========================================================================
    // Empty defaults
    // ========================================================================

    #[test]
    fn test_empty_aggregations_give_empty_responses() {
        let empty = response(json!({"hits": {"total": 0, "hits": []}}));

        assert_eq!(to_count_response(&empty).count, 0);
        assert_eq!(to_group_by_response(&empty), GroupByResponse::default());
        let histogram = to_date_histogram_response(
            &empty,
            &[AggregationSpec::field("status")],
            HistogramMode::Counts,
        );
        assert!(histogram.timestamps.is_empty());
        assert!(histogram.values.is_empty());
        assert!(to_availability_response(&empty).endpoints.is_empty());
        assert!(to_average_response_time_response(&empty).endpoints.is_empty());
        assert!(to_tabular_response(&empty).unwrap().logs.is_empty());
        assert!(to_health_logs_response(&empty).unwrap().logs.is_empty());
    }

    // ========================================================================
    // Group by
    // ========================================================================

    #[test]
    fn test_group_by_ranges_in_order() {
        let grouped = to_group_by_response(&response(json!({
            "aggregations": {"by_status_range": {"buckets": [
                {"key": "100-199", "from": 100.0, "to": 199.0, "doc_count": 0},
                {"key": "200-299", "from": 200.0, "to": 299.0, "doc_count": 120},
                {"key": "300-399", "from": 300.0, "to": 399.0, "doc_count": 3}
            ]}}
        })));

        assert_eq!(grouped.field, "status");
        assert_eq!(
            grouped.values,
            vec![
                GroupByValue::new("100-199", 0.0),
                GroupByValue::new("200-299", 120.0),
                GroupByValue::new("300-399", 3.0),
            ]
        );
    }

    #[test]
    fn test_group_by_terms_with_metric() {
        let grouped = to_group_by_response(&response(json!({
            "aggregations": {"by_api": {"buckets": [
                {"key": "api-1", "doc_count": 10, "avg_response-time": {"value": 150.5}},
                {"key": "api-2", "doc_count": 4, "avg_response-time": {"value": null}}
            ]}}
        })));

        assert_eq!(grouped.field, "api");
        assert_eq!(grouped.values, vec![GroupByValue::new("api-1", 150.5)]);
    }

    #[test]
    fn test_group_by_terms_doc_count() {
        let grouped = to_group_by_response(&response(json!({
            "aggregations": {"by_application": {"buckets": [
                {"key": "app-1", "doc_count": 7},
                {"key": "app-2", "doc_count": 2}
            ]}}
        })));
        assert_eq!(
            grouped.values,
            vec![GroupByValue::new("app-1", 7.0), GroupByValue::new("app-2", 2.0)]
        );
    }

    // ========================================================================
    // Date histogram
    // ========================================================================

    #[test]
    fn test_histogram_values_follow_request_order() {
        let histogram = to_date_histogram_response(
            &response(json!({
                "aggregations": {"by_date": {"buckets": [
                    {"key": 0, "doc_count": 1,
                     "by_status": {"buckets": [{"key": 200, "doc_count": 1}]},
                     "max_response-time": {"value": 9.0}},
                    {"key": 3600000, "doc_count": 0,
                     "by_status": {"buckets": []},
                     "max_response-time": {"value": null}},
                    {"key": 7200000, "doc_count": 0,
                     "by_status": {"buckets": []},
                     "max_response-time": {"value": null}}
                ]}}
            })),
            &[
                AggregationSpec::max("response-time"),
                AggregationSpec::avg("missing"),
                AggregationSpec::field("status"),
            ],
            HistogramMode::Counts,
        );

        assert_eq!(histogram.timestamps, vec![0, 3_600_000, 7_200_000]);
        assert_eq!(histogram.values.len(), 3);
        assert_eq!(histogram.values[0].as_ref().unwrap().name, "max_response-time");
        assert!(histogram.values[1].is_none());
        assert_eq!(histogram.values[2].as_ref().unwrap().field, "status");
    }

    // ========================================================================
    // Health checks
    // ========================================================================

    fn health_response(results: serde_json::Value) -> SearchResponse {
        let windows: Vec<_> = ["1m", "1h", "1d", "1w", "1M"]
            .iter()
            .enumerate()
            .map(|(i, key)| json!({"key": key, "from": (1000 * i) as f64, "doc_count": 0, "results": results}))
            .collect();
        response(json!({
            "aggregations": {"terms": {"buckets": [
                {"key": "default", "doc_count": 0, "ranges": {"buckets": windows}}
            ]}}
        }))
    }

    #[test]
    fn test_availability_windows() {
        let availability = to_availability_response(&health_response(json!({"buckets": [
            {"key": 1, "key_as_string": "true", "doc_count": 9},
            {"key": 0, "key_as_string": "false", "doc_count": 1}
        ]})));

        let endpoint = &availability.endpoints[0];
        assert_eq!(endpoint.key, "default");
        assert_eq!(endpoint.values.len(), 5);
        assert_eq!(endpoint.values[1].key, "1h");
        assert_eq!(endpoint.values[1].from, 1000);
        assert!(endpoint.values.iter().all(|w| w.value == 90.0));
    }

    #[test]
    fn test_zero_response_times_are_dropped_but_availability_kept() {
        let avg = to_average_response_time_response(&health_response(json!({"value": 0.0})));
        assert!(avg.endpoints.is_empty());

        let availability = to_availability_response(&health_response(json!({"buckets": []})));
        assert_eq!(availability.endpoints.len(), 1);
        assert!(availability.endpoints[0].values.iter().all(|w| w.value == 100.0));
    }

    // ========================================================================
    // Logs
    // ========================================================================

    #[test]
    fn test_tabular_keeps_backend_order() {
        let hit = |id: &str, ts: &str| {
            json!({"_id": id, "_source": {
                "id": id, "transaction": "tx", "@timestamp": ts, "uri": "/", "method": "GET",
                "endpoint": "http://backend", "status": 200, "response-time": 5,
                "client-request-headers": {"Accept": ["*/*"]}
            }})
        };
        let tabular = to_tabular_response(&response(json!({"hits": {"total": 40, "hits": [
            hit("r-2", "2024-01-01T10:00:01.000+00:00"),
            hit("r-1", "2024-01-01T10:00:00.000+00:00")
        ]}})))
        .unwrap();

        assert_eq!(tabular.total, 40);
        let ids: Vec<_> = tabular.logs.iter().map(|log| log.id.as_str()).collect();
        assert_eq!(ids, vec!["r-2", "r-1"]);
    }

    #[test]
    fn test_response_time_rounded() {
        let avg = to_average_response_time_response(&health_response(json!({"value": 41.6})));
        assert_eq!(avg.endpoints[0].values[0].value, 42);
    }
}
