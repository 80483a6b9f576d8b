//! Search response as returned by the backend
//!
//! Only the parts the decoders read are typed. Bucket sub-aggregations stay
//! raw JSON until asked for, so bucket keys the decoder does not know about
//! (`from_as_string`, `key_as_string`, ...) never break deserialization.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Body of a `_search` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: Option<u64>,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub hits: SearchHits,
    #[serde(default)]
    pub aggregations: Option<BTreeMap<String, AggregationResult>>,
}

impl SearchResponse {
    /// Response carrying only a total hit count
    pub fn with_total(total: u64) -> Self {
        Self {
            hits: SearchHits {
                total,
                hits: Vec::new(),
            },
            ..Default::default()
        }
    }

    pub fn total(&self) -> u64 {
        self.hits.total
    }

    pub fn aggregation(&self, name: &str) -> Option<&AggregationResult> {
        self.aggregations.as_ref()?.get(name)
    }

    /// Whether the response has no aggregation results at all
    pub fn has_no_aggregations(&self) -> bool {
        self.aggregations.as_ref().map_or(true, |a| a.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHits {
    #[serde(default, deserialize_with = "deserialize_total")]
    pub total: u64,
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

/// `hits.total` is a bare number on older backends and `{ "value": n }` on newer ones
fn deserialize_total<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Total {
        Count(u64),
        Object { value: u64 },
    }

    Ok(match Total::deserialize(deserializer)? {
        Total::Count(n) | Total::Object { value: n } => n,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    #[serde(rename = "_type", default)]
    pub doc_type: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

/// One named aggregation result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregationResult {
    Buckets { buckets: Vec<ResponseBucket> },
    Value { value: Option<f64> },
    Other(Value),
}

impl AggregationResult {
    pub fn buckets(&self) -> &[ResponseBucket] {
        match self {
            Self::Buckets { buckets } => buckets,
            _ => &[],
        }
    }

    pub fn is_buckets(&self) -> bool {
        matches!(self, Self::Buckets { .. })
    }

    /// Single metric value; `None` when absent or not finite
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value { value } => value.filter(|v| v.is_finite()),
            _ => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseBucket {
    #[serde(default)]
    pub key: Value,
    #[serde(default)]
    pub key_as_string: Option<String>,
    #[serde(default)]
    pub doc_count: u64,
    #[serde(default)]
    pub from: Option<f64>,
    #[serde(default)]
    pub to: Option<f64>,
    #[serde(flatten)]
    pub rest: BTreeMap<String, Value>,
}

impl ResponseBucket {
    /// Raw key as text: strings as-is, numbers in their JSON form
    pub fn key_text(&self) -> String {
        match &self.key {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// `key_as_string` when present, otherwise [`Self::key_text`]
    pub fn key_label(&self) -> String {
        self.key_as_string
            .clone()
            .unwrap_or_else(|| self.key_text())
    }

    /// Key as epoch milliseconds (date-histogram buckets)
    pub fn key_millis(&self) -> Option<i64> {
        match &self.key {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            _ => None,
        }
    }

    /// Parse one sub-aggregation by name
    pub fn sub_aggregation(&self, name: &str) -> Option<AggregationResult> {
        self.rest
            .get(name)
            .filter(|v| v.is_object())
            .and_then(|v| AggregationResult::deserialize(v).ok())
    }

    /// Parse every object-valued entry as a sub-aggregation, in key order
    pub fn sub_aggregations(&self) -> impl Iterator<Item = (&str, AggregationResult)> + '_ {
        self.rest.iter().filter_map(|(name, raw)| {
            if !raw.is_object() {
                return None;
            }
            AggregationResult::deserialize(raw)
                .ok()
                .map(|result| (name.as_str(), result))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_total_as_number_or_object() {
        let old: SearchResponse = serde_json::from_value(json!({"hits": {"total": 42}})).unwrap();
        let new: SearchResponse =
            serde_json::from_value(json!({"hits": {"total": {"value": 7, "relation": "eq"}}}))
                .unwrap();
        assert_eq!(old.total(), 42);
        assert_eq!(new.total(), 7);
    }

    #[test]
    fn test_empty_body() {
        let response: SearchResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response.total(), 0);
        assert!(response.has_no_aggregations());
    }

    #[test]
    fn test_bucket_and_metric_results() {
        let response: SearchResponse = serde_json::from_value(json!({
            "hits": {"total": 3, "hits": []},
            "aggregations": {
                "by_status": {
                    "doc_count_error_upper_bound": 0,
                    "buckets": [{"key": 200, "doc_count": 3, "avg_response-time": {"value": 12.5}}]
                },
                "avg_response-time": {"value": null}
            }
        }))
        .unwrap();

        let terms = response.aggregation("by_status").unwrap();
        assert!(terms.is_buckets());
        let bucket = &terms.buckets()[0];
        assert_eq!(bucket.key_text(), "200");
        assert_eq!(bucket.doc_count, 3);
        assert_eq!(
            bucket.sub_aggregation("avg_response-time").unwrap().value(),
            Some(12.5)
        );

        let metric = response.aggregation("avg_response-time").unwrap();
        assert!(metric.is_value());
        assert_eq!(metric.value(), None);
    }

    #[test]
    fn test_range_bucket_extras_are_tolerated() {
        let bucket: ResponseBucket = serde_json::from_value(json!({
            "key": "1h",
            "from": 1.7e12,
            "from_as_string": "2023-11-14T22:13:20.000Z",
            "doc_count": 5,
            "results": {"buckets": [{"key": 1, "key_as_string": "true", "doc_count": 5}]}
        }))
        .unwrap();

        assert_eq!(bucket.from, Some(1.7e12));
        let subs: Vec<_> = bucket.sub_aggregations().map(|(n, _)| n).collect();
        assert_eq!(subs, vec!["results"]);
        let results = bucket.sub_aggregation("results").unwrap();
        assert_eq!(results.buckets()[0].key_label(), "true");
        assert_eq!(results.buckets()[0].key_text(), "1");
    }

    #[test]
    fn test_key_millis() {
        let bucket: ResponseBucket =
            serde_json::from_value(json!({"key": 1704067200000_i64, "doc_count": 0})).unwrap();
        assert_eq!(bucket.key_millis(), Some(1_704_067_200_000));
    }
}
