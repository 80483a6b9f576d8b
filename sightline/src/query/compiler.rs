//! Query compiler
//!
//! Turns a [`Query`] into a [`CompiledRequest`]: partitions from the time
//! range, a conjunctive filter, and the aggregation tree of the archetype.

use crate::error::Error;
use crate::index::IndexResolver;
use crate::query::model::{
    AggregationSpec, AvailabilityQuery, AverageResponseTimeQuery, DateHistogramQuery,
    DocumentKind, GroupByQuery, HealthField, LogsQuery, Query, QueryFilter, SortDirection,
    TimeRange,
};
use crate::query::naming::{AggregationName, MetricKind};
use crate::query::request::{
    AggregationNode, BoolFilter, CompiledRequest, DateWindow, FilterClause, RangeBucket, Sort,
    TermsOrder,
};
use crate::Result;
use chrono::{DateTime, Utc};

/// Timestamp field of every document kind
pub const TIMESTAMP_FIELD: &str = "@timestamp";
/// Name of the top-level date histogram
pub const DATE_HISTOGRAM_NAME: &str = "by_date";
/// Bucket cap for group-by terms
pub const GROUP_BY_SIZE: u32 = 20;

pub const HEALTH_TERMS_NAME: &str = "terms";
pub const HEALTH_RANGES_NAME: &str = "ranges";
pub const HEALTH_RESULTS_NAME: &str = "results";
pub const AVAILABLE_FIELD: &str = "available";
pub const RESPONSE_TIME_FIELD: &str = "response-time";

/// Windows measured back from now: `(key, date-math anchor)`
pub const HEALTH_WINDOWS: [(&str, &str); 5] = [
    ("1m", "now-1m"),
    ("1h", "now-1h"),
    ("1d", "now-1d"),
    ("1w", "now-1w"),
    ("1M", "now-1M"),
];

const REQUEST_ID_FIELD: &str = "id";
const GATEWAY_FIELD: &str = "gateway";
const PAYLOAD_EXCLUDES: [&str; 2] = ["*.client", "*.proxy"];

#[derive(Debug, Clone)]
pub struct QueryCompiler {
    resolver: IndexResolver,
}

impl QueryCompiler {
    pub fn new(resolver: IndexResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &IndexResolver {
        &self.resolver
    }

    pub fn compile(&self, query: &Query, kind: DocumentKind) -> Result<CompiledRequest> {
        let filter = query.filter();
        if let Some(range) = &filter.time_range {
            validate_range(range)?;
        }

        let mut request = self.base_request(kind, filter);

        match query {
            Query::Count(_) => {}
            Query::GroupBy(q) => request.aggregation = Some(group_by_node(q)),
            Query::DateHistogram(q) => {
                request.aggregation = Some(self.date_histogram_node(q)?);
            }
            Query::Availability(q) => request.aggregation = Some(availability_node(q)),
            Query::AverageResponseTime(q) => {
                request.aggregation = Some(average_response_time_node(q));
            }
            Query::Logs(q) => self.paginate(&mut request, q)?,
        }

        tracing::debug!(
            archetype = query.archetype(),
            document_kind = %kind,
            partitions = request.partitions.len(),
            "Compiled query"
        );
        Ok(request)
    }

    /// Single-document lookup across every partition
    pub fn compile_find_by_id(&self, id: &str, kind: DocumentKind) -> CompiledRequest {
        let mut filter = BoolFilter::default();
        filter.push(match kind {
            DocumentKind::Request | DocumentKind::Log => FilterClause::Term {
                field: REQUEST_ID_FIELD.to_string(),
                value: id.to_string(),
            },
            DocumentKind::Health | DocumentKind::Monitor => {
                FilterClause::Ids(vec![id.to_string()])
            }
        });

        CompiledRequest {
            document_kind: kind,
            partitions: vec![self.resolver.all_partitions()],
            filter,
            aggregation: None,
            from: 0,
            size: 1,
            sort: None,
            source_excludes: Vec::new(),
        }
    }

    /// Latest monitoring document of a gateway in today's partition
    pub fn compile_monitoring(&self, gateway_id: &str) -> CompiledRequest {
        self.compile_monitoring_at(gateway_id, Utc::now())
    }

    pub fn compile_monitoring_at(&self, gateway_id: &str, now: DateTime<Utc>) -> CompiledRequest {
        let mut filter = BoolFilter::default();
        filter.push(FilterClause::Term {
            field: GATEWAY_FIELD.to_string(),
            value: gateway_id.to_string(),
        });

        CompiledRequest {
            document_kind: DocumentKind::Monitor,
            partitions: vec![self.resolver.today_partition_at(now)],
            filter,
            aggregation: None,
            from: 0,
            size: 1,
            sort: Some(newest_first()),
            source_excludes: Vec::new(),
        }
    }

    fn base_request(&self, kind: DocumentKind, filter: &QueryFilter) -> CompiledRequest {
        CompiledRequest {
            document_kind: kind,
            partitions: self.partitions(filter.time_range.as_ref()),
            filter: bool_filter(filter),
            aggregation: None,
            from: 0,
            size: 0,
            sort: None,
            source_excludes: Vec::new(),
        }
    }

    fn partitions(&self, range: Option<&TimeRange>) -> Vec<String> {
        let partitions = range
            .map(|r| self.resolver.partitions_for(r.from(), r.to()))
            .unwrap_or_default();
        if partitions.is_empty() {
            vec![self.resolver.all_partitions()]
        } else {
            partitions
        }
    }

    fn date_histogram_node(&self, query: &DateHistogramQuery) -> Result<AggregationNode> {
        let range = query.filter.time_range.ok_or_else(|| {
            Error::InvalidQuery("date histogram requires a time range".to_string())
        })?;

        Ok(AggregationNode::DateHistogram {
            name: DATE_HISTOGRAM_NAME.to_string(),
            field: TIMESTAMP_FIELD.to_string(),
            interval_ms: query.interval.millis(),
            min_bound: range.from(),
            max_bound: range.to(),
            time_zone: self.resolver.zone_offset(),
            children: query.aggregations.iter().map(spec_node).collect(),
        })
    }

    fn paginate(&self, request: &mut CompiledRequest, query: &LogsQuery) -> Result<()> {
        if query.page == 0 {
            return Err(Error::InvalidQuery("page numbers start at 1".to_string()));
        }
        if query.size == 0 {
            return Err(Error::InvalidQuery("page size must be positive".to_string()));
        }

        request.from = (query.page - 1).saturating_mul(query.size);
        request.size = query.size;
        request.sort = Some(newest_first());
        if matches!(request.document_kind, DocumentKind::Request | DocumentKind::Log) {
            request.source_excludes = PAYLOAD_EXCLUDES.iter().map(|s| s.to_string()).collect();
        }
        Ok(())
    }
}

fn validate_range(range: &TimeRange) -> Result<()> {
    if range.from() > range.to() {
        return Err(Error::InvalidQuery(format!(
            "time range starts after it ends ({} > {})",
            range.from(),
            range.to()
        )));
    }
    Ok(())
}

fn bool_filter(filter: &QueryFilter) -> BoolFilter {
    let mut bool_filter = BoolFilter::default();

    if let Some(range) = &filter.time_range {
        bool_filter.push(FilterClause::Range {
            field: TIMESTAMP_FIELD.to_string(),
            gte: range.from(),
            lte: range.to(),
        });
    }
    if let Some(root) = &filter.root {
        bool_filter.push(FilterClause::Term {
            field: root.field.clone(),
            value: root.id.clone(),
        });
    }
    if let Some(query) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
        bool_filter.push(FilterClause::QueryString(query.to_string()));
    }

    bool_filter
}

fn newest_first() -> Sort {
    Sort {
        field: TIMESTAMP_FIELD.to_string(),
        direction: SortDirection::Desc,
    }
}

fn spec_node(spec: &AggregationSpec) -> AggregationNode {
    let name = spec.name().encode();
    match spec.kind.metric() {
        Some(kind) => AggregationNode::Metric {
            name,
            kind,
            field: spec.field.clone(),
        },
        None => AggregationNode::Terms {
            name,
            field: spec.field.clone(),
            size: None,
            order: None,
            children: Vec::new(),
        },
    }
}

fn group_by_node(query: &GroupByQuery) -> AggregationNode {
    if !query.ranges.is_empty() {
        return AggregationNode::Range {
            name: AggregationName::ByRange(query.field.clone()).encode(),
            field: query.field.clone(),
            ranges: query
                .ranges
                .iter()
                .map(|r| RangeBucket {
                    key: r.key(),
                    from: r.from,
                    to: r.to,
                })
                .collect(),
            children: Vec::new(),
        };
    }

    let (order, children) = match &query.order {
        Some(order) => {
            let metric = AggregationName::Metric(MetricKind::Avg, order.field.clone()).encode();
            (
                Some(TermsOrder {
                    aggregation: metric.clone(),
                    direction: order.direction,
                }),
                vec![AggregationNode::Metric {
                    name: metric,
                    kind: MetricKind::Avg,
                    field: order.field.clone(),
                }],
            )
        }
        None => (None, Vec::new()),
    };

    AggregationNode::Terms {
        name: AggregationName::By(query.field.clone()).encode(),
        field: query.field.clone(),
        size: Some(GROUP_BY_SIZE),
        order,
        children,
    }
}

fn health_windows(child: AggregationNode) -> AggregationNode {
    AggregationNode::DateRange {
        name: HEALTH_RANGES_NAME.to_string(),
        field: TIMESTAMP_FIELD.to_string(),
        ranges: HEALTH_WINDOWS
            .iter()
            .map(|(key, from)| DateWindow {
                key: key.to_string(),
                from: from.to_string(),
            })
            .collect(),
        children: vec![child],
    }
}

fn health_terms(field: HealthField, child: AggregationNode) -> AggregationNode {
    AggregationNode::Terms {
        name: HEALTH_TERMS_NAME.to_string(),
        field: field.as_str().to_string(),
        size: None,
        order: None,
        children: vec![health_windows(child)],
    }
}

fn availability_node(query: &AvailabilityQuery) -> AggregationNode {
    health_terms(
        query.field,
        AggregationNode::Terms {
            name: HEALTH_RESULTS_NAME.to_string(),
            field: AVAILABLE_FIELD.to_string(),
            size: None,
            order: None,
            children: Vec::new(),
        },
    )
}

fn average_response_time_node(query: &AverageResponseTimeQuery) -> AggregationNode {
    health_terms(
        query.field,
        AggregationNode::Metric {
            name: HEALTH_RESULTS_NAME.to_string(),
            kind: MetricKind::Avg,
            field: RESPONSE_TIME_FIELD.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::model::{
        CountQuery, GroupOrder, GroupRange, Interval, RootScope,
    };
    use chrono::TimeZone;

    const HOUR: i64 = 3_600_000;

    fn compiler() -> QueryCompiler {
        QueryCompiler::new(IndexResolver::utc("gravitee"))
    }

    fn jan_first() -> i64 {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap()
            .timestamp_millis()
    }

    fn range(from: i64, to: i64) -> QueryFilter {
        QueryFilter::between(TimeRange::new(from, to).unwrap())
    }

    // ========================================================================
    // Partitions and filters
    // ========================================================================

    #[test]
    fn test_count_has_no_aggregation() {
        let t0 = jan_first();
        let query = Query::Count(CountQuery {
            filter: range(t0, t0 + 50 * HOUR),
        });
        let request = compiler().compile(&query, DocumentKind::Request).unwrap();

        assert!(request.aggregation.is_none());
        assert_eq!(request.size, 0);
        assert_eq!(
            request.partitions,
            vec![
                "gravitee-2024.01.01",
                "gravitee-2024.01.02",
                "gravitee-2024.01.03"
            ]
        );
    }

    #[test]
    fn test_no_time_range_uses_wildcard() {
        let query = Query::Count(CountQuery::default());
        let request = compiler().compile(&query, DocumentKind::Request).unwrap();
        assert_eq!(request.partitions, vec!["gravitee-*"]);
        assert!(request.filter.is_empty());
    }

    #[test]
    fn test_inverted_range_is_invalid() {
        // Bypass the validated constructor the way a deserialized query could
        let filter: QueryFilter =
            serde_json::from_str(r#"{"time_range":{"from":10,"to":5}}"#).unwrap();
        let query = Query::Count(CountQuery { filter });
        let err = compiler().compile(&query, DocumentKind::Request).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn test_zero_interval_never_compiles() {
        let parsed = serde_json::from_value::<Query>(serde_json::json!({
            "type": "date_histogram",
            "filter": {"time_range": {"from": 0, "to": 10}},
            "interval": 0,
            "aggregations": []
        }));
        assert!(parsed.is_err());

        let valid: Query = serde_json::from_value(serde_json::json!({
            "type": "date_histogram",
            "filter": {"time_range": {"from": 0, "to": 10}},
            "interval": 1000,
            "aggregations": []
        }))
        .unwrap();
        assert!(compiler().compile(&valid, DocumentKind::Request).is_ok());
    }

    #[test]
    fn test_filter_clauses_are_anded_in_order() {
        let t0 = jan_first();
        let filter = range(t0, t0 + HOUR)
            .with_root(RootScope::new("api", "api-1"))
            .with_query("status:500");
        let query = Query::Count(CountQuery { filter });
        let request = compiler().compile(&query, DocumentKind::Request).unwrap();

        assert_eq!(
            request.filter.clauses,
            vec![
                FilterClause::Range {
                    field: "@timestamp".to_string(),
                    gte: t0,
                    lte: t0 + HOUR
                },
                FilterClause::Term {
                    field: "api".to_string(),
                    value: "api-1".to_string()
                },
                FilterClause::QueryString("status:500".to_string()),
            ]
        );
    }

    #[test]
    fn test_blank_free_text_is_ignored() {
        let filter = QueryFilter::default().with_query("  ");
        let query = Query::Count(CountQuery { filter });
        let request = compiler().compile(&query, DocumentKind::Request).unwrap();
        assert!(request.filter.is_empty());
    }

    // ========================================================================
    // Date histogram
    // ========================================================================

    #[test]
    fn test_date_histogram_children() {
        let t0 = jan_first();
        let query = Query::DateHistogram(DateHistogramQuery {
            filter: range(t0, t0 + 2 * HOUR),
            interval: Interval::new(Interval::HOUR).unwrap(),
            aggregations: vec![
                AggregationSpec::field("status"),
                AggregationSpec::avg("response-time"),
            ],
        });
        let request = compiler().compile(&query, DocumentKind::Request).unwrap();

        let Some(AggregationNode::DateHistogram {
            name,
            interval_ms,
            min_bound,
            max_bound,
            time_zone,
            children,
            ..
        }) = request.aggregation
        else {
            panic!("expected a date histogram");
        };
        assert_eq!(name, "by_date");
        assert_eq!(interval_ms, 3_600_000);
        assert_eq!((min_bound, max_bound), (t0, t0 + 2 * HOUR));
        assert_eq!(time_zone, "+00:00");
        let names: Vec<_> = children.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["by_status", "avg_response-time"]);
    }

    #[test]
    fn test_date_histogram_requires_range() {
        let query = Query::DateHistogram(DateHistogramQuery {
            filter: QueryFilter::default(),
            interval: Interval::new(60_000).unwrap(),
            aggregations: vec![],
        });
        assert!(matches!(
            compiler().compile(&query, DocumentKind::Request),
            Err(Error::InvalidQuery(_))
        ));
    }

    // ========================================================================
    // Group by
    // ========================================================================

    #[test]
    fn test_group_by_ranges() {
        let query = Query::GroupBy(GroupByQuery {
            filter: QueryFilter::default(),
            field: "status".to_string(),
            ranges: vec![GroupRange::new(100.0, 199.0), GroupRange::new(200.0, 299.0)],
            order: None,
        });
        let request = compiler().compile(&query, DocumentKind::Request).unwrap();

        let Some(AggregationNode::Range { name, ranges, .. }) = request.aggregation else {
            panic!("expected a range aggregation");
        };
        assert_eq!(name, "by_status_range");
        assert_eq!(ranges[0].key, "100-199");
        assert_eq!(ranges[1].key, "200-299");
    }

    #[test]
    fn test_group_by_terms_with_order() {
        let query = Query::GroupBy(GroupByQuery {
            filter: QueryFilter::default(),
            field: "api".to_string(),
            ranges: vec![],
            order: Some(GroupOrder {
                field: "response-time".to_string(),
                direction: SortDirection::Desc,
            }),
        });
        let request = compiler().compile(&query, DocumentKind::Request).unwrap();

        let Some(AggregationNode::Terms {
            name,
            size,
            order,
            children,
            ..
        }) = request.aggregation
        else {
            panic!("expected a terms aggregation");
        };
        assert_eq!(name, "by_api");
        assert_eq!(size, Some(20));
        assert_eq!(order.unwrap().aggregation, "avg_response-time");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name(), "avg_response-time");
    }

    // ========================================================================
    // Health checks
    // ========================================================================

    #[test]
    fn test_availability_tree() {
        let query = Query::Availability(AvailabilityQuery::default());
        let request = compiler().compile(&query, DocumentKind::Health).unwrap();
        let root = request.aggregation.unwrap();

        assert_eq!(root.name(), "terms");
        let ranges = &root.children()[0];
        let AggregationNode::DateRange { ranges: windows, .. } = ranges else {
            panic!("expected date ranges");
        };
        let keys: Vec<_> = windows.iter().map(|w| w.key.as_str()).collect();
        assert_eq!(keys, vec!["1m", "1h", "1d", "1w", "1M"]);
        assert_eq!(windows[4].from, "now-1M");
        assert!(matches!(
            &ranges.children()[0],
            AggregationNode::Terms { name, field, .. } if name == "results" && field == "available"
        ));
    }

    #[test]
    fn test_average_response_time_tree() {
        let query = Query::AverageResponseTime(AverageResponseTimeQuery {
            filter: QueryFilter::default(),
            field: HealthField::Gateway,
        });
        let request = compiler().compile(&query, DocumentKind::Health).unwrap();
        let root = request.aggregation.unwrap();

        assert!(matches!(&root, AggregationNode::Terms { field, .. } if field == "gateway"));
        assert!(matches!(
            &root.children()[0].children()[0],
            AggregationNode::Metric { kind: MetricKind::Avg, field, .. } if field == "response-time"
        ));
    }

    // ========================================================================
    // Logs and lookups
    // ========================================================================

    #[test]
    fn test_logs_pagination() {
        let query = Query::Logs(LogsQuery::new(QueryFilter::default(), 3, 20));
        let request = compiler().compile(&query, DocumentKind::Request).unwrap();

        assert_eq!(request.from, 40);
        assert_eq!(request.size, 20);
        assert_eq!(request.sort.as_ref().unwrap().direction, SortDirection::Desc);
        assert_eq!(request.source_excludes, vec!["*.client", "*.proxy"]);
    }

    #[test]
    fn test_health_logs_keep_full_source() {
        let query = Query::Logs(LogsQuery::new(QueryFilter::default(), 1, 10));
        let request = compiler().compile(&query, DocumentKind::Health).unwrap();
        assert!(request.source_excludes.is_empty());
        assert_eq!(request.from, 0);
    }

    #[test]
    fn test_logs_reject_page_zero() {
        let query = Query::Logs(LogsQuery::new(QueryFilter::default(), 0, 10));
        assert!(compiler().compile(&query, DocumentKind::Request).is_err());
        let query = Query::Logs(LogsQuery::new(QueryFilter::default(), 1, 0));
        assert!(compiler().compile(&query, DocumentKind::Request).is_err());
    }

    #[test]
    fn test_find_by_id() {
        let request = compiler().compile_find_by_id("abc", DocumentKind::Request);
        assert_eq!(request.partitions, vec!["gravitee-*"]);
        assert_eq!(request.size, 1);
        assert_eq!(
            request.filter.clauses,
            vec![FilterClause::Term {
                field: "id".to_string(),
                value: "abc".to_string()
            }]
        );

        let request = compiler().compile_find_by_id("hc-1", DocumentKind::Health);
        assert_eq!(
            request.filter.clauses,
            vec![FilterClause::Ids(vec!["hc-1".to_string()])]
        );
    }

    #[test]
    fn test_monitoring_uses_today() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).single().unwrap();
        let request = compiler().compile_monitoring_at("gw-1", now);
        assert_eq!(request.partitions, vec!["gravitee-2024.05.02"]);
        assert_eq!(request.document_kind, DocumentKind::Monitor);
        assert_eq!(request.size, 1);
    }
}
