//! Render a [`CompiledRequest`] as an Elasticsearch `_search` body

use crate::query::{AggregationNode, BoolFilter, CompiledRequest, FilterClause};
use serde_json::{json, Map, Value};

pub fn search_body(request: &CompiledRequest) -> Value {
    let mut body = Map::new();
    body.insert("size".to_string(), json!(request.size));
    if request.from > 0 {
        body.insert("from".to_string(), json!(request.from));
    }
    body.insert("query".to_string(), query(&request.filter));

    if let Some(sort) = &request.sort {
        body.insert(
            "sort".to_string(),
            json!([{ sort.field.as_str(): { "order": sort.direction.as_str() } }]),
        );
    }
    if !request.source_excludes.is_empty() {
        body.insert(
            "_source".to_string(),
            json!({ "excludes": request.source_excludes }),
        );
    }
    if let Some(node) = &request.aggregation {
        body.insert("aggregations".to_string(), aggregations(std::slice::from_ref(node)));
    }

    Value::Object(body)
}

pub fn query(filter: &BoolFilter) -> Value {
    if filter.is_empty() {
        return json!({ "match_all": {} });
    }
    let clauses: Vec<Value> = filter.clauses.iter().map(clause).collect();
    json!({ "bool": { "filter": clauses } })
}

fn clause(clause: &FilterClause) -> Value {
    match clause {
        FilterClause::Range { field, gte, lte } => json!({
            "range": { field.as_str(): { "gte": gte, "lte": lte, "format": "epoch_millis" } }
        }),
        FilterClause::Term { field, value } => json!({ "term": { field.as_str(): value } }),
        FilterClause::QueryString(query) => json!({ "query_string": { "query": query } }),
        FilterClause::Ids(ids) => json!({ "ids": { "values": ids } }),
    }
}

fn aggregations(nodes: &[AggregationNode]) -> Value {
    let rendered: Map<String, Value> = nodes
        .iter()
        .map(|node| (node.name().to_string(), aggregation(node)))
        .collect();
    Value::Object(rendered)
}

fn with_children(mut body: Value, children: &[AggregationNode]) -> Value {
    if !children.is_empty() {
        if let Some(object) = body.as_object_mut() {
            object.insert("aggregations".to_string(), aggregations(children));
        }
    }
    body
}

fn aggregation(node: &AggregationNode) -> Value {
    match node {
        AggregationNode::DateHistogram {
            field,
            interval_ms,
            min_bound,
            max_bound,
            time_zone,
            children,
            ..
        } => with_children(
            json!({
                "date_histogram": {
                    "field": field,
                    "interval": format!("{}ms", interval_ms),
                    "min_doc_count": 0,
                    "extended_bounds": { "min": min_bound, "max": max_bound },
                    "time_zone": time_zone,
                }
            }),
            children,
        ),
        AggregationNode::Terms {
            field,
            size,
            order,
            children,
            ..
        } => {
            let mut terms = Map::new();
            terms.insert("field".to_string(), json!(field));
            if let Some(size) = size {
                terms.insert("size".to_string(), json!(size));
            }
            if let Some(order) = order {
                terms.insert(
                    "order".to_string(),
                    json!({ order.aggregation.as_str(): order.direction.as_str() }),
                );
            }
            with_children(json!({ "terms": terms }), children)
        }
        AggregationNode::Range {
            field,
            ranges,
            children,
            ..
        } => with_children(
            json!({
                "range": {
                    "field": field,
                    "ranges": ranges
                        .iter()
                        .map(|r| json!({ "key": r.key, "from": r.from, "to": r.to }))
                        .collect::<Vec<_>>(),
                }
            }),
            children,
        ),
        AggregationNode::DateRange {
            field,
            ranges,
            children,
            ..
        } => with_children(
            json!({
                "date_range": {
                    "field": field,
                    "ranges": ranges
                        .iter()
                        .map(|w| json!({ "key": w.key, "from": w.from }))
                        .collect::<Vec<_>>(),
                }
            }),
            children,
        ),
        AggregationNode::Metric { kind, field, .. } => json!({ kind.as_str(): { "field": field } }),
    }
}
