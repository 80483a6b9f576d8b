//! Backend-agnostic compiled request

use crate::query::model::{DocumentKind, SortDirection};
use crate::query::naming::MetricKind;
use serde::Serialize;

/// A single filter clause; every clause of a [`BoolFilter`] must match
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterClause {
    /// Inclusive epoch-millisecond range
    Range { field: String, gte: i64, lte: i64 },
    Term { field: String, value: String },
    QueryString(String),
    Ids(Vec<String>),
}

/// Conjunction of filter clauses; an empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoolFilter {
    pub clauses: Vec<FilterClause>,
}

impl BoolFilter {
    pub fn push(&mut self, clause: FilterClause) {
        self.clauses.push(clause);
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermsOrder {
    /// Name of the sibling sub-aggregation to order by
    pub aggregation: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeBucket {
    pub key: String,
    pub from: f64,
    pub to: f64,
}

/// Date range open on the right, anchored on a date-math expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateWindow {
    pub key: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AggregationNode {
    DateHistogram {
        name: String,
        field: String,
        interval_ms: u64,
        min_bound: i64,
        max_bound: i64,
        time_zone: String,
        children: Vec<AggregationNode>,
    },
    Terms {
        name: String,
        field: String,
        size: Option<u32>,
        order: Option<TermsOrder>,
        children: Vec<AggregationNode>,
    },
    Range {
        name: String,
        field: String,
        ranges: Vec<RangeBucket>,
        children: Vec<AggregationNode>,
    },
    DateRange {
        name: String,
        field: String,
        ranges: Vec<DateWindow>,
        children: Vec<AggregationNode>,
    },
    Metric {
        name: String,
        kind: MetricKind,
        field: String,
    },
}

impl AggregationNode {
    pub fn name(&self) -> &str {
        match self {
            Self::DateHistogram { name, .. }
            | Self::Terms { name, .. }
            | Self::Range { name, .. }
            | Self::DateRange { name, .. }
            | Self::Metric { name, .. } => name,
        }
    }

    pub fn children(&self) -> &[AggregationNode] {
        match self {
            Self::DateHistogram { children, .. }
            | Self::Terms { children, .. }
            | Self::Range { children, .. }
            | Self::DateRange { children, .. } => children,
            Self::Metric { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// Everything a backend binding needs to run one search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledRequest {
    pub document_kind: DocumentKind,
    /// Never empty
    pub partitions: Vec<String>,
    pub filter: BoolFilter,
    pub aggregation: Option<AggregationNode>,
    pub from: u32,
    pub size: u32,
    pub sort: Option<Sort>,
    pub source_excludes: Vec<String>,
}

impl CompiledRequest {
    /// Comma-separated partition list for the search path
    pub fn partitions_path(&self) -> String {
        self.partitions.join(",")
    }
}
