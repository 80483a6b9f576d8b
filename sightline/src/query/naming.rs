//! Aggregation names double as type tags.
//!
//! `by_<field>` is a terms aggregation, `by_<field>_range` a numeric range
//! aggregation and `<min|max|avg>_<field>` a single-value metric. The compiler
//! only emits names through [`AggregationName::encode`] and the decoder only
//! reads them through [`AggregationName::parse`].
//!
//! Parsing splits on the first `_` so field names may contain underscores.
//! A terms field whose own name ends in `_range` is indistinguishable from a
//! range aggregation; such fields must be grouped with explicit ranges.

use serde::{Deserialize, Serialize};
use std::fmt;

const RANGE_SUFFIX: &str = "_range";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Min,
    Max,
    Avg,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Avg => "avg",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "avg" => Some(Self::Avg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AggregationName {
    By(String),
    ByRange(String),
    Metric(MetricKind, String),
}

impl AggregationName {
    pub fn encode(&self) -> String {
        match self {
            Self::By(field) => format!("by_{}", field),
            Self::ByRange(field) => format!("by_{}{}", field, RANGE_SUFFIX),
            Self::Metric(kind, field) => format!("{}_{}", kind.as_str(), field),
        }
    }

    /// Recover kind and field; `None` for names outside the convention
    pub fn parse(name: &str) -> Option<Self> {
        let (tag, field) = name.split_once('_')?;
        if field.is_empty() {
            return None;
        }

        if tag == "by" {
            return Some(match field.strip_suffix(RANGE_SUFFIX) {
                Some(inner) if !inner.is_empty() => Self::ByRange(inner.to_string()),
                _ => Self::By(field.to_string()),
            });
        }

        MetricKind::from_tag(tag).map(|kind| Self::Metric(kind, field.to_string()))
    }

    pub fn field(&self) -> &str {
        match self {
            Self::By(field) | Self::ByRange(field) | Self::Metric(_, field) => field,
        }
    }

    pub fn is_metric(&self) -> bool {
        matches!(self, Self::Metric(..))
    }
}

impl fmt::Display for AggregationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
