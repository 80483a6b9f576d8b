//! Query model and compiler

mod compiler;
mod model;
mod naming;
mod request;

pub use compiler::{
    QueryCompiler, AVAILABLE_FIELD, DATE_HISTOGRAM_NAME, GROUP_BY_SIZE, HEALTH_RANGES_NAME,
    HEALTH_RESULTS_NAME, HEALTH_TERMS_NAME, HEALTH_WINDOWS, RESPONSE_TIME_FIELD, TIMESTAMP_FIELD,
};
pub use model::{
    AggregationKind, AggregationSpec, AvailabilityQuery, AverageResponseTimeQuery, CountQuery,
    DateHistogramQuery, DocumentKind, GroupByQuery, GroupOrder, GroupRange, HealthField,
    Interval, LogsQuery, Query, QueryFilter, RootScope, SortDirection, TimeRange,
};
pub use naming::{AggregationName, MetricKind};
pub use request::{
    AggregationNode, BoolFilter, CompiledRequest, DateWindow, FilterClause, RangeBucket, Sort,
    TermsOrder,
};
