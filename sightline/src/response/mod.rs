//! Typed query responses and the builders that produce them

mod builders;
mod types;

pub use builders::{
    to_availability_response, to_average_response_time_response, to_count_response,
    to_date_histogram_response, to_group_by_response, to_health_logs_response,
    to_tabular_response,
};
pub use types::{
    AvailabilityResponse, AverageResponseTimeResponse, CountResponse, DateHistogramResponse,
    EndpointSeries, GroupByResponse, GroupByValue, HealthLogsResponse, Response,
    TabularResponse, WindowValue,
};
