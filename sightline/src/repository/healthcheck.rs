use super::RepositoryContext;
use crate::aggregation::HistogramMode;
use crate::document::{DocumentMapper, ExtendedHealthLog};
use crate::error::Error;
use crate::query::{DocumentKind, Query, TimeRange};
use crate::response::{
    to_availability_response, to_average_response_time_response, to_count_response,
    to_date_histogram_response, to_group_by_response, to_health_logs_response, Response,
};
use crate::Result;
use chrono::Utc;

/// Window applied when a health-check query carries no time range
pub const DEFAULT_WINDOW_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Health-check analytics, logs and lookups
#[derive(Clone)]
pub struct HealthCheckRepository {
    context: RepositoryContext,
}

impl HealthCheckRepository {
    pub fn new(context: RepositoryContext) -> Self {
        Self { context }
    }

    pub async fn query(&self, query: &Query) -> Result<Response> {
        self.query_at(query, Utc::now().timestamp_millis()).await
    }

    /// Same as [`Self::query`] with the default window ending at `now`
    pub async fn query_at(&self, query: &Query, now: i64) -> Result<Response> {
        let query = with_default_window(query, now);
        let request = self
            .context
            .compiler()
            .compile(&query, DocumentKind::Health)?;
        let operation = operation_name(&query);
        let response = self.context.execute(operation, request).await?;

        Ok(match &query {
            Query::Count(_) => Response::Count(to_count_response(&response)),
            Query::GroupBy(_) => Response::GroupBy(to_group_by_response(&response)),
            Query::DateHistogram(q) => Response::DateHistogram(to_date_histogram_response(
                &response,
                &q.aggregations,
                HistogramMode::Availability,
            )),
            Query::Availability(_) => Response::Availability(to_availability_response(&response)),
            Query::AverageResponseTime(_) => {
                Response::AverageResponseTime(to_average_response_time_response(&response))
            }
            Query::Logs(_) => Response::HealthLogs(to_health_logs_response(&response)?),
        })
    }

    /// Health check with every step it ran
    pub async fn find_by_id(&self, id: &str) -> Result<ExtendedHealthLog> {
        let request = self
            .context
            .compiler()
            .compile_find_by_id(id, DocumentKind::Health);
        let response = self.context.execute("find_health_check", request).await?;

        match response.hits.hits.first() {
            Some(hit) => DocumentMapper::extended_health_log(hit),
            None => Err(Error::NotFound(format!("Health-check [{}] does not exist", id))),
        }
    }
}

/// `query` with its time range defaulted to the [`DEFAULT_WINDOW_MS`] before `now`
pub fn with_default_window(query: &Query, now: i64) -> Query {
    let mut query = query.clone();
    let filter = match &mut query {
        Query::Count(q) => &mut q.filter,
        Query::GroupBy(q) => &mut q.filter,
        Query::DateHistogram(q) => &mut q.filter,
        Query::Availability(q) => &mut q.filter,
        Query::AverageResponseTime(q) => &mut q.filter,
        Query::Logs(q) => &mut q.filter,
    };
    if filter.time_range.is_none() {
        filter.time_range = Some(TimeRange::last(DEFAULT_WINDOW_MS, now));
    }
    query
}

fn operation_name(query: &Query) -> &'static str {
    match query {
        Query::Count(_) => "health_count",
        Query::GroupBy(_) => "health_group_by",
        Query::DateHistogram(_) => "health_date_histogram",
        Query::Availability(_) => "availability",
        Query::AverageResponseTime(_) => "average_response_time",
        Query::Logs(_) => "health_logs",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{AvailabilityQuery, QueryFilter};

    #[test]
    fn test_default_window_applied_once() {
        let now = 1_704_067_200_000;
        let query = with_default_window(&Query::Availability(AvailabilityQuery::default()), now);
        let range = query.filter().time_range.unwrap();
        assert_eq!(range.to(), now);
        assert_eq!(range.span_ms(), DEFAULT_WINDOW_MS);

        let explicit = Query::Availability(AvailabilityQuery {
            filter: QueryFilter::between(TimeRange::new(1, 2).unwrap()),
            ..Default::default()
        });
        assert_eq!(with_default_window(&explicit, now), explicit);
    }
}
