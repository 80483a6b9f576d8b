use super::RepositoryContext;
use crate::aggregation::HistogramMode;
use crate::query::{CountQuery, DateHistogramQuery, DocumentKind, GroupByQuery, Query};
use crate::response::{
    to_count_response, to_date_histogram_response, to_group_by_response, CountResponse,
    DateHistogramResponse, GroupByResponse, Response,
};
use crate::Result;

/// Request analytics: counts, group-bys and date histograms
#[derive(Clone)]
pub struct AnalyticsRepository {
    context: RepositoryContext,
}

impl AnalyticsRepository {
    pub fn new(context: RepositoryContext) -> Self {
        Self { context }
    }

    /// Dispatch on the query archetype.
    ///
    /// Health-check archetypes belong to
    /// [`HealthCheckRepository`](super::HealthCheckRepository) and log pages to
    /// [`LogRepository`](super::LogRepository); both are answered here against
    /// request documents as well.
    pub async fn query(&self, query: &Query) -> Result<Response> {
        match query {
            Query::Count(q) => self.count(q).await.map(Response::Count),
            Query::GroupBy(q) => self.group_by(q).await.map(Response::GroupBy),
            Query::DateHistogram(q) => self.date_histogram(q).await.map(Response::DateHistogram),
            Query::Logs(q) => super::LogRepository::new(self.context.clone())
                .query(q)
                .await
                .map(Response::Tabular),
            Query::Availability(_) | Query::AverageResponseTime(_) => {
                super::HealthCheckRepository::new(self.context.clone())
                    .query(query)
                    .await
            }
        }
    }

    pub async fn count(&self, query: &CountQuery) -> Result<CountResponse> {
        let request = self
            .context
            .compiler()
            .compile(&Query::Count(query.clone()), DocumentKind::Request)?;
        let response = self.context.execute("count", request).await?;
        Ok(to_count_response(&response))
    }

    pub async fn group_by(&self, query: &GroupByQuery) -> Result<GroupByResponse> {
        let request = self
            .context
            .compiler()
            .compile(&Query::GroupBy(query.clone()), DocumentKind::Request)?;
        let response = self.context.execute("group_by", request).await?;
        Ok(to_group_by_response(&response))
    }

    pub async fn date_histogram(&self, query: &DateHistogramQuery) -> Result<DateHistogramResponse> {
        let request = self
            .context
            .compiler()
            .compile(&Query::DateHistogram(query.clone()), DocumentKind::Request)?;
        let response = self.context.execute("date_histogram", request).await?;
        Ok(to_date_histogram_response(
            &response,
            &query.aggregations,
            HistogramMode::Counts,
        ))
    }
}
