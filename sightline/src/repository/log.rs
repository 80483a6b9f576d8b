use super::RepositoryContext;
use crate::document::{DocumentMapper, ExtendedLogRecord};
use crate::error::Error;
use crate::query::{DocumentKind, LogsQuery, Query};
use crate::response::{to_tabular_response, TabularResponse};
use crate::Result;

/// Request log pages and single request lookups
#[derive(Clone)]
pub struct LogRepository {
    context: RepositoryContext,
}

impl LogRepository {
    pub fn new(context: RepositoryContext) -> Self {
        Self { context }
    }

    pub async fn query(&self, query: &LogsQuery) -> Result<TabularResponse> {
        let request = self
            .context
            .compiler()
            .compile(&Query::Logs(query.clone()), DocumentKind::Request)?;
        let response = self.context.execute("logs", request).await?;
        to_tabular_response(&response)
    }

    /// Full request record with client and proxy payloads
    pub async fn find_by_id(&self, id: &str) -> Result<ExtendedLogRecord> {
        let request = self
            .context
            .compiler()
            .compile_find_by_id(id, DocumentKind::Request);
        let response = self.context.execute("find_log", request).await?;

        match response.hits.hits.first() {
            Some(hit) => DocumentMapper::extended_log(&hit.source),
            None => Err(Error::NotFound(format!("Request [{}] does not exist", id))),
        }
    }
}
