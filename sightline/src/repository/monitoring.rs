use super::RepositoryContext;
use crate::document::{DocumentMapper, MonitoringResponse};
use crate::error::Error;
use crate::Result;

/// Latest node statistics reported by a gateway
#[derive(Clone)]
pub struct MonitoringRepository {
    context: RepositoryContext,
}

impl MonitoringRepository {
    pub fn new(context: RepositoryContext) -> Self {
        Self { context }
    }

    pub async fn query(&self, gateway_id: &str) -> Result<MonitoringResponse> {
        let request = self.context.compiler().compile_monitoring(gateway_id);
        let response = self.context.execute("monitoring", request).await?;

        let hit = response.hits.hits.first().ok_or_else(|| {
            Error::NotFound(format!("No monitoring data for gateway [{}]", gateway_id))
        })?;
        DocumentMapper::monitoring(&hit.source)
    }
}
