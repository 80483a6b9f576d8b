//! In-process binding that serves canned responses

use super::{ClusterHealth, SearchBackend};
use crate::aggregation::SearchResponse;
use crate::error::BackendError;
use crate::query::CompiledRequest;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};

enum Reply {
    Ok(SearchResponse),
    Fail { status: u16, body: String },
}

/// Queued replies are served first, then the fallback response.
///
/// Every submitted request is recorded so callers can inspect what was
/// compiled.
#[derive(Default)]
pub struct MemoryBackend {
    queue: Mutex<VecDeque<Reply>>,
    fallback: Mutex<SearchResponse>,
    requests: Mutex<Vec<CompiledRequest>>,
    partitions: Mutex<HashSet<String>>,
    existence_checks: Mutex<Vec<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response returned once the queue is drained
    pub fn with_response(self, response: SearchResponse) -> Self {
        *self.fallback.lock() = response;
        self
    }

    pub fn with_partitions<I, S>(self, partitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partitions
            .lock()
            .extend(partitions.into_iter().map(Into::into));
        self
    }

    pub fn push_response(&self, response: SearchResponse) {
        self.queue.lock().push_back(Reply::Ok(response));
    }

    pub fn push_failure(&self, status: u16, body: impl Into<String>) {
        self.queue.lock().push_back(Reply::Fail {
            status,
            body: body.into(),
        });
    }

    pub fn requests(&self) -> Vec<CompiledRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<CompiledRequest> {
        self.requests.lock().last().cloned()
    }

    /// Partitions probed through [`SearchBackend::partition_exists`]
    pub fn existence_checks(&self) -> Vec<String> {
        self.existence_checks.lock().clone()
    }
}

#[async_trait]
impl SearchBackend for MemoryBackend {
    async fn search(&self, request: &CompiledRequest) -> Result<SearchResponse, BackendError> {
        self.requests.lock().push(request.clone());

        match self.queue.lock().pop_front() {
            Some(Reply::Ok(response)) => Ok(response),
            Some(Reply::Fail { status, body }) => Err(BackendError::Status { status, body }),
            None => Ok(self.fallback.lock().clone()),
        }
    }

    async fn partition_exists(&self, partition: &str) -> Result<bool, BackendError> {
        self.existence_checks.lock().push(partition.to_string());
        Ok(self.partitions.lock().contains(partition))
    }

    async fn cluster_health(&self) -> Result<ClusterHealth, BackendError> {
        Ok(ClusterHealth {
            cluster_name: "memory".to_string(),
            status: "green".to_string(),
            number_of_nodes: 1,
            number_of_data_nodes: 1,
            ..ClusterHealth::default()
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}
