//! Search backend contract and its bindings
//!
//! The compiler and the decoders never see which binding is active; both
//! receive a [`CompiledRequest`] and hand back a [`SearchResponse`].

mod http;
mod memory;
pub mod render;

pub use http::HttpBackend;
pub use memory::MemoryBackend;

use crate::aggregation::SearchResponse;
use crate::error::BackendError;
use crate::query::CompiledRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run one compiled search
    async fn search(&self, request: &CompiledRequest) -> Result<SearchResponse, BackendError>;

    /// Whether a partition exists
    async fn partition_exists(&self, partition: &str) -> Result<bool, BackendError>;

    async fn cluster_health(&self) -> Result<ClusterHealth, BackendError>;

    /// Binding name for logs
    fn name(&self) -> &str;
}

/// Subset of `GET /_cluster/health`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterHealth {
    #[serde(default)]
    pub cluster_name: String,
    /// `green`, `yellow` or `red`
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub number_of_nodes: u64,
    #[serde(default)]
    pub number_of_data_nodes: u64,
    #[serde(default)]
    pub active_shards: u64,
    #[serde(default)]
    pub unassigned_shards: u64,
}
