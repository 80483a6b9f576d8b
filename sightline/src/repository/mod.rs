//! Query entry points
//!
//! Each repository compiles a query, narrows the partitions it targets,
//! submits it through the shared [`RepositoryContext`] and decodes the
//! result into a typed response.

mod analytics;
mod healthcheck;
mod log;
mod monitoring;

pub use analytics::AnalyticsRepository;
pub use healthcheck::{with_default_window, HealthCheckRepository, DEFAULT_WINDOW_MS};
pub use log::LogRepository;
pub use monitoring::MonitoringRepository;

use crate::aggregation::SearchResponse;
use crate::backend::{HttpBackend, SearchBackend};
use crate::cache::PartitionCache;
use crate::config::Config;
use crate::error::{BackendError, Error};
use crate::query::{CompiledRequest, QueryCompiler};
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Backend, compiler and optional partition cache shared by the repositories.
///
/// Cloning is cheap; clones share the backend and the cache.
#[derive(Clone)]
pub struct RepositoryContext {
    backend: Arc<dyn SearchBackend>,
    compiler: QueryCompiler,
    cache: Option<PartitionCache>,
}

impl RepositoryContext {
    pub fn new(backend: Arc<dyn SearchBackend>, compiler: QueryCompiler) -> Self {
        Self {
            backend,
            compiler,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: PartitionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// HTTP backend, resolver and cache as configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = Arc::new(HttpBackend::from_config(&config.backend)?);
        Self::with_backend(config, backend)
    }

    /// Same as [`Self::from_config`] with a caller-provided backend
    pub fn with_backend(config: &Config, backend: Arc<dyn SearchBackend>) -> Result<Self> {
        let context = Self::new(backend, QueryCompiler::new(config.index.resolver()?));
        Ok(if config.partition_cache.enabled {
            context.with_cache(PartitionCache::new(config.partition_cache.ttl()))
        } else {
            context
        })
    }

    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.backend
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    pub fn cache(&self) -> Option<&PartitionCache> {
        self.cache.as_ref()
    }

    /// Submit a compiled request, recording metrics under `operation`
    pub async fn execute(
        &self,
        operation: &'static str,
        mut request: CompiledRequest,
    ) -> Result<SearchResponse> {
        if let Some(cache) = &self.cache {
            request.partitions = self.existing_partitions(cache, request.partitions).await;
        }

        tracing::debug!(
            operation,
            backend = self.backend.name(),
            document_kind = %request.document_kind,
            partitions = %request.partitions_path(),
            "Executing query"
        );

        let start = Instant::now();
        let outcome = self.backend.search(&request).await;
        record_duration(operation, start.elapsed());

        match outcome {
            Ok(response) => {
                record_success(operation);
                tracing::debug!(operation, total = response.total(), "Query returned");
                Ok(response)
            }
            Err(e) => {
                record_failure(operation, &e);
                tracing::error!(operation, error = %e, "Analytics query failed");
                Err(Error::query_failed(operation, e))
            }
        }
    }

    /// Keep partitions known to exist; the wildcard stands in when none do
    async fn existing_partitions(
        &self,
        cache: &PartitionCache,
        partitions: Vec<String>,
    ) -> Vec<String> {
        let mut existing = Vec::with_capacity(partitions.len());

        for partition in partitions {
            if partition.contains('*') {
                existing.push(partition);
                continue;
            }

            let exists = match cache.get(&partition) {
                Some(exists) => exists,
                None => match self.backend.partition_exists(&partition).await {
                    Ok(exists) => {
                        cache.insert(partition.clone(), exists);
                        exists
                    }
                    Err(e) => {
                        tracing::warn!(partition = %partition, error = %e, "Partition check failed, keeping it");
                        true
                    }
                },
            };

            if exists {
                existing.push(partition);
            }
        }

        if existing.is_empty() {
            existing.push(self.compiler.resolver().all_partitions());
        }
        existing
    }
}

fn record_duration(operation: &'static str, duration: Duration) {
    metrics::histogram!("sightline_query_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

fn record_success(operation: &'static str) {
    metrics::counter!("sightline_queries_total", "operation" => operation, "status" => "ok")
        .increment(1);
}

fn record_failure(operation: &'static str, error: &BackendError) {
    let error_type = match error {
        BackendError::Transport(_) => "transport",
        BackendError::Status { .. } => "status",
        BackendError::MalformedResponse(_) => "malformed_response",
        BackendError::NoEndpoint => "no_endpoint",
        BackendError::Other(_) => "other",
    };

    metrics::counter!("sightline_queries_total", "operation" => operation, "status" => "error")
        .increment(1);
    metrics::counter!(
        "sightline_query_failures_total",
        "operation" => operation,
        "error_type" => error_type,
    )
    .increment(1);
}
