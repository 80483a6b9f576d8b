//! Query execution and output for the CLI

use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use sightline::backend::{render, SearchBackend};
use sightline::query::{CompiledRequest, DocumentKind, LogsQuery, Query, QueryCompiler};
use sightline::repository::{
    with_default_window, AnalyticsRepository, HealthCheckRepository, LogRepository,
    MonitoringRepository, RepositoryContext,
};
use sightline::Config;

/// Either talks to the backend or only prints what would be sent
pub enum Runner {
    DryRun(QueryCompiler),
    Live(RepositoryContext),
}

impl Runner {
    pub fn new(config: &Config, dry_run: bool) -> Result<Self> {
        Ok(if dry_run {
            Runner::DryRun(QueryCompiler::new(config.index.resolver()?))
        } else {
            Runner::Live(RepositoryContext::from_config(config)?)
        })
    }

    pub async fn analytics(&self, query: Query) -> Result<()> {
        match self {
            Runner::DryRun(compiler) => {
                print_request(&compiler.compile(&query, DocumentKind::Request)?)
            }
            Runner::Live(context) => {
                print_json(&AnalyticsRepository::new(context.clone()).query(&query).await?)
            }
        }
    }

    pub async fn logs(&self, query: LogsQuery) -> Result<()> {
        match self {
            Runner::DryRun(compiler) => {
                print_request(&compiler.compile(&Query::Logs(query), DocumentKind::Request)?)
            }
            Runner::Live(context) => {
                print_json(&LogRepository::new(context.clone()).query(&query).await?)
            }
        }
    }

    pub async fn log(&self, id: &str) -> Result<()> {
        match self {
            Runner::DryRun(compiler) => {
                print_request(&compiler.compile_find_by_id(id, DocumentKind::Request))
            }
            Runner::Live(context) => {
                print_json(&LogRepository::new(context.clone()).find_by_id(id).await?)
            }
        }
    }

    pub async fn health(&self, query: Query, now: i64) -> Result<()> {
        match self {
            Runner::DryRun(compiler) => print_request(
                &compiler.compile(&with_default_window(&query, now), DocumentKind::Health)?,
            ),
            Runner::Live(context) => print_json(
                &HealthCheckRepository::new(context.clone())
                    .query_at(&query, now)
                    .await?,
            ),
        }
    }

    pub async fn health_log(&self, id: &str) -> Result<()> {
        match self {
            Runner::DryRun(compiler) => {
                print_request(&compiler.compile_find_by_id(id, DocumentKind::Health))
            }
            Runner::Live(context) => {
                print_json(&HealthCheckRepository::new(context.clone()).find_by_id(id).await?)
            }
        }
    }

    pub async fn monitor(&self, gateway_id: &str) -> Result<()> {
        match self {
            Runner::DryRun(compiler) => print_request(&compiler.compile_monitoring(gateway_id)),
            Runner::Live(context) => {
                print_json(&MonitoringRepository::new(context.clone()).query(gateway_id).await?)
            }
        }
    }

    pub async fn ping(&self) -> Result<()> {
        match self {
            Runner::DryRun(_) => print_json(&json!({"method": "GET", "path": "/_cluster/health"})),
            Runner::Live(context) => {
                let backend = context.backend();
                let health = backend.cluster_health().await?;
                tracing::info!(
                    backend = backend.name(),
                    cluster = %health.cluster_name,
                    status = %health.status,
                    "Cluster reachable"
                );
                print_json(&health)
            }
        }
    }
}

fn print_request(request: &CompiledRequest) -> Result<()> {
    print_json(&json!({
        "method": "POST",
        "path": format!(
            "/{}/{}/_search?ignore_unavailable=true",
            request.partitions_path(),
            request.document_kind.type_name()
        ),
        "body": render::search_body(request),
    }))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
