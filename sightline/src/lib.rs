//! Sightline: typed analytics over date-partitioned Elasticsearch indices
//!
//! This crate turns abstract, time-scoped queries into Elasticsearch search
//! requests and turns the nested aggregation trees that come back into
//! typed responses.
//!
//! # Pipeline
//!
//! - [`index::IndexResolver`] maps a time range to daily partitions
//!   (`<prefix>-yyyy.mm.dd`)
//! - [`query::QueryCompiler`] builds a [`query::CompiledRequest`]
//! - a [`backend::SearchBackend`] submits it (HTTP or in-memory)
//! - [`aggregation::AggregationDecoder`] and the [`response`] builders
//!   produce the typed result
//! - [`document::DocumentMapper`] decodes individual hits
//!
//! # Query archetypes
//!
//! - `count`
//! - `group_by` (terms or numeric ranges, optional avg ordering)
//! - `date_histogram` (`by_<field>`, `min_`/`max_`/`avg_<field>` series)
//! - `availability` / `average_response_time` (health checks)
//! - `logs` (paginated, newest first)

pub mod aggregation;
pub mod backend;
pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod query;
pub mod repository;
pub mod response;

pub use config::Config;
pub use error::{BackendError, Error};

/// Result type for sightline operations
pub type Result<T> = std::result::Result<T, Error>;
