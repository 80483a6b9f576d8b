//! Health-check documents
//!
//! Steps come in two shapes: the current one nests `request`/`response`
//! objects, older documents carry `url` (or `uri`), `method` and `status`
//! directly on the step. [`STEP_SHAPES`] lists the decoders in the order they are tried.

use super::{deserialize_timestamp, HttpMethod, HttpRequestSnapshot, HttpResponseSnapshot};
use crate::aggregation::SearchHit;
use crate::error::Error;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthLog {
    pub id: String,
    pub timestamp: i64,
    pub gateway: Option<String>,
    pub endpoint: Option<String>,
    pub response_time: i64,
    pub available: bool,
    pub state: i64,
    pub success: bool,
    /// Taken from the first step
    pub uri: Option<String>,
    pub method: Option<HttpMethod>,
    pub status: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStep {
    pub success: bool,
    pub message: Option<String>,
    pub request: HttpRequestSnapshot,
    pub response: HttpResponseSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedHealthLog {
    pub id: String,
    pub timestamp: i64,
    pub gateway: Option<String>,
    pub endpoint: Option<String>,
    pub response_time: i64,
    pub available: bool,
    pub state: i64,
    pub success: bool,
    pub steps: Vec<HealthStep>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawHealth {
    #[serde(rename = "@timestamp", deserialize_with = "deserialize_timestamp")]
    timestamp: i64,
    #[serde(default)]
    gateway: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    response_time: i64,
    #[serde(default)]
    available: bool,
    #[serde(default)]
    state: i64,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    steps: Vec<Value>,
}

#[derive(Deserialize)]
struct LegacyStep {
    #[serde(default, alias = "url")]
    uri: Option<String>,
    #[serde(default)]
    method: Option<HttpMethod>,
    #[serde(default)]
    status: Option<u16>,
}

type StepShape = fn(&Value) -> Option<(HttpRequestSnapshot, HttpResponseSnapshot)>;

const STEP_SHAPES: [StepShape; 2] = [nested_step, flat_step];

fn nested_step(step: &Value) -> Option<(HttpRequestSnapshot, HttpResponseSnapshot)> {
    let request = step.get("request").filter(|r| r.is_object())?;
    let request = HttpRequestSnapshot::deserialize(request).ok()?;
    let response = match step.get("response").filter(|r| r.is_object()) {
        Some(raw) => HttpResponseSnapshot::deserialize(raw).ok()?,
        None => HttpResponseSnapshot::default(),
    };
    Some((request, response))
}

fn flat_step(step: &Value) -> Option<(HttpRequestSnapshot, HttpResponseSnapshot)> {
    let legacy = LegacyStep::deserialize(step).ok()?;
    Some((
        HttpRequestSnapshot {
            uri: legacy.uri,
            method: legacy.method,
            ..Default::default()
        },
        HttpResponseSnapshot {
            status: legacy.status,
            ..Default::default()
        },
    ))
}

fn step_exchange(step: &Value) -> (HttpRequestSnapshot, HttpResponseSnapshot) {
    STEP_SHAPES
        .iter()
        .find_map(|shape| shape(step))
        .unwrap_or_default()
}

fn decode_step(step: &Value) -> HealthStep {
    let (request, response) = step_exchange(step);
    HealthStep {
        success: step.get("success").and_then(Value::as_bool).unwrap_or(false),
        message: step
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        request,
        response,
    }
}

fn raw(hit: &SearchHit) -> Result<(String, RawHealth)> {
    let id = hit
        .id
        .clone()
        .ok_or_else(|| Error::Decode("health-check hit without _id".to_string()))?;
    let raw = RawHealth::deserialize(&hit.source)
        .map_err(|e| Error::Decode(format!("health-check log {}: {}", id, e)))?;
    Ok((id, raw))
}

pub(super) fn summary(hit: &SearchHit) -> Result<HealthLog> {
    let (id, raw) = raw(hit)?;
    let (request, response) = raw
        .steps
        .first()
        .map(step_exchange)
        .unwrap_or_default();

    Ok(HealthLog {
        id,
        timestamp: raw.timestamp,
        gateway: raw.gateway,
        endpoint: raw.endpoint,
        response_time: raw.response_time,
        available: raw.available,
        state: raw.state,
        success: raw.success,
        uri: request.uri,
        method: request.method,
        status: response.status,
    })
}

pub(super) fn extended(hit: &SearchHit) -> Result<ExtendedHealthLog> {
    let (id, raw) = raw(hit)?;
    Ok(ExtendedHealthLog {
        id,
        timestamp: raw.timestamp,
        gateway: raw.gateway,
        endpoint: raw.endpoint,
        response_time: raw.response_time,
        available: raw.available,
        state: raw.state,
        success: raw.success,
        steps: raw.steps.iter().map(decode_step).collect(),
    })
}
