//! Hit-level document decoding
//!
//! Request logs, health-check logs and gateway monitoring documents are read
//! from the `_source` of a search hit. Required fields missing from a
//! document surface as [`Error::Decode`]; optional fields are simply absent.

mod health;
mod log;
mod monitoring;

pub use health::{ExtendedHealthLog, HealthLog, HealthStep};
pub use log::{ExtendedLogRecord, LogRecord, MappedLog};
pub use monitoring::{
    CollectorStats, CpuStats, GcStats, JvmMemory, JvmStats, MemoryPool, MemoryPools,
    MonitoringResponse, OsMemory, OsStats, ProcessStats, ThreadStats,
};

use crate::aggregation::SearchHit;
use crate::error::Error;
use crate::Result;
use chrono::DateTime;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Header name to every value sent under it
pub type HttpHeaders = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
    Other,
}

impl HttpMethod {
    /// Legacy documents store the method as its ordinal
    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            0 => Self::Connect,
            1 => Self::Delete,
            2 => Self::Get,
            3 => Self::Head,
            4 => Self::Options,
            5 => Self::Patch,
            6 => Self::Post,
            7 => Self::Put,
            8 => Self::Trace,
            9 => Self::Other,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete => "DELETE",
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Trace => "TRACE",
            Self::Other => "OTHER",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "CONNECT" => Self::Connect,
            "DELETE" => Self::Delete,
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "PATCH" => Self::Patch,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "TRACE" => Self::Trace,
            "OTHER" => Self::Other,
            _ => return Err(Error::Decode(format!("unknown HTTP method '{}'", s))),
        })
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HttpMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u64),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Code(code) => HttpMethod::from_code(code)
                .ok_or_else(|| de::Error::custom(format!("unknown HTTP method code {}", code))),
            Raw::Name(name) => name.parse().map_err(de::Error::custom),
        }
    }
}

/// Request leg captured by the gateway
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpRequestSnapshot {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub method: Option<HttpMethod>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "nullable_headers")]
    pub headers: HttpHeaders,
}

/// Response leg captured by the gateway
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpResponseSnapshot {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "nullable_headers")]
    pub headers: HttpHeaders,
}

fn nullable_headers<'de, D>(deserializer: D) -> std::result::Result<HttpHeaders, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HttpHeaders>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse `yyyy-MM-dd'T'HH:mm:ss.SSSZZ` (or any RFC 3339 form) to epoch millis
pub fn parse_timestamp(raw: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| Error::Decode(format!("invalid timestamp '{}': {}", raw, e)))
}

/// Serde adapter: a textual timestamp or already-converted epoch millis
pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Millis(millis) => Ok(millis),
        Raw::Text(text) => parse_timestamp(&text).map_err(de::Error::custom),
    }
}

fn decode<T: DeserializeOwned>(what: &str, source: &Value) -> Result<T> {
    T::deserialize(source).map_err(|e| Error::Decode(format!("{}: {}", what, e)))
}

/// Decodes search hits into domain records
pub struct DocumentMapper;

impl DocumentMapper {
    /// Summary or full request log depending on `full`
    pub fn map(source: &Value, full: bool) -> Result<MappedLog> {
        if full {
            Self::extended_log(source).map(MappedLog::Full)
        } else {
            Self::log(source).map(MappedLog::Summary)
        }
    }

    pub fn log(source: &Value) -> Result<LogRecord> {
        decode("request log", source)
    }

    /// Request log with its client and proxy legs, nested or flat
    pub fn extended_log(source: &Value) -> Result<ExtendedLogRecord> {
        log::extended(source)
    }

    pub fn health_log(hit: &SearchHit) -> Result<HealthLog> {
        health::summary(hit)
    }

    pub fn extended_health_log(hit: &SearchHit) -> Result<ExtendedHealthLog> {
        health::extended(hit)
    }

    pub fn monitoring(source: &Value) -> Result<MonitoringResponse> {
        decode("monitoring document", source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_from_name_and_code() {
        let by_name: HttpMethod = serde_json::from_value(json!("post")).unwrap();
        let by_code: HttpMethod = serde_json::from_value(json!(2)).unwrap();
        assert_eq!(by_name, HttpMethod::Post);
        assert_eq!(by_code, HttpMethod::Get);
        assert!(serde_json::from_value::<HttpMethod>(json!(42)).is_err());
        assert!(serde_json::from_value::<HttpMethod>(json!("FETCH")).is_err());
    }

    #[test]
    fn test_method_serializes_uppercase() {
        assert_eq!(serde_json::to_value(HttpMethod::Delete).unwrap(), json!("DELETE"));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("2024-01-01T00:00:00.000+00:00").unwrap(),
            1_704_067_200_000
        );
        assert_eq!(
            parse_timestamp("2024-01-01T01:00:00.000+0100").unwrap(),
            1_704_067_200_000
        );
        assert!(parse_timestamp("01/01/2024").is_err());
    }

    #[test]
    fn test_null_headers_are_empty() {
        let snapshot: HttpResponseSnapshot =
            serde_json::from_value(json!({"status": 200, "headers": null})).unwrap();
        assert!(snapshot.headers.is_empty());
        assert_eq!(snapshot.status, Some(200));
    }
}
