//! Request-log documents
//!
//! Full documents keep each leg of the exchange either as a nested object
//! (`client-request`) or, in older documents, as a bare header map under
//! `<leg>-headers`. The nested object wins when both are present.

use super::{
    decode, deserialize_timestamp, HttpHeaders, HttpMethod, HttpRequestSnapshot,
    HttpResponseSnapshot,
};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Summary of one proxied request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct LogRecord {
    pub id: String,
    #[serde(rename(deserialize = "transaction"))]
    pub transaction_id: String,
    #[serde(
        rename(deserialize = "@timestamp"),
        deserialize_with = "deserialize_timestamp"
    )]
    pub timestamp: i64,
    pub uri: String,
    #[serde(default)]
    pub path: Option<String>,
    pub method: HttpMethod,
    pub endpoint: String,
    pub status: u16,
    pub response_time: i64,
    #[serde(default)]
    pub api_response_time: Option<i64>,
    #[serde(default)]
    pub request_content_length: Option<u64>,
    #[serde(default)]
    pub response_content_length: Option<u64>,
    #[serde(default)]
    pub local_address: Option<String>,
    #[serde(default)]
    pub remote_address: Option<String>,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub api: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Request log together with the client and proxy legs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedLogRecord {
    #[serde(flatten)]
    pub log: LogRecord,
    pub client_request: Option<HttpRequestSnapshot>,
    pub proxy_request: Option<HttpRequestSnapshot>,
    pub client_response: Option<HttpResponseSnapshot>,
    pub proxy_response: Option<HttpResponseSnapshot>,
}

/// A leg that can also be rebuilt from its headers alone
trait Leg: DeserializeOwned {
    fn from_headers(headers: HttpHeaders) -> Self;
}

impl Leg for HttpRequestSnapshot {
    fn from_headers(headers: HttpHeaders) -> Self {
        Self {
            headers,
            ..Default::default()
        }
    }
}

impl Leg for HttpResponseSnapshot {
    fn from_headers(headers: HttpHeaders) -> Self {
        Self {
            headers,
            ..Default::default()
        }
    }
}

fn present<'a>(source: &'a Value, key: &str) -> Option<&'a Value> {
    source.get(key).filter(|value| !value.is_null())
}

fn leg<T: Leg>(source: &Value, name: &str) -> Result<Option<T>> {
    if let Some(nested) = present(source, name) {
        return decode(name, nested).map(Some);
    }

    let flat = format!("{}-headers", name);
    match present(source, &flat) {
        Some(headers) => decode(&flat, headers).map(|headers| Some(T::from_headers(headers))),
        None => Ok(None),
    }
}

pub(super) fn extended(source: &Value) -> Result<ExtendedLogRecord> {
    Ok(ExtendedLogRecord {
        log: decode("request log", source)?,
        client_request: leg(source, "client-request")?,
        proxy_request: leg(source, "proxy-request")?,
        client_response: leg(source, "client-response")?,
        proxy_response: leg(source, "proxy-response")?,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MappedLog {
    Summary(LogRecord),
    Full(ExtendedLogRecord),
}

impl MappedLog {
    pub fn record(&self) -> &LogRecord {
        match self {
            Self::Summary(log) => log,
            Self::Full(extended) => &extended.log,
        }
    }

    pub fn into_record(self) -> LogRecord {
        match self {
            Self::Summary(log) => log,
            Self::Full(extended) => extended.log,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::document::{DocumentMapper, HttpMethod, MappedLog};
    use crate::error::Error;
    use serde_json::{json, Value};

    fn request_source() -> Value {
        json!({
            "id": "29a7e1d4-b8c5-4a10-a7e1-d4b8c57a10c2",
            "transaction": "tx-1",
            "@timestamp": "2024-01-01T10:00:00.250+00:00",
            "uri": "/echo?x=1",
            "path": "/echo",
            "method": "GET",
            "endpoint": "http://backend/echo",
            "status": 200,
            "response-time": 42,
            "api-response-time": 30,
            "request-content-length": 0,
            "response-content-length": 128,
            "local-address": "127.0.0.1",
            "remote-address": "10.0.0.1",
            "api": "api-1",
            "application": "app-1",
            "plan": "plan-1",
            "api-key": "key-1",
            "client-request": {
                "uri": "/echo?x=1",
                "method": "GET",
                "headers": {"Accept": ["application/json", "text/plain"]}
            },
            "proxy-response": {"status": 200, "body": "{}", "headers": {}}
        })
    }

    #[test]
    fn test_summary_log() {
        let log = DocumentMapper::log(&request_source()).unwrap();
        assert_eq!(log.transaction_id, "tx-1");
        assert_eq!(log.timestamp, 1_704_103_200_250);
        assert_eq!(log.method, HttpMethod::Get);
        assert_eq!(log.response_time, 42);
        assert_eq!(log.api_response_time, Some(30));
        assert_eq!(log.api_key.as_deref(), Some("key-1"));
        assert_eq!(log.tenant, None);
        assert_eq!(log.user, None);
    }

    #[test]
    fn test_full_log_keeps_legs() {
        let MappedLog::Full(log) = DocumentMapper::map(&request_source(), true).unwrap() else {
            panic!("expected a full log");
        };
        let client = log.client_request.unwrap();
        assert_eq!(
            client.headers["Accept"],
            vec!["application/json".to_string(), "text/plain".to_string()]
        );
        assert_eq!(log.proxy_response.unwrap().status, Some(200));
        assert!(log.proxy_request.is_none());
        assert!(log.client_response.is_none());
        assert_eq!(log.log.status, 200);
    }

    #[test]
    fn test_full_log_from_flat_headers() {
        let mut source = request_source();
        let fields = source.as_object_mut().unwrap();
        fields.remove("client-request");
        fields.remove("proxy-response");
        fields.insert(
            "client-request-headers".to_string(),
            json!({"Accept": ["application/json"], "X-Gravitee-Transaction-Id": ["tx-1"]}),
        );
        fields.insert(
            "proxy-response-headers".to_string(),
            json!({"Content-Type": ["text/plain"]}),
        );
        fields.insert("client-response-headers".to_string(), Value::Null);

        let log = DocumentMapper::extended_log(&source).unwrap();
        let client = log.client_request.unwrap();
        assert_eq!(client.headers["Accept"], vec!["application/json".to_string()]);
        assert_eq!(client.uri, None);
        assert_eq!(
            log.proxy_response.unwrap().headers["Content-Type"],
            vec!["text/plain".to_string()]
        );
        assert!(log.client_response.is_none());
        assert!(log.proxy_request.is_none());
    }

    #[test]
    fn test_nested_leg_wins_over_flat_headers() {
        let mut source = request_source();
        source["client-request-headers"] = json!({"Accept": ["*/*"]});

        let log = DocumentMapper::extended_log(&source).unwrap();
        let client = log.client_request.unwrap();
        assert_eq!(client.uri.as_deref(), Some("/echo?x=1"));
        assert_eq!(client.headers["Accept"].len(), 2);
    }

    #[test]
    fn test_malformed_flat_headers_is_decode_error() {
        let mut source = request_source();
        source["proxy-request-headers"] = json!("not a map");
        let err = DocumentMapper::extended_log(&source).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_legacy_numeric_method() {
        let mut source = request_source();
        source["method"] = json!(6);
        let log = DocumentMapper::log(&source).unwrap();
        assert_eq!(log.method, HttpMethod::Post);
    }

    #[test]
    fn test_missing_required_field_is_decode_error() {
        let mut source = request_source();
        source.as_object_mut().unwrap().remove("@timestamp");
        let err = DocumentMapper::log(&source).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_summary_from_map() {
        let mapped = DocumentMapper::map(&request_source(), false).unwrap();
        assert!(matches!(mapped, MappedLog::Summary(_)));
        assert_eq!(mapped.record().id, "29a7e1d4-b8c5-4a10-a7e1-d4b8c57a10c2");
    }
}
