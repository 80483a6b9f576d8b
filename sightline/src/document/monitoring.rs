//! Gateway monitoring documents (node stats reported by each gateway)

use super::deserialize_timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringResponse {
    #[serde(rename(deserialize = "gateway"))]
    pub gateway_id: String,
    #[serde(
        rename(deserialize = "@timestamp"),
        deserialize_with = "deserialize_timestamp"
    )]
    pub timestamp: i64,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub os: OsStats,
    #[serde(default)]
    pub process: ProcessStats,
    #[serde(default)]
    pub jvm: JvmStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsStats {
    #[serde(default)]
    pub cpu: CpuStats,
    #[serde(default)]
    pub mem: OsMemory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuStats {
    #[serde(default)]
    pub percent: i64,
    /// Keyed by window, e.g. `1m`, `5m`, `15m`
    #[serde(default)]
    pub load_average: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsMemory {
    #[serde(default)]
    pub used_in_bytes: u64,
    #[serde(default)]
    pub free_in_bytes: u64,
    #[serde(default)]
    pub total_in_bytes: u64,
    #[serde(default)]
    pub used_percent: i64,
    #[serde(default)]
    pub free_percent: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessStats {
    #[serde(default)]
    pub open_file_descriptors: i64,
    #[serde(default)]
    pub max_file_descriptors: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JvmStats {
    #[serde(default)]
    pub uptime_in_millis: u64,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub mem: JvmMemory,
    #[serde(default)]
    pub threads: ThreadStats,
    #[serde(default)]
    pub gc: GcStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JvmMemory {
    #[serde(default)]
    pub heap_used_in_bytes: u64,
    #[serde(default)]
    pub heap_used_percent: i64,
    #[serde(default)]
    pub heap_committed_in_bytes: u64,
    #[serde(default)]
    pub heap_max_in_bytes: u64,
    #[serde(default)]
    pub non_heap_used_in_bytes: u64,
    #[serde(default)]
    pub non_heap_committed_in_bytes: u64,
    #[serde(default)]
    pub pools: MemoryPools,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryPools {
    #[serde(default)]
    pub young: MemoryPool,
    #[serde(default)]
    pub old: MemoryPool,
    #[serde(default)]
    pub survivor: MemoryPool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryPool {
    #[serde(default)]
    pub used_in_bytes: u64,
    #[serde(default)]
    pub max_in_bytes: u64,
    #[serde(default)]
    pub peak_used_in_bytes: u64,
    #[serde(default)]
    pub peak_max_in_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadStats {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub peak_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GcStats {
    #[serde(default)]
    pub collectors: BTreeMap<String, CollectorStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectorStats {
    #[serde(default)]
    pub collection_count: u64,
    #[serde(default)]
    pub collection_time_in_millis: u64,
}
