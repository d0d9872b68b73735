//! External databases the value engine reads charge data from

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    Postgresql,
    Mysql,
    Sqlserver,
    Oracle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Online,
    Offline,
    Error,
}

/// Data source as listed or fetched. The password never comes back in clear.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataSource {
    pub id: i64,
    pub name: String,
    pub db_type: DbType,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub connection_params: Option<Map<String, Value>>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pool_size_min: Option<u32>,
    #[serde(default)]
    pub pool_size_max: Option<u32>,
    #[serde(default)]
    pub pool_timeout: Option<u32>,
    #[serde(default)]
    pub connection_status: Option<ConnectionStatus>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataSourceCreate {
    pub name: String,
    pub db_type: DbType,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_params: Option<Map<String, Value>>,
    pub is_default: bool,
    pub is_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub pool_size_min: u32,
    pub pool_size_max: u32,
    pub pool_timeout: u32,
}

impl DataSourceCreate {
    /// Pool bounds the server accepts: 1..=100 connections, min <= max, 1..=300 s timeout.
    pub fn pool_is_valid(&self) -> bool {
        (1..=100).contains(&self.pool_size_min)
            && (1..=100).contains(&self.pool_size_max)
            && self.pool_size_min <= self.pool_size_max
            && (1..=300).contains(&self.pool_timeout)
    }
}

/// Partial update; a `None` password keeps the stored one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataSourceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_size_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_size_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_timeout: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DataSourceQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_type: Option<DbType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PoolStatus {
    pub pool_size: u32,
    pub active_connections: u32,
    pub idle_connections: u32,
    #[serde(default)]
    pub waiting_requests: u32,
    #[serde(default)]
    pub total_connections_created: u64,
    #[serde(default)]
    pub total_connections_closed: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct EnabledFlag {
    pub is_enabled: bool,
}
