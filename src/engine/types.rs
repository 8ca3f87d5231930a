//! Shared data types for the dbchat backend
//!
//! These types cross the command bridge and the `database-connection` event
//! channel, so their serde shape is what the webview sees.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Handle for a live backend session (one connection pool / client)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|e| format!("Invalid session ID: {}", e))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbType {
    #[serde(rename = "postgres", alias = "postgresql", alias = "PostgreSQL")]
    Postgres,
    #[serde(
        rename = "mysql",
        alias = "MySQL",
        alias = "mariadb",
        alias = "MariaDB"
    )]
    MySql,
    #[serde(rename = "mongodb", alias = "MongoDB")]
    MongoDb,
}

impl DbType {
    /// Key of the driver serving this engine in the `DriverRegistry`
    pub fn driver_id(&self) -> &'static str {
        match self {
            DbType::Postgres => "postgres",
            DbType::MySql => "mysql",
            DbType::MongoDb => "mongodb",
        }
    }
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.driver_id())
    }
}

/// Parameters collected by the connection form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub database: String,
    pub db_type: DbType,
    #[serde(default)]
    pub connection_name: Option<String>,
}

impl ConnectionConfig {
    /// Name shown on the connection tab
    pub fn display_name(&self) -> String {
        match self.connection_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database),
        }
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            name: self.display_name(),
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            username: self.user.clone(),
        }
    }
}

/// Display and identity metadata for an established connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionInfo {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
}

/// Column metadata as reported by `get_table_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    #[serde(default = "default_true")]
    pub is_nullable: bool,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

/// One relation in a schema snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub table_type: String,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

/// One callable in a schema snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub return_type: String,
    pub arguments: String,
}

/// Bulk metadata sent with a successful connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub schema: String,
    #[serde(default)]
    pub tables: Vec<TableSummary>,
    #[serde(default)]
    pub functions: Vec<FunctionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionInfo>,
}

/// A result row keyed by column name
pub type RowObject = serde_json::Map<String, serde_json::Value>;

/// Page of table data returned by `get_table_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<RowObject>,
    pub total_rows: i64,
}

/// Column of an ad-hoc query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultColumn {
    pub name: String,
    pub data_type: String,
}

/// Query execution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<RowObject>,
    /// Number of affected rows (for INSERT/UPDATE/DELETE)
    pub affected_rows: Option<u64>,
    pub execution_time_ms: f64,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: None,
            execution_time_ms: 0.0,
        }
    }

    pub fn with_affected_rows(affected: u64, time_ms: f64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: Some(affected),
            execution_time_ms: time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_type_accepts_form_labels() {
        let parsed: Vec<DbType> =
            serde_json::from_str(r#"["PostgreSQL", "postgres", "MariaDB", "MongoDB"]"#)
                .expect("should parse");
        assert_eq!(
            parsed,
            vec![DbType::Postgres, DbType::Postgres, DbType::MySql, DbType::MongoDb]
        );
        assert_eq!(serde_json::to_string(&DbType::MySql).unwrap(), "\"mysql\"");
    }

    #[test]
    fn password_is_never_serialized() {
        let config = ConnectionConfig {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "hunter2".to_string(),
            database: "app".to_string(),
            db_type: DbType::Postgres,
            connection_name: None,
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
        assert_eq!(config.display_name(), "postgres@localhost:5432/app");
    }

    #[test]
    fn snapshot_parses_minimal_payload() {
        let json = r#"{
            "schema": "public",
            "tables": [{"name": "users", "type": "table"}],
            "functions": [{"name": "now_utc", "return_type": "timestamp", "arguments": ""}]
        }"#;
        let snapshot: SchemaSnapshot = serde_json::from_str(json).expect("should parse");

        assert_eq!(snapshot.schema, "public");
        assert_eq!(snapshot.tables[0].table_type, "table");
        assert!(snapshot.tables[0].columns.is_empty());
        assert!(snapshot.connection.is_none());
    }
}
