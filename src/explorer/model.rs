//! Connection records and the schema tree the explorer renders

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::events::ConnectionEvent;
use crate::engine::types::{
    ColumnInfo, ConnectionInfo, FunctionInfo, RowObject, SchemaSnapshot, SessionId, TableSummary,
};

/// Registry key for one established connection, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|e| format!("Invalid connection ID: {}", e))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnNode {
    pub name: String,
    pub data_type: String,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
}

impl From<ColumnInfo> for ColumnNode {
    fn from(column: ColumnInfo) -> Self {
        Self {
            name: column.name,
            data_type: column.data_type,
            is_primary_key: column.is_primary_key,
            is_foreign_key: column.is_foreign_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableNode {
    pub name: String,
    #[serde(rename = "type")]
    pub table_type: String,
    pub columns: Vec<ColumnNode>,
    /// Populated only after an explicit data fetch
    pub rows: Option<Vec<RowObject>>,
    pub total_rows: Option<i64>,
}

impl From<TableSummary> for TableNode {
    fn from(table: TableSummary) -> Self {
        Self {
            name: table.name,
            table_type: table.table_type,
            columns: table.columns.into_iter().map(ColumnNode::from).collect(),
            rows: None,
            total_rows: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionNode {
    pub name: String,
    pub return_type: String,
    pub arguments: String,
}

impl From<FunctionInfo> for FunctionNode {
    fn from(function: FunctionInfo) -> Self {
        Self {
            name: function.name,
            return_type: function.return_type,
            arguments: function.arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    pub name: String,
    pub tables: Vec<TableNode>,
    pub functions: Vec<FunctionNode>,
}

impl From<SchemaSnapshot> for SchemaNode {
    fn from(snapshot: SchemaSnapshot) -> Self {
        Self {
            name: snapshot.schema,
            tables: snapshot.tables.into_iter().map(TableNode::from).collect(),
            functions: snapshot
                .functions
                .into_iter()
                .map(FunctionNode::from)
                .collect(),
        }
    }
}

/// One live logical connection and its discovered schema tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    pub connection_id: ConnectionId,
    pub connection_info: ConnectionInfo,
    pub is_connected: bool,
    pub schemas: Vec<SchemaNode>,
    /// Backend session serving this record; absent for records built from
    /// events that did not carry one
    pub session_id: Option<SessionId>,
}

impl ConnectionRecord {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            connection_info: ConnectionInfo::default(),
            is_connected: true,
            schemas: Vec::new(),
            session_id: None,
        }
    }

    /// Builds a record from a success notification. Only `data[0]` is used.
    pub fn from_event(connection_id: ConnectionId, event: &ConnectionEvent) -> Self {
        let mut record = Self::new(connection_id);
        record.session_id = event.session_id;

        if let Some(snapshot) = event.snapshot() {
            if let Some(info) = &snapshot.connection {
                record.set_connection(info.clone());
            }
            record.set_schema_data(snapshot.clone());
        }
        record
    }

    pub fn set_connection(&mut self, info: ConnectionInfo) {
        self.connection_info = info;
    }

    pub fn set_schema_data(&mut self, snapshot: SchemaSnapshot) {
        self.schemas = vec![SchemaNode::from(snapshot)];
    }

    pub fn schema(&self, name: &str) -> Option<&SchemaNode> {
        self.schemas.iter().find(|s| s.name == name)
    }

    pub fn tables_by_schema(&self, schema: &str) -> &[TableNode] {
        self.schema(schema).map(|s| s.tables.as_slice()).unwrap_or(&[])
    }

    pub fn columns_by_table(&self, schema: &str, table: &str) -> &[ColumnNode] {
        self.tables_by_schema(schema)
            .iter()
            .find(|t| t.name == table)
            .map(|t| t.columns.as_slice())
            .unwrap_or(&[])
    }

    pub fn functions_by_schema(&self, schema: &str) -> &[FunctionNode] {
        self.schema(schema)
            .map(|s| s.functions.as_slice())
            .unwrap_or(&[])
    }

    pub fn disconnect(&mut self) {
        self.is_connected = false;
        self.schemas.clear();
    }

    fn table_mut(&mut self, schema: &str, table: &str) -> Option<&mut TableNode> {
        self.schemas
            .iter_mut()
            .find(|s| s.name == schema)?
            .tables
            .iter_mut()
            .find(|t| t.name == table)
    }

    /// Replaces the table's columns in place. Returns false when the table
    /// is not part of this record.
    pub fn update_table_columns(
        &mut self,
        schema: &str,
        table: &str,
        columns: Vec<ColumnNode>,
    ) -> bool {
        match self.table_mut(schema, table) {
            Some(node) => {
                node.columns = columns;
                true
            }
            None => false,
        }
    }

    pub fn update_table_data(
        &mut self,
        schema: &str,
        table: &str,
        rows: Vec<RowObject>,
        total_rows: i64,
    ) -> bool {
        match self.table_mut(schema, table) {
            Some(node) => {
                node.rows = Some(rows);
                node.total_rows = Some(total_rows);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::ConnectionEvent;

    fn snapshot() -> SchemaSnapshot {
        serde_json::from_value(serde_json::json!({
            "schema": "public",
            "tables": [
                { "name": "users", "type": "table", "columns": [] },
                { "name": "active_users", "type": "view" }
            ],
            "functions": [
                { "name": "now_utc", "return_type": "timestamp", "arguments": "" }
            ],
            "connection": {
                "name": "Local", "host": "localhost", "port": 5432,
                "database": "shop", "username": "postgres"
            }
        }))
        .expect("snapshot json")
    }

    #[test]
    fn builds_record_from_success_event() {
        let session = SessionId::new();
        let event = ConnectionEvent::success("ok", vec![snapshot()], Some(session));
        let id = ConnectionId::new();

        let record = ConnectionRecord::from_event(id, &event);

        assert_eq!(record.connection_id, id);
        assert!(record.is_connected);
        assert_eq!(record.session_id, Some(session));
        assert_eq!(record.connection_info.host, "localhost");
        assert_eq!(record.tables_by_schema("public").len(), 2);
        assert_eq!(record.tables_by_schema("public")[1].table_type, "view");
        assert_eq!(record.functions_by_schema("public")[0].name, "now_utc");
        assert!(record.tables_by_schema("missing").is_empty());
    }

    #[test]
    fn success_without_data_has_no_schemas() {
        let event = ConnectionEvent {
            data: None,
            ..ConnectionEvent::success("ok", Vec::new(), None)
        };
        let record = ConnectionRecord::from_event(ConnectionId::new(), &event);

        assert!(record.schemas.is_empty());
        assert_eq!(record.connection_info, ConnectionInfo::default());
    }

    #[test]
    fn column_backfill_targets_one_table() {
        let event = ConnectionEvent::success("ok", vec![snapshot()], None);
        let mut record = ConnectionRecord::from_event(ConnectionId::new(), &event);
        let columns = vec![ColumnNode {
            name: "id".to_string(),
            data_type: "integer".to_string(),
            is_primary_key: true,
            is_foreign_key: false,
        }];

        assert!(record.update_table_columns("public", "users", columns.clone()));
        assert_eq!(record.columns_by_table("public", "users"), columns.as_slice());
        assert!(record.columns_by_table("public", "active_users").is_empty());

        assert!(!record.update_table_columns("public", "orders", columns.clone()));
        assert!(!record.update_table_columns("sales", "users", columns));
    }

    #[test]
    fn table_data_sets_rows_and_total() {
        let event = ConnectionEvent::success("ok", vec![snapshot()], None);
        let mut record = ConnectionRecord::from_event(ConnectionId::new(), &event);
        let mut row = RowObject::new();
        row.insert("id".to_string(), serde_json::json!(7));

        assert!(record.update_table_data("public", "users", vec![row], 42));
        let users = &record.tables_by_schema("public")[0];
        assert_eq!(users.total_rows, Some(42));
        assert_eq!(users.rows.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn disconnect_clears_schemas() {
        let event = ConnectionEvent::success("ok", vec![snapshot()], None);
        let mut record = ConnectionRecord::from_event(ConnectionId::new(), &event);

        record.disconnect();

        assert!(!record.is_connected);
        assert!(record.schemas.is_empty());
    }

    #[test]
    fn serializes_with_webview_field_names() {
        let event = ConnectionEvent::success("ok", vec![snapshot()], None);
        let record = ConnectionRecord::from_event(ConnectionId::new(), &event);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["isConnected"], true);
        assert_eq!(json["schemas"][0]["tables"][0]["type"], "table");
        assert!(json["schemas"][0]["tables"][0]["totalRows"].is_null());
        assert_eq!(json["schemas"][0]["functions"][0]["returnType"], "timestamp");
    }
}
