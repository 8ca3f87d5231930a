//! MongoDB Driver
//!
//! Implements the DataEngine trait for MongoDB using the official MongoDB driver.
//! Collections are presented as tables of type `collection`; their columns are
//! inferred from sampled documents since MongoDB is schemaless.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use mongodb::Client;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::DataEngine;
use crate::engine::types::{
    ColumnInfo, ConnectionConfig, QueryResult, ResultColumn, RowObject, SchemaSnapshot, SessionId,
    TableData, TableSummary,
};

const QUERY_ROW_LIMIT: i64 = 1000;

struct MongoSession {
    client: Client,
    database: String,
}

/// Parsed form of a query typed into the editor
#[derive(Debug, PartialEq)]
struct MongoQuery {
    database: Option<String>,
    collection: String,
    filter: Document,
    limit: i64,
}

/// MongoDB driver implementation
pub struct MongoDriver {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<MongoSession>>>>,
}

impl MongoDriver {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn get_session(&self, session: SessionId) -> EngineResult<Arc<MongoSession>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session)
            .cloned()
            .ok_or_else(|| EngineError::session_not_found(session.to_string()))
    }

    /// Builds client options from config, authenticating against `admin`
    fn client_options(config: &ConnectionConfig) -> ClientOptions {
        let credential = Credential::builder()
            .username(config.user.clone())
            .password(config.password.clone())
            .source("admin".to_string())
            .build();

        ClientOptions::builder()
            .hosts(vec![ServerAddress::Tcp {
                host: config.host.clone(),
                port: Some(config.port),
            }])
            .credential(credential)
            .default_database(config.database.clone())
            .build()
    }

    fn document_to_row(doc: &Document) -> RowObject {
        doc.iter()
            .map(|(key, value)| (key.clone(), Self::bson_to_json(value)))
            .collect()
    }

    fn bson_to_json(bson: &Bson) -> JsonValue {
        match bson {
            Bson::Null => JsonValue::Null,
            Bson::Boolean(b) => JsonValue::from(*b),
            Bson::Int32(i) => JsonValue::from(*i),
            Bson::Int64(i) => JsonValue::from(*i),
            Bson::Double(f) => JsonValue::from(*f),
            Bson::String(s) => JsonValue::String(s.clone()),
            Bson::Binary(b) => JsonValue::String(STANDARD.encode(&b.bytes)),
            Bson::ObjectId(oid) => JsonValue::String(oid.to_hex()),
            Bson::DateTime(dt) => JsonValue::String(dt.to_string()),
            Bson::Array(arr) => JsonValue::Array(arr.iter().map(Self::bson_to_json).collect()),
            Bson::Document(doc) => JsonValue::Object(Self::document_to_row(doc)),
            other => other.clone().into_relaxed_extjson(),
        }
    }

    fn bson_type_name(value: &Bson) -> &'static str {
        match value {
            Bson::Null => "null",
            Bson::Boolean(_) => "boolean",
            Bson::Int32(_) => "int32",
            Bson::Int64(_) => "int64",
            Bson::Double(_) => "double",
            Bson::String(_) => "string",
            Bson::ObjectId(_) => "ObjectId",
            Bson::DateTime(_) => "datetime",
            Bson::Array(_) => "array",
            Bson::Document(_) => "document",
            Bson::Binary(_) => "binary",
            _ => "mixed",
        }
    }

    /// Infers columns from sampled documents, `_id` first, then by name
    fn infer_columns(documents: &[Document]) -> Vec<ColumnInfo> {
        let mut fields: HashMap<String, &'static str> = HashMap::new();
        for doc in documents {
            for (key, value) in doc.iter() {
                fields
                    .entry(key.clone())
                    .or_insert_with(|| Self::bson_type_name(value));
            }
        }

        let mut columns: Vec<ColumnInfo> = fields
            .into_iter()
            .map(|(name, data_type)| ColumnInfo {
                is_primary_key: name == "_id",
                name,
                data_type: data_type.to_string(),
                is_nullable: true,
                is_foreign_key: false,
                description: None,
            })
            .collect();

        columns.sort_by(|a, b| {
            b.is_primary_key
                .cmp(&a.is_primary_key)
                .then_with(|| a.name.cmp(&b.name))
        });
        columns
    }

    /// Parses `{"collection": "...", "query": {...}, "limit": n}` or a bare
    /// `collection` / `database.collection` name.
    fn parse_query(query: &str) -> EngineResult<MongoQuery> {
        let trimmed = query.trim();

        if trimmed.starts_with('{') {
            let parsed: JsonValue = serde_json::from_str(trimmed)
                .map_err(|e| EngineError::syntax_error(format!("Invalid JSON: {}", e)))?;

            let collection = parsed["collection"]
                .as_str()
                .ok_or_else(|| EngineError::syntax_error("Missing 'collection' field"))?
                .to_string();

            let filter = match parsed.get("query") {
                Some(q) => mongodb::bson::to_document(q)
                    .map_err(|e| EngineError::syntax_error(format!("Invalid query: {}", e)))?,
                None => doc! {},
            };

            return Ok(MongoQuery {
                database: parsed["database"].as_str().map(str::to_string),
                collection,
                filter,
                limit: parsed["limit"].as_i64().unwrap_or(QUERY_ROW_LIMIT),
            });
        }

        let mut parts = trimmed.splitn(2, '.');
        match (parts.next(), parts.next()) {
            (Some(db), Some(coll)) if !db.is_empty() && !coll.is_empty() => Ok(MongoQuery {
                database: Some(db.to_string()),
                collection: coll.to_string(),
                filter: doc! {},
                limit: QUERY_ROW_LIMIT,
            }),
            (Some(coll), None) if !coll.is_empty() => Ok(MongoQuery {
                database: None,
                collection: coll.to_string(),
                filter: doc! {},
                limit: QUERY_ROW_LIMIT,
            }),
            _ => Err(EngineError::syntax_error(
                "Invalid query format. Use JSON: {\"collection\": \"col\", \"query\": {...}}",
            )),
        }
    }
}

impl Default for MongoDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataEngine for MongoDriver {
    fn driver_id(&self) -> &'static str {
        "mongodb"
    }

    fn driver_name(&self) -> &'static str {
        "MongoDB"
    }

    async fn connect(&self, config: &ConnectionConfig) -> EngineResult<SessionId> {
        let options = Self::client_options(config);
        let client = Client::with_options(options)
            .map_err(|e| EngineError::connection_failed(e.to_string()))?;

        // The client connects lazily; ping to surface auth and network errors now
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("Authentication failed") {
                    EngineError::auth_failed(msg)
                } else {
                    EngineError::connection_failed(msg)
                }
            })?;

        let session_id = SessionId::new();
        let session = Arc::new(MongoSession {
            client,
            database: config.database.clone(),
        });

        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, session);

        Ok(session_id)
    }

    async fn disconnect(&self, session: SessionId) -> EngineResult<()> {
        let mut sessions = self.sessions.write().await;

        if sessions.remove(&session).is_some() {
            Ok(())
        } else {
            Err(EngineError::session_not_found(session.to_string()))
        }
    }

    async fn schema_snapshot(
        &self,
        session: SessionId,
        schema: &str,
    ) -> EngineResult<SchemaSnapshot> {
        let mongo = self.get_session(session).await?;

        let mut names = mongo
            .client
            .database(schema)
            .list_collection_names()
            .await
            .map_err(|e| EngineError::execution_error(e.to_string()))?;
        names.sort();

        Ok(SchemaSnapshot {
            schema: schema.to_string(),
            tables: names
                .into_iter()
                .map(|name| TableSummary {
                    name,
                    table_type: "collection".to_string(),
                    columns: Vec::new(),
                })
                .collect(),
            functions: Vec::new(),
            connection: None,
        })
    }

    async fn table_data(
        &self,
        session: SessionId,
        schema: &str,
        table: &str,
        limit: i64,
        offset: i64,
    ) -> EngineResult<TableData> {
        let mongo = self.get_session(session).await?;
        let collection = mongo.client.database(schema).collection::<Document>(table);

        let total_rows = collection
            .count_documents(doc! {})
            .await
            .map_err(|e| EngineError::execution_error(format!("Failed to get row count: {}", e)))?;

        if limit <= 0 {
            return Ok(TableData {
                columns: Vec::new(),
                rows: Vec::new(),
                total_rows: total_rows as i64,
            });
        }

        let documents: Vec<Document> = collection
            .find(doc! {})
            .skip(offset.max(0) as u64)
            .limit(limit)
            .await
            .map_err(|e| EngineError::execution_error(format!("Failed to get rows: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| EngineError::execution_error(format!("Failed to get rows: {}", e)))?;

        Ok(TableData {
            columns: Self::infer_columns(&documents),
            rows: documents.iter().map(Self::document_to_row).collect(),
            total_rows: total_rows as i64,
        })
    }

    async fn execute(&self, session: SessionId, query: &str) -> EngineResult<QueryResult> {
        let mongo = self.get_session(session).await?;
        let parsed = Self::parse_query(query)?;
        let start = Instant::now();

        let database = parsed.database.as_deref().unwrap_or(&mongo.database);
        let documents: Vec<Document> = mongo
            .client
            .database(database)
            .collection::<Document>(&parsed.collection)
            .find(parsed.filter)
            .limit(parsed.limit)
            .await
            .map_err(|e| EngineError::execution_error(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| EngineError::execution_error(e.to_string()))?;

        let execution_time_ms = start.elapsed().as_micros() as f64 / 1000.0;

        Ok(QueryResult {
            columns: Self::infer_columns(&documents)
                .into_iter()
                .map(|col| ResultColumn {
                    name: col.name,
                    data_type: col.data_type,
                })
                .collect(),
            rows: documents.iter().map(Self::document_to_row).collect(),
            affected_rows: None,
            execution_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_and_dotted_queries() {
        let parsed = MongoDriver::parse_query(
            r#"{"collection": "users", "query": {"active": true}, "limit": 5}"#,
        )
        .expect("json form");
        assert_eq!(parsed.collection, "users");
        assert_eq!(parsed.database, None);
        assert_eq!(parsed.filter, doc! { "active": true });
        assert_eq!(parsed.limit, 5);

        let dotted = MongoDriver::parse_query("shop.orders").expect("dotted form");
        assert_eq!(dotted.database.as_deref(), Some("shop"));
        assert_eq!(dotted.collection, "orders");

        assert!(MongoDriver::parse_query("{\"query\": {}}").is_err());
        assert!(MongoDriver::parse_query("   ").is_err());
    }

    #[test]
    fn client_options_carry_raw_credentials() {
        let config = ConnectionConfig {
            host: "mongo.internal".to_string(),
            port: 27017,
            user: "admin".to_string(),
            password: "s3cr/et#1?x=%".to_string(),
            database: "shop".to_string(),
            db_type: crate::engine::types::DbType::MongoDb,
            connection_name: None,
        };

        let options = MongoDriver::client_options(&config);
        assert_eq!(
            options.hosts,
            vec![ServerAddress::Tcp {
                host: "mongo.internal".to_string(),
                port: Some(27017),
            }]
        );
        assert_eq!(options.default_database.as_deref(), Some("shop"));

        let credential = options.credential.expect("credential");
        assert_eq!(credential.username.as_deref(), Some("admin"));
        assert_eq!(credential.password.as_deref(), Some("s3cr/et#1?x=%"));
        assert_eq!(credential.source.as_deref(), Some("admin"));
    }

    #[test]
    fn infers_columns_with_id_first() {
        let docs = vec![
            doc! { "name": "Ada", "_id": 1_i32 },
            doc! { "age": 36_i64, "name": "Grace" },
        ];

        let columns = MongoDriver::infer_columns(&docs);
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["_id", "age", "name"]);
        assert!(columns[0].is_primary_key);
        assert_eq!(columns[1].data_type, "int64");
    }

    #[test]
    fn nested_documents_become_json_objects() {
        let row = MongoDriver::document_to_row(&doc! { "address": { "city": "Paris" }, "tags": ["a"] });
        assert_eq!(row["address"], serde_json::json!({ "city": "Paris" }));
        assert_eq!(row["tags"], serde_json::json!(["a"]));
    }
}
