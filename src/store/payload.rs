//! Payload schema for corpus chunks stored in Qdrant

use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{PointStruct, Value as QdrantValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// A point ready to be upserted to Qdrant
#[derive(Debug, Clone)]
pub struct ChunkPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl ChunkPoint {
    /// Convert to qdrant-client PointStruct
    pub fn to_point_struct(self) -> PointStruct {
        PointStruct::new(
            self.id.to_string(),
            self.vector,
            self.payload.to_qdrant_payload(),
        )
    }
}

/// Payload stored with each chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkPayload {
    /// Stable id of the source document (hash of its URI)
    pub doc_id: String,

    /// Where the document was imported from
    pub doc_uri: String,

    /// File name or page title shown to users
    pub display_name: String,

    /// Chunk index within the document
    pub chunk_index: i64,

    /// Hash of the chunk content
    pub chunk_hash: String,

    /// Chunk text returned by retrieval
    pub text: String,

    /// When the document was imported (RFC 3339)
    pub imported_at: String,
}

impl ChunkPayload {
    /// Convert to Qdrant payload format
    pub fn to_qdrant_payload(self) -> HashMap<String, QdrantValue> {
        HashMap::from([
            ("doc_id".to_string(), string_to_qdrant(self.doc_id)),
            ("doc_uri".to_string(), string_to_qdrant(self.doc_uri)),
            ("display_name".to_string(), string_to_qdrant(self.display_name)),
            ("chunk_index".to_string(), int_to_qdrant(self.chunk_index)),
            ("chunk_hash".to_string(), string_to_qdrant(self.chunk_hash)),
            ("text".to_string(), string_to_qdrant(self.text)),
            ("imported_at".to_string(), string_to_qdrant(self.imported_at)),
        ])
    }

    /// Rebuild a payload from what Qdrant returns; missing fields stay empty
    pub fn from_qdrant_payload(payload: HashMap<String, QdrantValue>) -> Self {
        payload
            .into_iter()
            .map(|(k, v)| (k, json_from_qdrant_value(v)))
            .collect::<Map<String, Value>>()
            .into()
    }
}

impl From<Map<String, Value>> for ChunkPayload {
    fn from(map: Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(map)).unwrap_or_default()
    }
}

fn string_to_qdrant(s: String) -> QdrantValue {
    QdrantValue {
        kind: Some(Kind::StringValue(s)),
    }
}

fn int_to_qdrant(i: i64) -> QdrantValue {
    QdrantValue {
        kind: Some(Kind::IntegerValue(i)),
    }
}

/// Convert Qdrant value to serde_json Value
pub fn json_from_qdrant_value(v: QdrantValue) -> Value {
    match v.kind {
        Some(Kind::NullValue(_)) | None => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(
            list.values
                .into_iter()
                .map(json_from_qdrant_value)
                .collect(),
        ),
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, json_from_qdrant_value(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> ChunkPayload {
        ChunkPayload {
            doc_id: "doc-456".to_string(),
            doc_uri: "/docs/chapter01.txt".to_string(),
            display_name: "chapter01.txt".to_string(),
            chunk_index: 2,
            chunk_hash: "hash123".to_string(),
            text: "0102 Live bovine animals".to_string(),
            imported_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_payload_survives_qdrant_conversion() {
        let original = payload();
        let restored = ChunkPayload::from_qdrant_payload(original.clone().to_qdrant_payload());
        assert_eq!(restored, original);
    }

    #[test]
    fn test_partial_payload_defaults() {
        let mut map = Map::new();
        map.insert("doc_id".to_string(), Value::String("d".to_string()));
        let parsed: ChunkPayload = map.into();
        assert_eq!(parsed.doc_id, "d");
        assert_eq!(parsed.chunk_index, 0);
        assert!(parsed.text.is_empty());
    }
}
