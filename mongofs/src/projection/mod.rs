//! Document projection: the bytes a document file exposes.
//!
//! JSON output is relaxed Extended JSON, pretty-printed with a four-space
//! indent and keys in stored order. BSON output is the canonical binary
//! encoding. File sizes are always the length of these exact buffers, so
//! callers must measure by encoding, never by estimating.

use crate::error::Result;
use crate::path::DocumentEncoding;
use bson::{Bson, Document};
use chrono::{DateTime, Utc};
use serde::Serialize;

const JSON_INDENT: &[u8] = b"    ";

/// Relaxed Extended JSON view of a document.
pub fn to_json_value(document: &Document) -> serde_json::Value {
    Bson::Document(document.clone()).into_relaxed_extjson()
}

/// Pretty-print any serializable value with the projection's fixed indent.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

pub fn encode_bson(document: &Document) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    document.to_writer(&mut buf)?;
    Ok(buf)
}

/// Encode a single document in the requested encoding.
pub fn encode_document(document: &Document, encoding: DocumentEncoding) -> Result<Vec<u8>> {
    match encoding {
        DocumentEncoding::Json => encode_json(&to_json_value(document)),
        DocumentEncoding::Bson => encode_bson(document),
    }
}

/// Encode a set of documents as one JSON array. There is no BSON form.
pub fn encode_documents(documents: &[Document]) -> Result<Vec<u8>> {
    let values: Vec<serde_json::Value> = documents.iter().map(to_json_value).collect();
    encode_json(&values)
}

/// Creation time embedded in an ObjectId `_id`, if the document has one.
pub fn created_at(document: &Document) -> Option<DateTime<Utc>> {
    match document.get("_id") {
        Some(Bson::ObjectId(oid)) => Some(oid.timestamp().to_chrono()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use bson::oid::ObjectId;
    use pretty_assertions::assert_eq;

    fn sample() -> Document {
        doc! {
            "_id": ObjectId::new(),
            "name": "Widget",
            "qty": 3,
            "price": 2.5,
            "active": true,
            "tags": ["a", "b"],
            "dims": { "w": 10, "h": 20 },
        }
    }

    #[test]
    fn test_json_uses_four_space_indent() {
        let bytes = encode_document(&doc! { "a": 1 }, DocumentEncoding::Json).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "{\n    \"a\": 1\n}");
    }

    #[test]
    fn test_json_keeps_stored_key_order() {
        let bytes = encode_document(&doc! { "z": 1, "a": 2, "m": 3 }, DocumentEncoding::Json)
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let z = text.find("\"z\"").unwrap();
        let a = text.find("\"a\"").unwrap();
        let m = text.find("\"m\"").unwrap();
        assert!(z < a && a < m);
    }

    #[test]
    fn test_json_decodes_to_same_document() {
        let document = sample();
        let bytes = encode_document(&document, DocumentEncoding::Json).unwrap();

        let decoded: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, to_json_value(&document));

        let back = Bson::try_from(decoded).unwrap();
        assert_eq!(back, Bson::Document(document));
    }

    #[test]
    fn test_bson_decodes_to_same_document() {
        let document = sample();
        let bytes = encode_document(&document, DocumentEncoding::Bson).unwrap();
        let decoded = Document::from_reader(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, document);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let document = sample();
        for encoding in [DocumentEncoding::Json, DocumentEncoding::Bson] {
            let first = encode_document(&document, encoding).unwrap();
            let second = encode_document(&document, encoding).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_documents_encode_as_json_array() {
        let docs = vec![doc! { "_id": 1 }, doc! { "_id": 2 }];
        let bytes = encode_documents(&docs).unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, serde_json::json!([{ "_id": 1 }, { "_id": 2 }]));

        let empty = encode_documents(&[]).unwrap();
        assert_eq!(empty, b"[]");
    }

    #[test]
    fn test_created_at_from_object_id() {
        let oid = ObjectId::new();
        let document = doc! { "_id": oid };
        assert_eq!(created_at(&document), Some(oid.timestamp().to_chrono()));

        assert_eq!(created_at(&doc! { "_id": "abc" }), None);
        assert_eq!(created_at(&doc! { "name": "no id" }), None);
    }
}
