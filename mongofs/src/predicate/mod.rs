// Query predicate builder - speculative multi-type matching of a path segment

use crate::path::QuerySpec;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// A `field == value` filter where `value` is every typed reading of the
/// text that parses. Text `"1"` therefore matches a stored int32 `1`, int64
/// `1`, double `1.0` and string `"1"` alike.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    field: String,
    candidates: Vec<Bson>,
}

impl Predicate {
    /// Collect candidate values in a fixed order: double, string, ObjectId,
    /// boolean, date, null, int32, int64.
    pub fn build(field: &str, text: &str) -> Self {
        let mut candidates = Vec::new();

        if let Ok(number) = text.parse::<f64>() {
            candidates.push(Bson::Double(number));
        }

        candidates.push(Bson::String(text.to_string()));

        if let Ok(oid) = ObjectId::parse_str(text) {
            candidates.push(Bson::ObjectId(oid));
        }

        match text {
            "true" => candidates.push(Bson::Boolean(true)),
            "false" => candidates.push(Bson::Boolean(false)),
            _ => {}
        }

        if let Some(date) = parse_date(text) {
            candidates.push(Bson::DateTime(bson::DateTime::from_chrono(date)));
        }

        if text == "null" {
            candidates.push(Bson::Null);
        }

        if let Ok(number) = text.parse::<i32>() {
            candidates.push(Bson::Int32(number));
        }

        if let Ok(number) = text.parse::<i64>() {
            candidates.push(Bson::Int64(number));
        }

        Predicate {
            field: field.to_string(),
            candidates,
        }
    }

    pub fn for_query(query: &QuerySpec) -> Self {
        Self::build(&query.field, &query.value)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn candidates(&self) -> &[Bson] {
        &self.candidates
    }

    /// Filter document for the server: `{ "$or": [ { field: candidate }, ... ] }`.
    pub fn to_filter(&self) -> Document {
        let clauses: Vec<Bson> = self
            .candidates
            .iter()
            .map(|candidate| {
                let mut clause = Document::new();
                clause.insert(self.field.clone(), candidate.clone());
                Bson::Document(clause)
            })
            .collect();

        let mut filter = Document::new();
        filter.insert("$or", Bson::Array(clauses));
        filter
    }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` and `YYYY-MM-DD`; the latter two
/// are taken as UTC.
fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    let naive = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}
