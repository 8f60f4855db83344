//! Encoding/decoding between user records and Firestore documents.
//!
//! Firestore's REST API wraps every field in a typed value
//! (`{"integerValue": "42"}`, `{"stringValue": "..."}`, ...). Integers travel
//! as decimal strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use super::types::{RemoteUserRecord, StatePush, SyncError, UserIdentity};

/// Field paths written by a push, in document order.
pub const PUSH_FIELD_PATHS: [&str; 7] = [
    "todayJapa",
    "totalJapa",
    "achievements",
    "streak",
    "lastActive",
    "lastUpdated",
    "lastDevice",
];

// ============================================================================
// Typed values
// ============================================================================

pub fn string_value(s: &str) -> Value {
    json!({ "stringValue": s })
}

pub fn integer_value(n: u64) -> Value {
    json!({ "integerValue": n.to_string() })
}

pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    json!({ "timestampValue": at.to_rfc3339_opts(SecondsFormat::Millis, true) })
}

pub fn string_array_value(items: &[String]) -> Value {
    let values: Vec<Value> = items.iter().map(|s| string_value(s)).collect();
    json!({ "arrayValue": { "values": values } })
}

fn null_value() -> Value {
    json!({ "nullValue": null })
}

fn decode_string(value: &Value) -> Option<String> {
    value["stringValue"].as_str().map(str::to_string)
}

fn decode_integer(value: &Value) -> Option<u64> {
    if let Some(s) = value["integerValue"].as_str() {
        return s.parse().ok();
    }
    if let Some(n) = value["integerValue"].as_u64() {
        return Some(n);
    }
    value["doubleValue"]
        .as_f64()
        .filter(|f| *f >= 0.0)
        .map(|f| f as u64)
}

fn decode_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value["timestampValue"]
        .as_str()
        .or_else(|| value["stringValue"].as_str())?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn decode_date(value: &Value) -> Option<NaiveDate> {
    let raw = value["stringValue"].as_str()?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn decode_string_array(value: &Value) -> Vec<String> {
    value["arrayValue"]["values"]
        .as_array()
        .map(|values| values.iter().filter_map(decode_string).collect())
        .unwrap_or_default()
}

// ============================================================================
// User documents
// ============================================================================

/// Fields for a push, matching [`PUSH_FIELD_PATHS`].
pub fn encode_push_fields(push: &StatePush, now: DateTime<Utc>) -> Value {
    let mut fields = Map::new();
    fields.insert("todayJapa".into(), integer_value(push.today_japa));
    fields.insert("totalJapa".into(), integer_value(push.total_japa));
    fields.insert("achievements".into(), string_array_value(&push.achievements));
    fields.insert("streak".into(), integer_value(u64::from(push.streak)));
    fields.insert(
        "lastActive".into(),
        string_value(&push.last_active.format("%Y-%m-%d").to_string()),
    );
    fields.insert("lastUpdated".into(), timestamp_value(now));
    fields.insert(
        "lastDevice".into(),
        push.device_id
            .as_deref()
            .map(string_value)
            .unwrap_or_else(null_value),
    );
    json!({ "fields": fields })
}

/// Full document for a first sign-in.
pub fn encode_new_user(identity: &UserIdentity, push: &StatePush, now: DateTime<Utc>) -> Value {
    let mut doc = encode_push_fields(push, now);
    let name = push
        .display_name
        .clone()
        .unwrap_or_else(|| identity.leaderboard_name());
    if let Some(fields) = doc["fields"].as_object_mut() {
        fields.insert("id".into(), string_value(&identity.user_id));
        fields.insert("displayName".into(), string_value(&name));
        fields.insert("createdAt".into(), timestamp_value(now));
    }
    doc
}

/// Decode a Firestore document into a record.
///
/// The user id comes from the `id` field, falling back to the last segment
/// of the document name. Older documents carry `name` instead of
/// `displayName`.
pub fn decode_user_document(doc: &Value) -> Result<RemoteUserRecord, SyncError> {
    let fields = doc["fields"]
        .as_object()
        .ok_or_else(|| SyncError::Decode("document has no fields".into()))?;
    let field = |name: &str| fields.get(name).unwrap_or(&Value::Null);

    let user_id = decode_string(field("id"))
        .or_else(|| {
            doc["name"]
                .as_str()
                .and_then(|n| n.rsplit('/').next())
                .map(|id| urlencoding::decode(id).map(|c| c.into_owned()).unwrap_or_else(|_| id.to_string()))
        })
        .ok_or_else(|| SyncError::Decode("document has no id".into()))?;

    let display_name = decode_string(field("displayName"))
        .or_else(|| decode_string(field("name")))
        .unwrap_or_else(|| user_id.clone());

    Ok(RemoteUserRecord {
        user_id,
        display_name,
        today_japa: decode_integer(field("todayJapa")).unwrap_or(0),
        total_japa: decode_integer(field("totalJapa")).unwrap_or(0),
        achievements: decode_string_array(field("achievements")),
        streak: decode_integer(field("streak"))
            .map(|s| u32::try_from(s).unwrap_or(u32::MAX))
            .unwrap_or(0),
        last_active: decode_date(field("lastActive")),
        created_at: decode_timestamp(field("createdAt")),
        last_updated: decode_timestamp(field("lastUpdated")),
        last_device: decode_string(field("lastDevice")),
    })
}

/// Decode a `documents:runQuery` response. Entries without a document
/// (the trailing read-time marker) are skipped; documents that fail to
/// decode are logged and skipped.
pub fn decode_run_query(response: &Value) -> Result<Vec<RemoteUserRecord>, SyncError> {
    let entries = response
        .as_array()
        .ok_or_else(|| SyncError::Decode("runQuery response is not an array".into()))?;
    Ok(entries
        .iter()
        .filter(|entry| entry.get("document").is_some())
        .filter_map(|entry| match decode_user_document(&entry["document"]) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable leaderboard entry");
                None
            }
        })
        .collect())
}

/// Structured query listing the collection by descending total.
pub fn leaderboard_query(collection: &str) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "orderBy": [{
                "field": { "fieldPath": "totalJapa" },
                "direction": "DESCENDING"
            }]
        }
    })
}
