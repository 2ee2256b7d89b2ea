use crate::push::{Labels, PushRecord, StreamBlock, StreamEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// A normalized log line, ready to be encoded for the delivery stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    /// Entry time at millisecond resolution
    #[serde(with = "millis_format")]
    pub timestamp: DateTime<Utc>,

    /// Parsed JSON line, or the raw line wrapped as `{"message": ...}`
    #[serde(rename = "record")]
    pub payload: Payload,

    /// Labels of the stream the entry came from
    #[serde(rename = "stream")]
    pub labels: Labels,

    pub metadata: Labels,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Object(Map<String, Value>),
    Array(Vec<Value>),
    Message { message: String },
}

impl Payload {
    /// Resolve a log line into a payload.
    ///
    /// Only lines starting with `{` or `[` are tried as JSON. A line that
    /// looks like JSON but fails to parse is kept as a plain message.
    pub fn from_line(line: &str) -> Self {
        if line.starts_with('{') {
            match serde_json::from_str::<Map<String, Value>>(line) {
                Ok(object) => return Payload::Object(object),
                Err(e) => tracing::warn!(error = %e, "Failed to parse JSON from log line"),
            }
        } else if line.starts_with('[') {
            match serde_json::from_str::<Vec<Value>>(line) {
                Ok(array) => return Payload::Array(array),
                Err(e) => tracing::warn!(error = %e, "Failed to parse JSON from log line"),
            }
        }

        Payload::Message {
            message: line.to_string(),
        }
    }
}

impl CanonicalRecord {
    fn from_entry(block: &StreamBlock, entry: &StreamEntry) -> Self {
        Self {
            timestamp: millis_to_datetime(entry.timestamp_millis()),
            payload: Payload::from_line(&entry.line),
            labels: block.labels.clone(),
            metadata: entry.metadata.clone().unwrap_or_default(),
        }
    }
}

/// Flatten a push request into canonical records.
///
/// Output order is stream order, then entry order within each stream. Batch
/// packing relies on this being deterministic for a given input.
pub fn transform(push: &PushRecord) -> Vec<CanonicalRecord> {
    push.streams
        .iter()
        .flat_map(|block| {
            block
                .entries
                .iter()
                .map(move |entry| CanonicalRecord::from_entry(block, entry))
        })
        .collect()
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    // i64 nanoseconds divided down to millis is always within chrono's range
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}

// RFC 3339 with exactly three fractional digits and a `Z` suffix
mod millis_format {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::Serializer;

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}
