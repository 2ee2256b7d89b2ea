pub mod decode;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

pub use decode::{decode_push_request, DecodeError};

pub type Labels = BTreeMap<String, String>;

/// A Loki push request body: one or more labelled streams.
#[derive(Debug, Clone, Deserialize)]
pub struct PushRecord {
    pub streams: Vec<StreamBlock>,
}

/// One group of entries sharing a label set.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamBlock {
    /// Labels identifying the producer (job, host, ...)
    #[serde(rename = "stream", default)]
    pub labels: Labels,

    /// Entries in the order the producer sent them
    #[serde(rename = "values", default)]
    pub entries: Vec<StreamEntry>,
}

/// A single `[timestamp, line]` or `[timestamp, line, metadata]` tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    /// Nanoseconds since the Unix epoch
    pub timestamp_nanos: i64,
    pub line: String,
    pub metadata: Option<Labels>,
}

impl StreamEntry {
    /// Millisecond timestamp, truncated toward zero.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_nanos / 1_000_000
    }
}

impl<'de> Deserialize<'de> for StreamEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(StreamEntryVisitor)
    }
}

struct StreamEntryVisitor;

impl<'de> Visitor<'de> for StreamEntryVisitor {
    type Value = StreamEntry;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of [timestamp, line] or [timestamp, line, metadata]")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<StreamEntry, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let raw_timestamp: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let line: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        let metadata = seq.next_element::<Option<Labels>>()?.flatten();

        if seq.next_element::<de::IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(4, &self));
        }

        let timestamp_nanos = raw_timestamp.trim().parse::<i64>().map_err(|_| {
            de::Error::custom(format!(
                "invalid nanosecond timestamp '{}'",
                raw_timestamp
            ))
        })?;

        Ok(StreamEntry {
            timestamp_nanos,
            line,
            metadata,
        })
    }
}
