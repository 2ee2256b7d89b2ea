pub mod firehose;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use firehose::FirehoseClient;
pub use memory::MemoryDeliveryStream;

/// Hard limits imposed by the delivery stream on a single batch call
pub const MAX_RECORDS_PER_BATCH: usize = 500;
pub const MAX_BYTES_PER_BATCH: usize = 4 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("delivery stream returned error status {status}: {message}")]
    Service { status: u16, message: String },

    #[error("delivery stream '{0}' not found")]
    StreamNotFound(String),
}

/// A durable delivery stream that accepts batches of opaque records.
#[async_trait]
pub trait DeliveryStream: Send + Sync {
    async fn describe_stream(&self, stream_name: &str) -> Result<StreamDescription, SinkError>;

    /// Put one batch. The caller is responsible for staying within
    /// `MAX_RECORDS_PER_BATCH` and `MAX_BYTES_PER_BATCH`.
    async fn put_record_batch(
        &self,
        stream_name: &str,
        records: Vec<Vec<u8>>,
    ) -> Result<PutRecordBatchOutput, SinkError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescription {
    pub name: String,
    pub status: StreamStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Creating,
    CreatingFailed,
    Deleting,
    DeletingFailed,
    Active,
    Unknown(String),
}

impl StreamStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, StreamStatus::Active)
    }
}

impl From<&str> for StreamStatus {
    fn from(value: &str) -> Self {
        match value {
            "CREATING" => StreamStatus::Creating,
            "CREATING_FAILED" => StreamStatus::CreatingFailed,
            "DELETING" => StreamStatus::Deleting,
            "DELETING_FAILED" => StreamStatus::DeletingFailed,
            "ACTIVE" => StreamStatus::Active,
            other => StreamStatus::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamStatus::Creating => "CREATING",
            StreamStatus::CreatingFailed => "CREATING_FAILED",
            StreamStatus::Deleting => "DELETING",
            StreamStatus::DeletingFailed => "DELETING_FAILED",
            StreamStatus::Active => "ACTIVE",
            StreamStatus::Unknown(other) => other,
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRecordBatchOutput {
    #[serde(default)]
    pub failed_put_count: u32,
    #[serde(default)]
    pub request_responses: Vec<PutRecordBatchResponseEntry>,
}

impl PutRecordBatchOutput {
    /// Number of records the stream accepted (entries without an error code)
    pub fn accepted_count(&self) -> usize {
        self.request_responses
            .iter()
            .filter(|r| r.error_code.is_none())
            .count()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRecordBatchResponseEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_wire_names() {
        for name in ["CREATING", "CREATING_FAILED", "DELETING", "DELETING_FAILED", "ACTIVE"] {
            assert_eq!(StreamStatus::from(name).to_string(), name);
        }
        assert_eq!(
            StreamStatus::from("SUSPENDED"),
            StreamStatus::Unknown("SUSPENDED".to_string())
        );
        assert!(StreamStatus::from("ACTIVE").is_active());
        assert!(!StreamStatus::from("active").is_active());
    }

    #[test]
    fn test_accepted_count_skips_errors() {
        let output: PutRecordBatchOutput = serde_json::from_str(
            r#"{
                "FailedPutCount": 1,
                "RequestResponses": [
                    {"RecordId": "a"},
                    {"ErrorCode": "ServiceUnavailableException", "ErrorMessage": "slow down"},
                    {"RecordId": "c"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(output.failed_put_count, 1);
        assert_eq!(output.accepted_count(), 2);
    }
}
