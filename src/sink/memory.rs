use super::{
    DeliveryStream, PutRecordBatchOutput, PutRecordBatchResponseEntry, SinkError,
    StreamDescription, StreamStatus,
};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

/// In-process delivery stream that keeps every batch it receives.
///
/// Used for local runs and tests. Status, per-record failures and call
/// failures can be injected.
#[derive(Debug, Default)]
pub struct MemoryDeliveryStream {
    inner: Mutex<MemoryState>,
}

#[derive(Debug)]
struct MemoryState {
    status: Option<StreamStatus>,
    batches: Vec<Vec<Vec<u8>>>,
    pending_record_failures: usize,
    put_error: Option<String>,
    next_record_id: u64,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            status: Some(StreamStatus::Active),
            batches: Vec::new(),
            pending_record_failures: 0,
            put_error: None,
            next_record_id: 0,
        }
    }
}

impl MemoryDeliveryStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `status` from `describe_stream`; `None` behaves like a missing stream.
    pub fn set_status(&self, status: Option<StreamStatus>) {
        self.state().status = status;
    }

    /// Reject the next `count` records put to the stream.
    pub fn fail_next_records(&self, count: usize) {
        self.state().pending_record_failures = count;
    }

    /// Make every `put_record_batch` call fail with a service error.
    pub fn fail_puts(&self, message: Option<&str>) {
        self.state().put_error = message.map(str::to_string);
    }

    /// Batches received so far, in call order
    pub fn batches(&self) -> Vec<Vec<Vec<u8>>> {
        self.state().batches.clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state().batches.iter().map(Vec::len).collect()
    }

    pub fn record_count(&self) -> usize {
        self.state().batches.iter().map(Vec::len).sum()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DeliveryStream for MemoryDeliveryStream {
    async fn describe_stream(&self, stream_name: &str) -> Result<StreamDescription, SinkError> {
        match &self.state().status {
            Some(status) => Ok(StreamDescription {
                name: stream_name.to_string(),
                status: status.clone(),
            }),
            None => Err(SinkError::StreamNotFound(stream_name.to_string())),
        }
    }

    async fn put_record_batch(
        &self,
        stream_name: &str,
        records: Vec<Vec<u8>>,
    ) -> Result<PutRecordBatchOutput, SinkError> {
        let mut state = self.state();

        if let Some(message) = &state.put_error {
            return Err(SinkError::Service {
                status: 500,
                message: format!("{}: {}", stream_name, message),
            });
        }

        let mut output = PutRecordBatchOutput::default();
        for _ in &records {
            if state.pending_record_failures > 0 {
                state.pending_record_failures -= 1;
                output.failed_put_count += 1;
                output.request_responses.push(PutRecordBatchResponseEntry {
                    record_id: None,
                    error_code: Some("ServiceUnavailableException".to_string()),
                    error_message: Some("injected failure".to_string()),
                });
            } else {
                state.next_record_id += 1;
                output.request_responses.push(PutRecordBatchResponseEntry {
                    record_id: Some(state.next_record_id.to_string()),
                    ..Default::default()
                });
            }
        }

        state.batches.push(records);
        Ok(output)
    }
}
