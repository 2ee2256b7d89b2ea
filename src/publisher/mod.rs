pub mod batch;

use crate::sink::{DeliveryStream, SinkError};
use crate::transform::CanonicalRecord;
use thiserror::Error;
use tracing::{debug, error, info};

pub use batch::{pack_batches, BatchBuilder, BatchLimits};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("delivery stream error on batch {batch} of {total}: {source}")]
    Sink {
        batch: usize,
        total: usize,
        #[source]
        source: SinkError,
    },
}

/// Outcome of one publish cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub batches: usize,
    pub attempted: usize,
    pub accepted: usize,
    pub failed: usize,
}

/// Serialize a record as one newline-terminated JSON line.
pub fn encode_record(record: &CanonicalRecord) -> Result<Vec<u8>, serde_json::Error> {
    let mut data = serde_json::to_vec(record)?;
    data.push(b'\n');
    Ok(data)
}

/// Publish records to `stream_name` in size- and count-bounded batches.
///
/// Batches are sent one at a time, in order. Records the stream reports as
/// failed are logged and counted but do not stop later batches. A failing
/// call aborts the cycle; batches already sent are not rolled back.
pub async fn publish(
    sink: &dyn DeliveryStream,
    stream_name: &str,
    records: &[CanonicalRecord],
    limits: BatchLimits,
) -> Result<PublishSummary, PublishError> {
    debug!(records = records.len(), "Publishing log records");

    let encoded = records
        .iter()
        .map(encode_record)
        .collect::<Result<Vec<_>, _>>()?;

    let batches = pack_batches(encoded, limits);
    let total = batches.len();
    debug!(batches = total, "Prepared batches for delivery stream");

    let mut summary = PublishSummary {
        batches: total,
        attempted: records.len(),
        ..Default::default()
    };

    for (index, batch) in batches.into_iter().enumerate() {
        let batch_number = index + 1;
        let output = sink
            .put_record_batch(stream_name, batch)
            .await
            .map_err(|source| PublishError::Sink {
                batch: batch_number,
                total,
                source,
            })?;

        if output.failed_put_count > 0 {
            error!(
                stream = %stream_name,
                failed = output.failed_put_count,
                "Failed to put {} records to delivery stream",
                output.failed_put_count
            );
        }

        let accepted = output.accepted_count();
        summary.accepted += accepted;
        summary.failed += output.failed_put_count as usize;

        info!(
            stream = %stream_name,
            "[Batch {} of {}] Successfully published {} log records",
            batch_number,
            total,
            accepted
        );
    }

    Ok(summary)
}
