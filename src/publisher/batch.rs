use crate::sink::{MAX_BYTES_PER_BATCH, MAX_RECORDS_PER_BATCH};
use serde::{Deserialize, Serialize};

/// Per-batch limits for a single delivery stream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLimits {
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_max_records() -> usize {
    MAX_RECORDS_PER_BATCH
}

fn default_max_bytes() -> usize {
    MAX_BYTES_PER_BATCH
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
            max_bytes: default_max_bytes(),
        }
    }
}

/// Greedy accumulate-then-flush batch packer.
///
/// Records are admitted in order. A record that would push the running batch
/// past either limit closes the batch first. An empty batch always admits the
/// next record, so a record larger than `max_bytes` travels alone.
pub struct BatchBuilder {
    limits: BatchLimits,
    current: Vec<Vec<u8>>,
    current_bytes: usize,
}

impl BatchBuilder {
    pub fn new(limits: BatchLimits) -> Self {
        Self {
            limits,
            current: Vec::new(),
            current_bytes: 0,
        }
    }

    /// Add a record, returning the previous batch if it had to be closed.
    pub fn push(&mut self, record: Vec<u8>) -> Option<Vec<Vec<u8>>> {
        let closed = if self.is_full_for(record.len()) {
            Some(self.take())
        } else {
            None
        };

        self.current_bytes += record.len();
        self.current.push(record);

        closed
    }

    /// Close the in-progress batch, if any.
    pub fn finish(mut self) -> Option<Vec<Vec<u8>>> {
        if self.current.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    fn is_full_for(&self, next_len: usize) -> bool {
        !self.current.is_empty()
            && (self.current.len() >= self.limits.max_records
                || self.current_bytes + next_len > self.limits.max_bytes)
    }

    fn take(&mut self) -> Vec<Vec<u8>> {
        self.current_bytes = 0;
        std::mem::take(&mut self.current)
    }
}

/// Split encoded records into batches that respect `limits`, preserving order.
pub fn pack_batches(records: Vec<Vec<u8>>, limits: BatchLimits) -> Vec<Vec<Vec<u8>>> {
    let mut builder = BatchBuilder::new(limits);
    let mut batches = Vec::new();

    for record in records {
        if let Some(batch) = builder.push(record) {
            batches.push(batch);
        }
    }
    batches.extend(builder.finish());

    batches
}
