pub mod api;
pub mod middleware;
pub mod router;

use crate::auth::ExpectedCredentials;
use crate::publisher::BatchLimits;
use crate::sink::DeliveryStream;
use std::sync::Arc;

pub use router::{build_router, start_server};

/// Shared, read-only state for the ingestion endpoints
pub struct IngestState {
    pub sink: Arc<dyn DeliveryStream>,
    pub stream_name: String,
    pub credentials: ExpectedCredentials,
    pub limits: BatchLimits,
    pub max_body_bytes: usize,
    pub max_decompressed_bytes: usize,
}
