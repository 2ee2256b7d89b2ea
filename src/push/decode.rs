use super::PushRecord;
use flate2::read::MultiGzDecoder;
use serde_json::Value;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported content encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("failed to decompress request body: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("decompressed request body exceeds {0} bytes")]
    TooLarge(usize),

    #[error("failed to parse request body as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid push request: {0}")]
    Validation(String),
}

impl DecodeError {
    /// Whether the body parsed as JSON but had the wrong shape.
    pub fn is_validation(&self) -> bool {
        matches!(self, DecodeError::Validation(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentEncoding {
    Identity,
    Gzip,
}

impl ContentEncoding {
    fn from_header(value: Option<&str>) -> Result<Self, DecodeError> {
        let value = match value.map(str::trim) {
            None | Some("") => return Ok(ContentEncoding::Identity),
            Some(v) => v,
        };

        if value.eq_ignore_ascii_case("identity") {
            Ok(ContentEncoding::Identity)
        } else if value.eq_ignore_ascii_case("gzip") || value.eq_ignore_ascii_case("x-gzip") {
            Ok(ContentEncoding::Gzip)
        } else {
            Err(DecodeError::UnsupportedEncoding(value.to_string()))
        }
    }
}

/// Decode a raw push body into a `PushRecord`.
///
/// Gzip bodies are decompressed first, up to `max_decompressed_bytes`. The
/// JSON root must carry a `streams` array; anything else is reported as
/// `DecodeError::Validation`.
pub fn decode_push_request(
    body: &[u8],
    content_encoding: Option<&str>,
    max_decompressed_bytes: usize,
) -> Result<PushRecord, DecodeError> {
    let value: Value = match ContentEncoding::from_header(content_encoding)? {
        ContentEncoding::Identity => serde_json::from_slice(body)?,
        ContentEncoding::Gzip => {
            tracing::debug!(compressed_bytes = body.len(), "Decompressing gzip body");
            let decompressed = gunzip(body, max_decompressed_bytes)?;
            serde_json::from_slice(&decompressed)?
        }
    };

    match value.get("streams") {
        Some(Value::Array(_)) => {}
        Some(_) => {
            return Err(DecodeError::Validation(
                "'streams' must be an array".to_string(),
            ))
        }
        None => return Err(DecodeError::Validation("missing 'streams'".to_string())),
    }

    serde_json::from_value(value).map_err(|e| DecodeError::Validation(e.to_string()))
}

// Reads one byte past the limit so an exactly-full body is still accepted
fn gunzip(body: &[u8], limit: usize) -> Result<Vec<u8>, DecodeError> {
    let mut decompressed = Vec::new();
    MultiGzDecoder::new(body)
        .take(limit as u64 + 1)
        .read_to_end(&mut decompressed)
        .map_err(DecodeError::Decompress)?;

    if decompressed.len() > limit {
        return Err(DecodeError::TooLarge(limit));
    }
    Ok(decompressed)
}
