use super::{DeliveryStream, PutRecordBatchOutput, SinkError, StreamDescription, StreamStatus};
use async_trait::async_trait;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const TARGET_PREFIX: &str = "Firehose_20150804";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// HTTP client for a Firehose-compatible JSON API.
///
/// Requests are sent unsigned; `endpoint` is expected to be an emulator or a
/// signing proxy in front of the real service.
#[derive(Debug, Clone)]
pub struct FirehoseClient {
    endpoint: String,
    client: reqwest::Client,
}

impl FirehoseClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<Req, Resp>(&self, action: &str, request: &Req) -> Result<Resp, SinkError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(request)?;
        let response = self
            .client
            .post(format!("{}/", self.endpoint))
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, action))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(service_error(status.as_u16(), &text));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl DeliveryStream for FirehoseClient {
    async fn describe_stream(&self, stream_name: &str) -> Result<StreamDescription, SinkError> {
        let request = DescribeDeliveryStreamRequest {
            delivery_stream_name: stream_name,
        };
        let response: DescribeDeliveryStreamResponse =
            self.call("DescribeDeliveryStream", &request).await?;

        let description = response.delivery_stream_description;
        Ok(StreamDescription {
            name: description
                .delivery_stream_name
                .unwrap_or_else(|| stream_name.to_string()),
            status: StreamStatus::from(description.delivery_stream_status.as_str()),
        })
    }

    async fn put_record_batch(
        &self,
        stream_name: &str,
        records: Vec<Vec<u8>>,
    ) -> Result<PutRecordBatchOutput, SinkError> {
        let request = PutRecordBatchRequest {
            delivery_stream_name: stream_name,
            records: records
                .iter()
                .map(|data| EncodedRecord {
                    data: BASE64_STANDARD.encode(data),
                })
                .collect(),
        };

        self.call("PutRecordBatch", &request).await
    }
}

fn service_error(status: u16, body: &str) -> SinkError {
    let parsed: Option<ServiceErrorBody> = serde_json::from_str(body).ok();

    match parsed {
        Some(err) if err.error_type.ends_with("ResourceNotFoundException") => {
            SinkError::StreamNotFound(err.message.unwrap_or_default())
        }
        Some(err) => SinkError::Service {
            status,
            message: match err.message {
                Some(message) => format!("{}: {}", err.error_type, message),
                None => err.error_type,
            },
        },
        None => SinkError::Service {
            status,
            message: body.to_string(),
        },
    }
}

// ===== Wire Types =====

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeDeliveryStreamRequest<'a> {
    delivery_stream_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeDeliveryStreamResponse {
    delivery_stream_description: DeliveryStreamDescription,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DeliveryStreamDescription {
    #[serde(default)]
    delivery_stream_name: Option<String>,
    delivery_stream_status: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutRecordBatchRequest<'a> {
    delivery_stream_name: &'a str,
    records: Vec<EncodedRecord>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct EncodedRecord {
    data: String,
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    #[serde(rename = "__type")]
    error_type: String,
    #[serde(default, alias = "Message")]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client(server: &mockito::ServerGuard) -> FirehoseClient {
        FirehoseClient::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_trailing_slash_is_trimmed() {
        let client = FirehoseClient::new("http://localhost:4566/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:4566");
    }

    #[tokio::test]
    async fn test_describe_stream() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-amz-target", "Firehose_20150804.DescribeDeliveryStream")
            .match_header("content-type", CONTENT_TYPE)
            .match_body(Matcher::Json(json!({"DeliveryStreamName": "logs"})))
            .with_status(200)
            .with_body(
                json!({
                    "DeliveryStreamDescription": {
                        "DeliveryStreamName": "logs",
                        "DeliveryStreamStatus": "ACTIVE"
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let description = client(&server).describe_stream("logs").await.unwrap();

        mock.assert_async().await;
        assert_eq!(description.name, "logs");
        assert!(description.status.is_active());
    }

    #[tokio::test]
    async fn test_describe_missing_stream() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(400)
            .with_body(
                json!({
                    "__type": "ResourceNotFoundException",
                    "message": "Firehose logs under account 000000000000 not found."
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = client(&server).describe_stream("logs").await.unwrap_err();
        assert!(matches!(err, SinkError::StreamNotFound(_)));
    }

    #[tokio::test]
    async fn test_put_record_batch_encodes_base64() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-amz-target", "Firehose_20150804.PutRecordBatch")
            .match_body(Matcher::Json(json!({
                "DeliveryStreamName": "logs",
                "Records": [{"Data": "aGVsbG8K"}, {"Data": "d29ybGQK"}]
            })))
            .with_status(200)
            .with_body(
                json!({
                    "FailedPutCount": 1,
                    "Encrypted": false,
                    "RequestResponses": [
                        {"RecordId": "r-1"},
                        {"ErrorCode": "InternalFailure", "ErrorMessage": "boom"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let output = client(&server)
            .put_record_batch("logs", vec![b"hello\n".to_vec(), b"world\n".to_vec()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(output.failed_put_count, 1);
        assert_eq!(output.accepted_count(), 1);
        assert_eq!(output.request_responses[0].record_id.as_deref(), Some("r-1"));
    }

    #[tokio::test]
    async fn test_put_record_batch_service_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(500)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let err = client(&server)
            .put_record_batch("logs", vec![b"x\n".to_vec()])
            .await
            .unwrap_err();

        match err {
            SinkError::Service { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream unavailable");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
