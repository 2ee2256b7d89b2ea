pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# LOKIHOSE CONFIGURATION
# =============================================================================
# Accepts Loki push requests and forwards every log line to a delivery stream.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/lokihose/config.yml
#   3. /etc/lokihose/config.yml
#
# Any value may reference an environment variable as $env{...} with the
# variable name between the braces.

# =============================================================================
# SERVER
# =============================================================================

server:
  # Address for the HTTP listener (GET /healthz, POST /loki/api/v1/push)
  listen: "0.0.0.0:3100"
  # Largest accepted request body in bytes, measured before decompression
  max_body_bytes: 10485760
  # Largest accepted body after gzip decompression
  max_decompressed_bytes: 67108864

# =============================================================================
# SINK
# =============================================================================
# 'firehose' talks to a Firehose-compatible JSON API at 'endpoint'.
# 'memory' keeps batches in process and is only useful for local testing.

sink:
  type: firehose
  stream_name: loki-ingestion-stream
  endpoint: http://localhost:4566
  timeout: 30s

# =============================================================================
# AUTH
# =============================================================================
# Push requests must carry HTTP Basic credentials matching these.
#
#   source: file    JSON document {"username": "...", "password": "..."}
#   source: env     username_var / password_var name two environment variables
#   source: static  username / password inline (avoid outside development)

auth:
  source: file
  path: /run/secrets/lokihose-auth.json

# =============================================================================
# BATCHING (optional)
# =============================================================================
# Limits per delivery stream call. Cannot exceed 500 records or 4 MiB.

batch:
  max_records: 500
  max_bytes: 4194304
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_starter_config_is_valid() {
        let config = parse_config(&generate_starter_config()).unwrap();
        assert_eq!(config.sink.stream_name, "loki-ingestion-stream");
        assert_eq!(config.server.listen, "0.0.0.0:3100");
    }
}
