use crate::auth::{CredentialSource, EnvCredentialSource, FileCredentialSource, StaticCredentialSource};
use crate::publisher::BatchLimits;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub sink: SinkConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub batch: BatchLimits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Largest accepted request body, before decompression
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Largest accepted request body after gzip decompression
    #[serde(default = "default_max_decompressed_bytes")]
    pub max_decompressed_bytes: usize,
}

fn default_listen() -> String {
    "0.0.0.0:3100".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_max_decompressed_bytes() -> usize {
    64 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_body_bytes: default_max_body_bytes(),
            max_decompressed_bytes: default_max_decompressed_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(rename = "type")]
    pub sink_type: SinkType,
    #[serde(default = "default_stream_name")]
    pub stream_name: String,
    /// Base URL of the Firehose-compatible API (firehose sinks only)
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_stream_name() -> String {
    "loki-ingestion-stream".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkType {
    Firehose,
    Memory,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum AuthConfig {
    /// JSON secret document with `username` and `password` keys
    File { path: PathBuf },
    Env {
        #[serde(default = "default_username_var")]
        username_var: String,
        #[serde(default = "default_password_var")]
        password_var: String,
    },
    Static { username: String, password: String },
}

fn default_username_var() -> String {
    "LOKIHOSE_AUTH_USERNAME".to_string()
}

fn default_password_var() -> String {
    "LOKIHOSE_AUTH_PASSWORD".to_string()
}

impl AuthConfig {
    pub fn credential_source(&self) -> Box<dyn CredentialSource> {
        match self {
            AuthConfig::File { path } => Box::new(FileCredentialSource::new(path.clone())),
            AuthConfig::Env {
                username_var,
                password_var,
            } => Box::new(EnvCredentialSource::new(username_var, password_var)),
            AuthConfig::Static { username, password } => {
                Box::new(StaticCredentialSource::new(username, password))
            }
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthConfig::File { path } => f.debug_struct("File").field("path", path).finish(),
            AuthConfig::Env {
                username_var,
                password_var,
            } => f
                .debug_struct("Env")
                .field("username_var", username_var)
                .field("password_var", password_var)
                .finish(),
            AuthConfig::Static { username, .. } => f
                .debug_struct("Static")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}
