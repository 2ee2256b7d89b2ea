use super::types::*;
use crate::config::{expand_env_vars, expand_tilde, unexpanded_env_vars};
use crate::sink::{MAX_BYTES_PER_BATCH, MAX_RECORDS_PER_BATCH};
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string)
}

/// Parse and validate a config document, expanding `$env{...}` references first.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    let mut config: Config = serde_yaml::from_str(&yaml_string)?;
    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let unexpanded = unexpanded_env_vars(yaml_string);

    match unexpanded.as_slice() {
        [] => Ok(()),
        [single] => Err(ConfigError::Validation(format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=...\n\
             2. Replace $env{{{0}}} in the config file with a literal value",
            single
        ))),
        many => Err(ConfigError::Validation(format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables\n\
             2. Replace the variables in the config file with literal values",
            many.join(", ")
        ))),
    }
}

fn expand_paths(config: &mut Config) {
    if let AuthConfig::File { path } = &mut config.auth {
        *path = expand_tilde(path);
    }
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    validate_server(&config.server, &mut errors);
    validate_sink(&config.sink, &mut errors);
    validate_auth(&config.auth, &mut errors);

    if config.batch.max_records == 0 || config.batch.max_records > MAX_RECORDS_PER_BATCH {
        errors.push(format!(
            "batch.max_records must be between 1 and {}, got {}",
            MAX_RECORDS_PER_BATCH, config.batch.max_records
        ));
    }
    if config.batch.max_bytes == 0 || config.batch.max_bytes > MAX_BYTES_PER_BATCH {
        errors.push(format!(
            "batch.max_bytes must be between 1 and {}, got {}",
            MAX_BYTES_PER_BATCH, config.batch.max_bytes
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

fn validate_server(server: &ServerConfig, errors: &mut Vec<String>) {
    if server.listen.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "server.listen: '{}' is not a valid socket address",
            server.listen
        ));
    }
    if server.max_body_bytes == 0 {
        errors.push("server.max_body_bytes must be greater than 0".to_string());
    }
    if server.max_decompressed_bytes == 0 {
        errors.push("server.max_decompressed_bytes must be greater than 0".to_string());
    }
}

fn validate_sink(sink: &SinkConfig, errors: &mut Vec<String>) {
    if sink.stream_name.trim().is_empty() {
        errors.push("sink.stream_name cannot be empty".to_string());
    }

    if sink.sink_type == SinkType::Firehose {
        match sink.endpoint.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push("sink.endpoint is required for firehose sinks".to_string())
            }
            Some(endpoint) if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") => {
                errors.push(format!(
                    "sink.endpoint: '{}' must be an http:// or https:// URL",
                    endpoint
                ))
            }
            Some(_) => {}
        }
    }

    if sink.timeout.is_zero() {
        errors.push("sink.timeout must be greater than 0".to_string());
    }
}

fn validate_auth(auth: &AuthConfig, errors: &mut Vec<String>) {
    match auth {
        AuthConfig::File { path } => {
            if path.as_os_str().is_empty() {
                errors.push("auth.path cannot be empty".to_string());
            }
        }
        AuthConfig::Env {
            username_var,
            password_var,
        } => {
            if username_var.is_empty() || password_var.is_empty() {
                errors.push("auth.username_var and auth.password_var cannot be empty".to_string());
            }
        }
        AuthConfig::Static { username, password } => {
            if username.is_empty() || password.is_empty() {
                errors.push("auth.username and auth.password cannot be empty".to_string());
            }
        }
    }
}
