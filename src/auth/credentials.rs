use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credentials not found: {0}")]
    NotFound(String),

    #[error("malformed credentials in {location}: {reason}")]
    Malformed { location: String, reason: String },
}

/// Username and password pair read from a credential source
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    fn validated(self, location: &str) -> Result<Self, CredentialError> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(CredentialError::Malformed {
                location: location.to_string(),
                reason: "username and password must both be set".to_string(),
            });
        }
        Ok(self)
    }
}

/// Where the expected push credentials come from.
pub trait CredentialSource {
    fn load(&self) -> Result<Credentials, CredentialError>;
}

/// A JSON secret document: `{"username": "...", "password": "..."}`
#[derive(Debug, Clone)]
pub struct FileCredentialSource {
    path: PathBuf,
}

impl FileCredentialSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialSource for FileCredentialSource {
    fn load(&self) -> Result<Credentials, CredentialError> {
        let location = self.path.display().to_string();
        let contents = std::fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CredentialError::NotFound(location.clone()),
            _ => CredentialError::Malformed {
                location: location.clone(),
                reason: e.to_string(),
            },
        })?;

        let credentials: Credentials =
            serde_json::from_str(&contents).map_err(|e| CredentialError::Malformed {
                location: location.clone(),
                reason: e.to_string(),
            })?;

        credentials.validated(&location)
    }
}

/// Reads the username and password from two environment variables.
#[derive(Debug, Clone)]
pub struct EnvCredentialSource {
    username_var: String,
    password_var: String,
}

impl EnvCredentialSource {
    pub fn new(username_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        Self {
            username_var: username_var.into(),
            password_var: password_var.into(),
        }
    }
}

impl CredentialSource for EnvCredentialSource {
    fn load(&self) -> Result<Credentials, CredentialError> {
        let read = |var: &str| {
            std::env::var(var).map_err(|e| match e {
                std::env::VarError::NotPresent => {
                    CredentialError::NotFound(format!("environment variable {}", var))
                }
                std::env::VarError::NotUnicode(_) => CredentialError::Malformed {
                    location: format!("environment variable {}", var),
                    reason: "value is not valid unicode".to_string(),
                },
            })
        };

        let credentials = Credentials {
            username: read(&self.username_var)?,
            password: read(&self.password_var)?,
        };

        credentials.validated(&format!(
            "environment variables {}/{}",
            self.username_var, self.password_var
        ))
    }
}

/// Credentials given directly in the config file.
#[derive(Clone)]
pub struct StaticCredentialSource {
    credentials: Credentials,
}

impl StaticCredentialSource {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Credentials {
                username: username.into(),
                password: password.into(),
            },
        }
    }
}

impl CredentialSource for StaticCredentialSource {
    fn load(&self) -> Result<Credentials, CredentialError> {
        self.credentials.clone().validated("config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn secret_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_file_source_reads_secret() {
        let file = secret_file(r#"{"username": "promtail", "password": "s3cret"}"#);
        let credentials = FileCredentialSource::new(file.path()).load().unwrap();

        assert_eq!(credentials.username, "promtail");
        assert_eq!(credentials.password, "s3cret");
    }

    #[test]
    fn test_file_source_missing_file() {
        let err = FileCredentialSource::new("/nonexistent/lokihose/secret.json")
            .load()
            .err().unwrap();
        assert!(matches!(err, CredentialError::NotFound(_)));
    }

    #[test]
    fn test_file_source_malformed_json() {
        let file = secret_file("username=promtail");
        let err = FileCredentialSource::new(file.path()).load().err().unwrap();
        assert!(matches!(err, CredentialError::Malformed { .. }));
    }

    #[test]
    fn test_file_source_missing_password() {
        let file = secret_file(r#"{"username": "promtail"}"#);
        let err = FileCredentialSource::new(file.path()).load().err().unwrap();
        assert!(matches!(err, CredentialError::Malformed { .. }));
    }

    #[test]
    fn test_env_source() {
        std::env::set_var("LOKIHOSE_TEST_ENV_USER", "promtail");
        std::env::set_var("LOKIHOSE_TEST_ENV_PASS", "s3cret");

        let credentials = EnvCredentialSource::new("LOKIHOSE_TEST_ENV_USER", "LOKIHOSE_TEST_ENV_PASS")
            .load()
            .unwrap();
        assert_eq!(credentials.username, "promtail");
        assert_eq!(credentials.password, "s3cret");

        std::env::remove_var("LOKIHOSE_TEST_ENV_USER");
        std::env::remove_var("LOKIHOSE_TEST_ENV_PASS");
    }

    #[test]
    fn test_env_source_missing_var() {
        let err = EnvCredentialSource::new("LOKIHOSE_TEST_UNSET_USER", "LOKIHOSE_TEST_UNSET_PASS")
            .load()
            .err().unwrap();
        assert!(matches!(err, CredentialError::NotFound(_)));
    }

    #[test]
    fn test_static_source_rejects_empty() {
        assert!(StaticCredentialSource::new("user", "").load().is_err());
        assert!(StaticCredentialSource::new("user", "pass").load().is_ok());
    }
}
