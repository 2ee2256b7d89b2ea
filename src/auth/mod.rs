pub mod credentials;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use std::fmt;
use subtle::ConstantTimeEq;

pub use credentials::{
    CredentialError, CredentialSource, Credentials, EnvCredentialSource, FileCredentialSource,
    StaticCredentialSource,
};

/// Realm advertised in `WWW-Authenticate` challenges
pub const REALM: &str = "Secure Area";

/// Check a username/password pair against the expected credentials.
///
/// Both fields are compared in constant time and the results are combined
/// without short-circuiting. Only a length mismatch is observable.
pub fn verify(
    username: &str,
    password: &str,
    expected_username: &str,
    expected_password: &[u8],
) -> bool {
    let username_ok = username.as_bytes().ct_eq(expected_username.as_bytes());
    let password_ok = password.as_bytes().ct_eq(expected_password);

    (username_ok & password_ok).into()
}

/// Credentials the push endpoint accepts. Loaded once at startup.
#[derive(Clone)]
pub struct ExpectedCredentials {
    username: String,
    password: Vec<u8>,
}

impl ExpectedCredentials {
    pub fn new(username: impl Into<String>, password: impl AsRef<[u8]>) -> Self {
        Self {
            username: username.into(),
            password: password.as_ref().to_vec(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn verify(&self, supplied: &BasicCredentials) -> bool {
        verify(
            &supplied.username,
            &supplied.password,
            &self.username,
            &self.password,
        )
    }
}

impl From<Credentials> for ExpectedCredentials {
    fn from(credentials: Credentials) -> Self {
        Self::new(credentials.username, credentials.password)
    }
}

impl fmt::Debug for ExpectedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpectedCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Credentials supplied in an `Authorization: Basic ...` header
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    /// Parse an `Authorization` header value. Returns `None` for any other
    /// scheme or a malformed token.
    pub fn from_header(value: &str) -> Option<Self> {
        let (scheme, token) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = BASE64_STANDARD.decode(token.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;

        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(user: &str, pass: &str) -> String {
        format!("Basic {}", BASE64_STANDARD.encode(format!("{}:{}", user, pass)))
    }

    #[test]
    fn test_verify_exact_match() {
        assert!(verify("testuser", "testpassword", "testuser", b"testpassword"));
    }

    #[test]
    fn test_verify_rejects_username_mismatch() {
        assert!(!verify("other", "testpassword", "testuser", b"testpassword"));
    }

    #[test]
    fn test_verify_rejects_length_mismatch() {
        assert!(!verify("testuser", "testpasswor", "testuser", b"testpassword"));
        assert!(!verify("testuser", "testpassword1", "testuser", b"testpassword"));
        assert!(!verify("testuser", "", "testuser", b"testpassword"));
    }

    #[test]
    fn test_verify_rejects_content_mismatch_at_any_position() {
        let expected = b"testpassword";
        for i in 0..expected.len() {
            let mut wrong = expected.to_vec();
            wrong[i] ^= 0x01;
            let wrong = String::from_utf8(wrong).unwrap();
            assert!(!verify("testuser", &wrong, "testuser", expected), "position {}", i);
        }
    }

    #[test]
    fn test_verify_compares_bytes_not_chars() {
        // "é" is two bytes, so the byte lengths differ from "ee"
        assert!(!verify("u", "é", "u", b"ee"));
        assert!(verify("u", "é", "u", "é".as_bytes()));
    }

    #[test]
    fn test_parse_basic_header() {
        let creds = BasicCredentials::from_header(&header("testuser", "pa:ss")).unwrap();
        assert_eq!(creds.username, "testuser");
        assert_eq!(creds.password, "pa:ss");

        let lower = format!("basic {}", BASE64_STANDARD.encode("u:p"));
        assert!(BasicCredentials::from_header(&lower).is_some());
    }

    #[test]
    fn test_parse_rejects_malformed_headers() {
        assert!(BasicCredentials::from_header("Bearer abc").is_none());
        assert!(BasicCredentials::from_header("Basic").is_none());
        assert!(BasicCredentials::from_header("Basic !!!not-base64").is_none());
        let no_colon = format!("Basic {}", BASE64_STANDARD.encode("nocolon"));
        assert!(BasicCredentials::from_header(&no_colon).is_none());
    }

    #[test]
    fn test_expected_credentials_debug_redacts_password() {
        let expected = ExpectedCredentials::new("testuser", "hunter2");
        let debug = format!("{:?}", expected);
        assert!(debug.contains("testuser"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_expected_credentials_verify() {
        let expected = ExpectedCredentials::new("testuser", "testpassword");
        let good = BasicCredentials::from_header(&header("testuser", "testpassword")).unwrap();
        let bad = BasicCredentials::from_header(&header("testuser", "wrongpassword")).unwrap();

        assert!(expected.verify(&good));
        assert!(!expected.verify(&bad));
    }
}
