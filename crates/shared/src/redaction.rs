//! Secret detection and redaction utilities.
//!
//! Config errors and structured log events pass through these helpers so that
//! datastore credentials never reach stderr or serialized config output.

/// The redacted placeholder string.
pub const REDACTED: &str = "[REDACTED]";

/// Checks if a key/variable name likely refers to a secret.
///
/// Matching is case-insensitive and covers both env-var style keys
/// (`RALLY_REPORTING_DATASTORE_PASSWORD`) and camelCase config keys
/// (`datastorePassword`).
///
/// # Examples
///
/// ```
/// use rally_metrics_shared::is_secret_key;
///
/// assert!(is_secret_key("RALLY_REPORTING_DATASTORE_PASSWORD"));
/// assert!(is_secret_key("datastorePassword"));
/// assert!(!is_secret_key("RALLY_ENV_NAME"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    key.contains("PASSWORD")
        || key.contains("SECRET")
        || key.contains("TOKEN")
        || key.contains("CREDENTIAL")
        || key.contains("API_KEY")
        || key.contains("AUTH")
}

/// Redacts a value if the key is likely a secret.
///
/// # Examples
///
/// ```
/// use rally_metrics_shared::redact_if_secret;
///
/// assert_eq!(redact_if_secret("datastorePassword", "hunter2"), "[REDACTED]");
/// assert_eq!(redact_if_secret("datastoreHost", "localhost"), "localhost");
/// ```
pub fn redact_if_secret(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

/// A secret string wrapper that redacts on Display/Debug.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SecretString(Box<str>);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<Box<str>>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying secret.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(REDACTED)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value.into_boxed_str())
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}
