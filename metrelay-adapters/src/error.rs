//! Error types for adapters.

use thiserror::Error;

/// Errors that can occur when polling an upstream system.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The JSON-RPC endpoint answered with an error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The adapter was configured with unusable settings.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

#[cfg(any(feature = "zabbix", feature = "elasticsearch", feature = "carbon-intensity"))]
impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else if err.is_decode() {
            AdapterError::Parse(err.to_string())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::Parse(err.to_string())
    }
}

/// Build the shared HTTP client used by the REST and JSON-RPC adapters.
#[cfg(any(feature = "zabbix", feature = "elasticsearch", feature = "carbon-intensity"))]
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, AdapterError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AdapterError::Config(format!("failed to build HTTP client: {e}")))
}

/// Fail on non-success status codes, mapping 401/403 to [`AdapterError::Auth`].
#[cfg(any(feature = "zabbix", feature = "elasticsearch", feature = "carbon-intensity"))]
pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AdapterError> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(AdapterError::Auth(format!("API returned status {status}")));
    }
    if !status.is_success() {
        return Err(AdapterError::Http(format!("API returned status {status}")));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_error_mentions_code_and_message() {
        let err = AdapterError::Rpc {
            code: -32602,
            message: "Invalid params.".to_string(),
        };
        assert_eq!(err.to_string(), "RPC error -32602: Invalid params.");
    }

    #[test]
    fn json_errors_are_parse_errors() {
        let err: AdapterError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, AdapterError::Parse(_)));
    }
}
