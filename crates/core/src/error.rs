//! Error types for qnasnap operations.
//!
//! This module defines the main error type [`QnaError`] which represents
//! every way a single URL-to-document run can fail: classification, fetching,
//! upstream payload resolution, rendering and persistence.
//!
//! # Example
//!
//! ```rust
//! use qnasnap_core::{QnaError, classify};
//!
//! match classify("https://example.com/not-a-question") {
//!     Ok(request) => println!("kind: {:?}", request.kind),
//!     Err(QnaError::UnsupportedUrl(url)) => println!("cannot handle {}", url),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the extraction pipeline.
///
/// Every variant aborts the in-flight document. Nothing is written to disk
/// unless the whole pipeline succeeds, so no partial files are left behind.
#[derive(Error, Debug)]
pub enum QnaError {
    /// The URL matches neither the question shape nor the solution shape.
    #[error("URL not supported: {0}")]
    UnsupportedUrl(String),

    /// An upstream call returned a status outside the expected set.
    #[error("Expected a different status code but got {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// An anti-automation interstitial was served instead of the page.
    ///
    /// Usually fixed by refreshing the session cookie.
    #[error("Bot challenge detected in fetched page")]
    BotChallengeDetected,

    /// The fetched page carries no session token, which the solution query needs.
    #[error("Unable to find a session token in the fetched page")]
    MissingSessionToken,

    /// A required identifier is absent from the page text.
    #[error("Malformed page: {0}")]
    MalformedPage(String),

    /// The upstream API reported an access restriction on this device.
    #[error("Device allowed quota exceeded")]
    QuotaExceeded,

    /// Upstream payload is not valid JSON or does not have the expected shape.
    #[error("Failed to parse upstream JSON: {0}")]
    JsonParse(String),

    /// The rendered document could not be written.
    #[error("Failed to write output to {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP transport errors from reqwest.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// A header name or value could not be encoded.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The cookie string has a segment without `=`.
    #[error("Invalid cookie: {0}")]
    InvalidCookie(String),

    /// The output naming template has an unknown or unusable placeholder.
    #[error("Invalid file name template: {0}")]
    InvalidNameTemplate(String),

    /// A page template could not be loaded.
    #[error("Template error: {0}")]
    Template(String),

    /// The final repair pass could not rewrite the rendered document.
    #[error("Failed to repair rendered document: {0}")]
    Repair(String),

    /// Pipeline configuration errors.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for QnaError {
    fn from(err: serde_json::Error) -> Self {
        QnaError::JsonParse(err.to_string())
    }
}

impl From<lol_html::errors::RewritingError> for QnaError {
    fn from(err: lol_html::errors::RewritingError) -> Self {
        QnaError::Repair(err.to_string())
    }
}

/// Result type alias for QnaError.
pub type Result<T> = std::result::Result<T, QnaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QnaError::UnsupportedUrl("https://example.com".to_string());
        assert!(err.to_string().contains("not supported"));
        assert!(err.to_string().contains("example.com"));
    }

    #[test]
    fn test_unexpected_status_error() {
        let err = QnaError::UnexpectedStatus { status: 403, url: "https://www.chegg.com/x".to_string() };
        assert!(err.to_string().contains("403"));
    }

    #[test]
    fn test_output_write_error_names_path() {
        let err = QnaError::OutputWrite {
            path: PathBuf::from("/nowhere/page.html"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/nowhere/page.html"));
    }

    #[test]
    fn test_json_error_conversion() {
        let err: QnaError = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err().into();
        assert!(matches!(err, QnaError::JsonParse(_)));
    }

    #[test]
    fn test_rewriting_error_conversion() {
        let err: QnaError = lol_html::errors::RewritingError::ContentHandlerError("handler failed".into()).into();
        assert!(matches!(err, QnaError::Repair(_)));
        assert!(err.to_string().contains("handler failed"));
    }
}
