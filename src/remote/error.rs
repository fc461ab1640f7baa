/// Errors raised while talking to a remote archive
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Transport-level failure
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Response body was not the expected JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while writing a download
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Asset metadata lacks a field the conversion needs
    #[error("Invalid asset metadata: {0}")]
    InvalidAsset(String),

    /// A local location was handed to the archive client
    #[error("Not a remote location: {0}")]
    NotRemote(String),
}

#[cfg(feature = "dandi")]
impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => RemoteError::Status {
                url: err
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_default(),
                status: status.as_u16(),
            },
            None => RemoteError::Http(err.to_string()),
        }
    }
}
