//! Fetch error type and retryable/fatal classification.

use thiserror::Error;

/// Error from a single unit fetch (curl failure, HTTP error, or storage failure).
#[derive(Debug, Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Disk/storage write failed (e.g. disk full, permission denied).
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
}

impl FetchError {
    /// Whether the caller may reschedule the task and expect a different result.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Curl(e) => classify_curl_error(e),
            FetchError::Http(code) => classify_http_status(*code),
            FetchError::Storage(_) => false,
        }
    }
}

/// Retryable HTTP statuses: request timeout, throttling and server errors.
pub fn classify_http_status(code: u32) -> bool {
    matches!(code, 408 | 429 | 500..=599)
}

/// Retryable curl errors: timeouts and network-level failures.
pub fn classify_curl_error(e: &curl::Error) -> bool {
    e.is_operation_timedout()
        || e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_throttle_and_5xx_retryable() {
        assert!(classify_http_status(429));
        assert!(classify_http_status(503));
        assert!(classify_http_status(500));
        assert!(classify_http_status(408));
    }

    #[test]
    fn http_4xx_fatal() {
        assert!(!classify_http_status(404));
        assert!(!classify_http_status(403));
        assert!(!FetchError::Http(410).is_retryable());
    }

    #[test]
    fn storage_errors_are_fatal() {
        let err = FetchError::Storage(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "storage: disk full");
    }

    #[test]
    fn curl_timeout_retryable() {
        // CURLE_OPERATION_TIMEDOUT
        let err = FetchError::Curl(curl::Error::new(28));
        assert!(err.is_retryable());
        // CURLE_URL_MALFORMAT
        let err = FetchError::Curl(curl::Error::new(3));
        assert!(!err.is_retryable());
    }
}
