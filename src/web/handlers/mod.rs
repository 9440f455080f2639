//! API handlers.

pub mod file;
pub mod share;

pub use file::*;
pub use share::*;

use std::sync::Arc;

use axum::{body::Body, http::header, response::Response};

use crate::share::{ShareDownload, ShareService};
use crate::web::error::ApiError;
use crate::web::middleware::RateLimitState;

/// Application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Share operations.
    pub service: ShareService,
    /// Password attempt throttling.
    pub rate_limit: Arc<RateLimitState>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(service: ShareService, password_attempts_per_minute: u32) -> Self {
        Self {
            service,
            rate_limit: Arc::new(RateLimitState::new(password_attempts_per_minute)),
        }
    }
}

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Control characters are dropped, quotes and backslashes replaced, and
/// non-ASCII names are additionally sent RFC 5987 encoded.
pub(crate) fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && sanitized == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let fallback: String = sanitized
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    let encoded = urlencoding::encode(&sanitized);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

/// Build the HTTP response for a served download.
pub(crate) fn download_response(download: ShareDownload) -> Result<Response<Body>, ApiError> {
    let ShareDownload { record, content } = download;

    Response::builder()
        .header(header::CONTENT_TYPE, &record.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&record.original_name),
        )
        .header(header::CONTENT_LENGTH, content.len())
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition_header("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_injection() {
        let header = content_disposition_header("evil\r\n\".txt");
        assert!(!header.contains('\r'));
        assert!(!header.contains('\n'));
        assert!(header.starts_with("attachment; filename=\"evil_.txt\""));
    }

    #[test]
    fn test_content_disposition_unicode() {
        let header = content_disposition_header("報告.txt");
        assert!(header.contains("filename=\"__.txt\""));
        assert!(header.contains("filename*=UTF-8''%E5%A0%B1%E5%91%8A.txt"));
    }
}
