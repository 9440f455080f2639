//! Request DTOs for Web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::no_control_chars;

/// Query parameters for listing owned files.
#[derive(Debug, Default, Deserialize)]
pub struct ListFilesQuery {
    /// Include revoked, retired and expired files.
    #[serde(default)]
    pub include_inactive: bool,
}

/// Query parameters for a share download.
#[derive(Debug, Default, Deserialize)]
pub struct ShareDownloadQuery {
    /// Share password.
    #[serde(default)]
    pub password: Option<String>,
}

/// Body of a share download request.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ShareDownloadRequest {
    /// Share password.
    #[serde(default)]
    #[validate(
        length(max = 128, message = "Password is too long"),
        custom(function = "no_control_chars")
    )]
    pub password: Option<String>,
}

/// Fields of a share upload, collected from multipart form data.
#[derive(Debug, Default)]
pub struct UploadForm {
    /// Original file name.
    pub filename: Option<String>,
    /// File content.
    pub content: Option<Vec<u8>>,
    /// MIME type sent with the file part.
    pub content_type: Option<String>,
    /// Hours until expiry.
    pub expiration_hours: Option<u32>,
    /// Share password.
    pub password: Option<String>,
    /// Maximum number of share downloads.
    pub download_limit: Option<i64>,
}
