// components/media_downloader/src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Required dependency not found: {0}")]
    DependencyNotFound(&'static str),

    #[error("Please enter a video URL")]
    MissingUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("The video could not be found. It may have been deleted, made private or blocked in your region")]
    SourceUnavailable { raw: String },

    #[error("The source blocked the download (HTTP 403). The cookie credentials are probably stale, refresh them or try again later")]
    AccessDenied { raw: String },

    #[error("The download finished but no output file was found: {0}")]
    FileNotFound(String),

    #[error("Download failed: {0}")]
    Engine(String),

    #[error("Failed to build archive: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DownloadError {
    /// What the engine itself printed, for failures that came from it
    pub fn engine_output(&self) -> Option<&str> {
        match self {
            DownloadError::SourceUnavailable { raw }
            | DownloadError::AccessDenied { raw }
            | DownloadError::Engine(raw) => Some(raw),
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for DownloadError {
    fn from(err: zip::result::ZipError) -> Self {
        DownloadError::Archive(err.to_string())
    }
}

/// Map engine error text onto the user-facing taxonomy
///
/// This is substring matching on whatever the engine printed, so it is
/// best-effort messaging only. Unknown failures keep the original text.
pub fn classify_engine_error(message: &str) -> DownloadError {
    let raw = message.trim().to_string();

    if message.contains("Video unavailable")
        || message.contains("Private video")
        || message.contains("This video is not available")
    {
        return DownloadError::SourceUnavailable { raw };
    }

    let lower = message.to_lowercase();
    if lower.contains("http error 403") || (lower.contains("403") && lower.contains("forbidden")) {
        return DownloadError::AccessDenied { raw };
    }

    DownloadError::Engine(raw)
}
