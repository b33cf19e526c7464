// components/media_downloader/src/content_type.rs
use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content type for a file extension, leading dot and case ignored
pub fn content_type_for_extension(extension: &str) -> &'static str {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    match ext.as_str() {
        "mp4" => "video/mp4",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "zip" => "application/zip",
        _ => OCTET_STREAM,
    }
}

pub fn content_type_for_path(path: &Path) -> &'static str {
    path.extension()
        .map(|ext| content_type_for_extension(&ext.to_string_lossy()))
        .unwrap_or(OCTET_STREAM)
}
