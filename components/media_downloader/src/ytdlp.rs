// components/media_downloader/src/ytdlp.rs
use crate::error::{classify_engine_error, DownloadError};
use crate::metadata::ExtractionResult;
use crate::options::EngineOptions;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

#[async_trait]
pub trait Downloader {
    /// Check if the engine is installed and runnable
    async fn check_available(&self) -> Result<(), DownloadError>;

    /// Engine version string for display
    async fn version(&self) -> Result<String, DownloadError>;

    /// Run the engine with `options` against `url` and return what it reports
    ///
    /// In download mode the engine writes files under the options' output
    /// template before returning.
    async fn extract_info(
        &self,
        options: &EngineOptions,
        url: &Url,
    ) -> Result<ExtractionResult, DownloadError>;
}

/// The `yt-dlp` command line program
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl Downloader for YtDlp {
    async fn check_available(&self) -> Result<(), DownloadError> {
        which::which(&self.program)
            .map(|_| ())
            .map_err(|_| DownloadError::DependencyNotFound("yt-dlp"))
    }

    async fn version(&self) -> Result<String, DownloadError> {
        let output = Command::new(&self.program).arg("--version").output().await?;
        if !output.status.success() {
            return Err(DownloadError::Engine(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn extract_info(
        &self,
        options: &EngineOptions,
        url: &Url,
    ) -> Result<ExtractionResult, DownloadError> {
        let args = options.to_args();
        debug!(?args, %url, "running yt-dlp");

        let output = Command::new(&self.program)
            .args(&args)
            .arg("--")
            .arg(url.as_str())
            .kill_on_drop(true)
            .output()
            .await?;

        let stderr = String::from_utf8_lossy(&output.stderr);

        // With --ignore-errors the engine exits non-zero when any playlist
        // item failed but still prints the collection it managed.
        if !output.status.success() && !(options.ignore_errors && !output.stdout.is_empty()) {
            return Err(classify_engine_error(&stderr));
        }

        if !stderr.trim().is_empty() {
            info!(stderr = %stderr.trim(), "yt-dlp reported problems");
        }

        ExtractionResult::from_json(&output.stdout)
            .map_err(|e| DownloadError::Engine(format!("unreadable engine output: {}", e)))
    }
}


#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    const PLAYLIST_JSON: &str = r#"{"title": "Mix", "entries": [{"title": "kept", "playlist_index": 1}, null]}"#;

    /// Stand-in `yt-dlp` that prints canned output and exits with `code`
    fn fake_engine(dir: &TempDir, stdout: &str, stderr: &str, code: i32) -> YtDlp {
        let path = dir.path().join("yt-dlp");
        let script = format!(
            "#!/bin/sh\nprintf '%s' '{}'\nprintf '%s\\n' '{}' >&2\nexit {}\n",
            stdout, stderr, code
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        YtDlp::new(path)
    }

    fn url() -> Url {
        Url::parse("https://example.com/playlist?list=1").unwrap()
    }

    #[tokio::test]
    async fn failed_run_is_classified_from_stderr() {
        let dir = TempDir::new().unwrap();
        let engine = fake_engine(&dir, "", "ERROR: unable to download video data: HTTP Error 403: Forbidden", 1);
        let options = EngineOptions::for_metadata(false, None, "agent");

        let result = engine.extract_info(&options, &url()).await;

        assert_matches!(
            result,
            Err(DownloadError::AccessDenied { ref raw })
                if raw == "ERROR: unable to download video data: HTTP Error 403: Forbidden"
        );
    }

    #[tokio::test]
    async fn partial_playlist_failure_is_accepted_when_ignoring_errors() {
        let dir = TempDir::new().unwrap();
        let engine = fake_engine(&dir, PLAYLIST_JSON, "ERROR: [youtube] two: Video unavailable", 1);
        let mut options = EngineOptions::for_metadata(true, None, "agent");
        options.ignore_errors = true;

        let info = engine.extract_info(&options, &url()).await.unwrap();

        assert_eq!(info.display_title(), "Mix");
        assert!(info.is_collection());
    }

    #[tokio::test]
    async fn same_output_fails_without_ignore_errors() {
        let dir = TempDir::new().unwrap();
        let engine = fake_engine(&dir, PLAYLIST_JSON, "ERROR: [youtube] two: Video unavailable", 1);
        let options = EngineOptions::for_metadata(true, None, "agent");
        assert!(!options.ignore_errors);

        let result = engine.extract_info(&options, &url()).await;

        assert_matches!(result, Err(DownloadError::SourceUnavailable { .. }));
    }
}
