// components/media_downloader/src/lib.rs
mod archive;
mod content_type;
mod error;
mod metadata;
mod options;
mod resolver;
mod types;
mod utils;
mod workspace;
mod ytdlp;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub use content_type::{content_type_for_extension, content_type_for_path};
pub use error::{classify_engine_error, DownloadError};
pub use metadata::ExtractionResult;
pub use options::{EngineOptions, Mode, PostProcessor};
pub use types::{parse_url, Container, DownloadRequest, DownloadedFile, MediaKind, Quality};
pub use workspace::Workspace;
pub use url::Url;
pub use ytdlp::{Downloader, YtDlp};

use archive::create_archive;
use resolver::{resolve_collection, resolve_single, DirListing};
use utils::random_user_agent;

/// Outcome of a metadata lookup; failures are data here, not errors
#[derive(Debug, Clone)]
pub enum InfoOutcome {
    Found(ExtractionResult),
    Failed(String),
}

/// Runs one request through engine, resolution and packaging
pub struct MediaDownloader {
    downloader: Arc<dyn Downloader + Send + Sync>,
    workspace_root: Option<PathBuf>,
    cookies: Option<Arc<Vec<u8>>>,
}

impl MediaDownloader {
    /// Create a MediaDownloader backed by the `yt-dlp` program
    pub async fn new(program: impl Into<PathBuf>) -> Result<Self, DownloadError> {
        Self::new_with_downloader(Arc::new(YtDlp::new(program))).await
    }

    /// Create a new MediaDownloader with a specific downloader implementation
    pub async fn new_with_downloader(
        downloader: Arc<dyn Downloader + Send + Sync>,
    ) -> Result<Self, DownloadError> {
        downloader.check_available().await?;

        Ok(Self {
            downloader,
            workspace_root: None,
            cookies: None,
        })
    }

    /// Create request workspaces under `root` instead of the system temp dir
    pub fn with_workspace_root(mut self, root: impl AsRef<Path>) -> Self {
        self.workspace_root = Some(root.as_ref().to_owned());
        self
    }

    /// Cookie file contents handed to the engine on every request
    pub fn with_cookies(mut self, cookies: Vec<u8>) -> Self {
        self.cookies = Some(Arc::new(cookies));
        self
    }

    pub fn has_cookies(&self) -> bool {
        self.cookies.is_some()
    }

    pub async fn engine_version(&self) -> Result<String, DownloadError> {
        self.downloader.version().await
    }

    fn acquire_workspace(&self) -> Result<Workspace, DownloadError> {
        let workspace = Workspace::acquire(self.workspace_root.as_deref())?;
        Ok(match &self.cookies {
            Some(cookies) => workspace.with_credentials(cookies)?,
            None => workspace,
        })
    }

    /// Download, resolve and package `request`, returning the bytes to hand out
    ///
    /// The workspace is gone by the time this returns, whatever the outcome.
    pub async fn download(&self, request: &DownloadRequest) -> Result<DownloadedFile, DownloadError> {
        let workspace = self.acquire_workspace()?;
        let result = self.download_in(&workspace, request).await;

        if let Err(e) = workspace.release() {
            warn!(error = %e, "workspace cleanup failed");
        }
        result
    }

    async fn download_in(
        &self,
        workspace: &Workspace,
        request: &DownloadRequest,
    ) -> Result<DownloadedFile, DownloadError> {
        info!(url = %request.url, kind = %request.kind, container = %request.container, playlist = request.playlist, "starting download");

        let options = EngineOptions::for_download(
            request,
            workspace.downloads(),
            workspace.credentials(),
            random_user_agent(),
        );
        let info = self.downloader.extract_info(&options, &request.url).await?;
        let listing = DirListing::read(workspace.downloads()).await?;

        let path = if request.playlist || info.is_collection() {
            let files = resolve_collection(&listing)?;
            info!(items = info.items().count(), files = files.len(), "collection downloaded");
            if files.len() > 1 {
                let dest = workspace.path().to_path_buf();
                let title = info.display_title().to_string();
                tokio::task::spawn_blocking(move || create_archive(&files, &dest, &title))
                    .await
                    .map_err(|e| DownloadError::Archive(format!("archive task failed: {}", e)))??
            } else {
                files.into_iter().next().ok_or_else(|| {
                    DownloadError::FileNotFound("playlist produced no files".to_string())
                })?
            }
        } else {
            resolve_single(&info, &listing, request.container.as_str())?
        };

        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "download".to_string());
        let bytes = tokio::fs::read(&path).await?;
        info!(file = %display_name, size = bytes.len(), "download ready");

        Ok(DownloadedFile {
            content_type: content_type_for_path(&path),
            display_name,
            bytes,
        })
    }

    /// Look up metadata without downloading anything
    pub async fn fetch_info(&self, url: &str, playlist: bool) -> InfoOutcome {
        let url = match parse_url(url) {
            Ok(url) => url,
            Err(e) => return InfoOutcome::Failed(e.to_string()),
        };

        let workspace = match self.acquire_workspace() {
            Ok(workspace) => workspace,
            Err(e) => return InfoOutcome::Failed(e.to_string()),
        };

        let options =
            EngineOptions::for_metadata(playlist, workspace.credentials(), random_user_agent());
        let outcome = match self.downloader.extract_info(&options, &url).await {
            Ok(info) => InfoOutcome::Found(info),
            Err(e) => InfoOutcome::Failed(
                e.engine_output()
                    .map(str::to_string)
                    .unwrap_or_else(|| e.to_string()),
            ),
        };

        if let Err(e) = workspace.release() {
            warn!(error = %e, "workspace cleanup failed");
        }
        outcome
    }
}
