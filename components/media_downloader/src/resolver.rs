// components/media_downloader/src/resolver.rs
//! Find the file(s) the engine actually produced
//!
//! Post-processing can change the extension after the engine has reported a
//! path, so resolution is two steps: the reported or expected path first,
//! then a scan of the download directory. Both steps work on a `DirListing`
//! snapshot and never touch the filesystem themselves.

use crate::error::DownloadError;
use crate::metadata::ExtractionResult;
use crate::options::expected_file_name;
use crate::utils::normalize_title;
use std::path::{Path, PathBuf};

/// Leftovers of interrupted downloads, never a final output
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp"];

/// Sorted snapshot of the file names in one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirListing {
    dir: PathBuf,
    names: Vec<String>,
}

impl DirListing {
    pub fn new(dir: impl Into<PathBuf>, names: impl IntoIterator<Item = String>) -> Self {
        let mut names: Vec<String> = names
            .into_iter()
            .filter(|name| !PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s)))
            .collect();
        names.sort();
        names.dedup();
        Self {
            dir: dir.into(),
            names,
        }
    }

    /// Snapshot the regular files in `dir`
    pub async fn read(dir: &Path) -> std::io::Result<Self> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(Self::new(dir, names))
    }

    pub fn contains(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.names.iter().any(|n| name == n.as_str()))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.names.iter().map(|name| self.dir.join(name))
    }
}

/// Paths the engine claims to have written, most trustworthy first
///
/// The post-processed `filepath`, then the path prepared from the output
/// template, then the template rendered from title and extension. The last
/// one goes through `safe_file_name`, which escapes unsafe characters
/// differently than the engine does, so for such titles it rarely exists.
/// `scan_for_output` covers that case: it compares `normalize_title` of both
/// sides and so ignores how either side escaped the name.
pub fn primary_candidates(info: &ExtractionResult, dir: &Path) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = info
        .requested_downloads
        .iter()
        .filter_map(|d| d.filepath.clone())
        .collect();

    candidates.extend(info.prepared_filename().cloned());

    if let (Some(title), Some(ext)) = (info.title.as_deref(), info.ext.as_deref()) {
        candidates.push(dir.join(expected_file_name(title, info.playlist_index, ext)));
    }

    candidates.dedup();
    candidates
}

/// Fallback: first file named after the title, else first file with the wanted extension
pub fn scan_for_output(listing: &DirListing, title: Option<&str>, container: &str) -> Option<PathBuf> {
    let wanted = title.map(normalize_title).filter(|t| !t.is_empty());

    if let Some(wanted) = &wanted {
        let by_title = listing.names.iter().find(|name| {
            let stem = Path::new(name.as_str())
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            normalize_title(&stem).starts_with(wanted.as_str())
        });
        if let Some(name) = by_title {
            return Some(listing.dir.join(name));
        }
    }

    listing
        .names
        .iter()
        .find(|name| {
            Path::new(name.as_str())
                .extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(container))
                .unwrap_or(false)
        })
        .map(|name| listing.dir.join(name))
}

/// Resolve the output of a single item request
pub fn resolve_single(
    info: &ExtractionResult,
    listing: &DirListing,
    container: &str,
) -> Result<PathBuf, DownloadError> {
    let candidates = primary_candidates(info, &listing.dir);
    if let Some(found) = candidates.iter().find(|path| listing.contains(path)) {
        return Ok(found.clone());
    }
    if !candidates.is_empty() {
        tracing::debug!(?candidates, "reported outputs missing, scanning workspace");
    }

    scan_for_output(listing, info.title.as_deref(), container).ok_or_else(|| {
        DownloadError::FileNotFound(format!(
            "nothing matching '{}' or *.{} in {}",
            info.display_title(),
            container,
            listing.dir.display()
        ))
    })
}

/// Resolve every output of a collection request, in listing order
pub fn resolve_collection(listing: &DirListing) -> Result<Vec<PathBuf>, DownloadError> {
    if listing.is_empty() {
        return Err(DownloadError::FileNotFound(
            "no item of the playlist could be downloaded".to_string(),
        ));
    }
    Ok(listing.paths().collect())
}
