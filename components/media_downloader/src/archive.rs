// components/media_downloader/src/archive.rs
use crate::error::DownloadError;
use crate::utils::normalize_title;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Archive file name for a collection: alphanumerics and spaces only
pub fn archive_name(collection_title: &str) -> String {
    let name = normalize_title(collection_title);
    let name = name.trim();
    if name.is_empty() {
        "playlist.zip".to_string()
    } else {
        format!("{}.zip", name)
    }
}

/// Zip `files` flat into `dest_dir`, one entry per distinct base name, sorted
///
/// Blocking; run it off the async executor.
pub fn create_archive(
    files: &[PathBuf],
    dest_dir: &Path,
    collection_title: &str,
) -> Result<PathBuf, DownloadError> {
    let mut files: Vec<&PathBuf> = files.iter().collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let out_path = dest_dir.join(archive_name(collection_title));
    let mut zip = zip::ZipWriter::new(File::create(&out_path)?);
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut seen = HashSet::new();
    for path in files {
        let Some(entry_name) = path.file_name().and_then(|n| n.to_str()) else {
            warn!(path = %path.display(), "skipping file whose name is not valid UTF-8");
            continue;
        };
        if !seen.insert(entry_name.to_string()) {
            continue;
        }

        zip.start_file(entry_name, options)?;
        let mut reader = BufReader::new(File::open(path)?);
        std::io::copy(&mut reader, &mut zip)?;
    }

    let mut file = zip.finish()?;
    file.flush()?;
    info!(archive = %out_path.display(), entries = seen.len(), "created archive");

    Ok(out_path)
}
