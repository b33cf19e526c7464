// components/media_downloader/src/metadata.rs
use serde::Deserialize;
use std::path::PathBuf;

/// One file the engine reports having written after post-processing
#[derive(Debug, Clone, Deserialize)]
pub struct RequestedDownload {
    pub filepath: Option<PathBuf>,
}

/// Engine metadata for a single item or a collection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub id: Option<String>,

    /// Extension before post-processing
    #[serde(default)]
    pub ext: Option<String>,

    /// Path the engine prepared from the output template
    #[serde(default)]
    pub filename: Option<PathBuf>,

    #[serde(default, rename = "_filename")]
    legacy_filename: Option<PathBuf>,

    #[serde(default)]
    pub requested_downloads: Vec<RequestedDownload>,

    #[serde(default)]
    pub playlist_index: Option<usize>,

    /// Collection items, `None` for items the engine skipped
    #[serde(default)]
    pub entries: Option<Vec<Option<ExtractionResult>>>,

    /// The complete JSON document as reported by the engine
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl ExtractionResult {
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: serde_json::Value = serde_json::from_slice(bytes)?;
        let mut result: ExtractionResult = serde_json::from_value(raw.clone())?;
        result.raw = raw;
        Ok(result)
    }

    /// Whether this describes a collection rather than one item
    pub fn is_collection(&self) -> bool {
        self.entries.is_some()
    }

    /// Items that actually came back from the engine
    pub fn items(&self) -> impl Iterator<Item = &ExtractionResult> {
        self.entries.iter().flatten().flatten()
    }

    /// Path prepared from the output template, before post-processing
    pub fn prepared_filename(&self) -> Option<&PathBuf> {
        self.filename.as_ref().or(self.legacy_filename.as_ref())
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}
