// components/media_downloader/src/types.rs
use crate::error::DownloadError;
use std::fmt;
use url::Url;

/// What the user wants out of the source: a transcoded audio track or a merged video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// Containers the engine can produce for this kind, first one is the default
    pub fn containers(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Audio => &["mp3", "flac", "m4a", "wav"],
            MediaKind::Video => &["mp4", "mkv"],
        }
    }

    /// Quality labels offered for this kind, first one is the default
    pub fn quality_labels(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Audio => &["192", "320", "128"],
            MediaKind::Video => &["best", "1080p", "720p", "480p"],
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            other => Err(DownloadError::InvalidOption(format!(
                "unknown media kind '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Parsed quality label
///
/// Video labels are `best` or `<height>p`, audio labels are a bitrate in kbps or `best`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Quality {
    Best,
    MaxHeight(u32),
    Bitrate(u32),
}

impl Quality {
    pub fn parse(kind: MediaKind, label: &str) -> Result<Self, DownloadError> {
        let label = label.trim().to_ascii_lowercase();
        if label.is_empty() || label == "best" {
            return Ok(Quality::Best);
        }

        let invalid = || DownloadError::InvalidOption(format!("unknown {} quality '{}'", kind, label));

        match kind {
            MediaKind::Video => {
                let digits: String = label.chars().take_while(|c| c.is_ascii_digit()).collect();
                let rest = &label[digits.len()..];
                if digits.is_empty() || !(rest.is_empty() || rest == "p") {
                    return Err(invalid());
                }
                digits.parse().map(Quality::MaxHeight).map_err(|_| invalid())
            }
            MediaKind::Audio => {
                let digits = label.strip_suffix('k').unwrap_or(&label);
                digits.parse().map(Quality::Bitrate).map_err(|_| invalid())
            }
        }
    }
}

/// Target file extension, always lower-case and without a leading dot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container(String);

impl Container {
    pub fn new(kind: MediaKind, value: &str) -> Result<Self, DownloadError> {
        let value = value.trim().trim_start_matches('.').to_ascii_lowercase();
        if !kind.containers().contains(&value.as_str()) {
            return Err(DownloadError::InvalidOption(format!(
                "container '{}' is not available for {}",
                value, kind
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user action, fixed for the whole invocation
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: Url,
    pub kind: MediaKind,
    pub quality: Quality,
    pub container: Container,
    pub playlist: bool,
}

impl DownloadRequest {
    /// Validate raw user input
    pub fn parse(
        url: &str,
        kind: MediaKind,
        quality: &str,
        container: &str,
        playlist: bool,
    ) -> Result<Self, DownloadError> {
        Ok(Self {
            url: parse_url(url)?,
            kind,
            quality: Quality::parse(kind, quality)?,
            container: Container::new(kind, container)?,
            playlist,
        })
    }
}

/// Parse a user supplied URL, rejecting empty input separately from garbage
pub fn parse_url(url: &str) -> Result<Url, DownloadError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(DownloadError::MissingUrl);
    }
    Url::parse(url).map_err(|e| DownloadError::InvalidUrl(e.to_string()))
}

/// The final artifact handed to the presentation layer
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub bytes: Vec<u8>,
    pub display_name: String,
    pub content_type: &'static str,
}
