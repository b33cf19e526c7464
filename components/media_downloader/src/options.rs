// components/media_downloader/src/options.rs
//! Engine configuration built from a request
//!
//! Everything here is pure: the same request, workspace and credential path
//! always produce the same options, so the branches can be tested without
//! running the engine.

use crate::types::{DownloadRequest, MediaKind, Quality};
use std::path::{Path, PathBuf};

pub const RETRIES: u32 = 10;
pub const FRAGMENT_RETRIES: u32 = 10;

const SINGLE_TEMPLATE: &str = "%(title)s.%(ext)s";
const PLAYLIST_TEMPLATE: &str = "%(playlist_index)s - %(title)s.%(ext)s";

/// Transcode step applied after download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessor {
    ExtractAudio { codec: String, quality: String },
}

/// Whether the engine should write files or only report metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Download,
    MetadataOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub mode: Mode,
    pub format: Option<String>,
    pub output_template: Option<PathBuf>,
    pub postprocessor: Option<PostProcessor>,
    pub merge_output_format: Option<String>,
    pub keep_video: bool,
    pub user_agent: String,
    pub cookie_file: Option<PathBuf>,
    pub retries: u32,
    pub fragment_retries: u32,
    pub no_playlist: bool,
    pub ignore_errors: bool,
}

impl EngineOptions {
    /// Options for a full download of `request` into `download_dir`
    pub fn for_download(
        request: &DownloadRequest,
        download_dir: &Path,
        cookie_file: Option<&Path>,
        user_agent: &str,
    ) -> Self {
        let template = if request.playlist {
            PLAYLIST_TEMPLATE
        } else {
            SINGLE_TEMPLATE
        };

        let mut options = Self {
            mode: Mode::Download,
            output_template: Some(download_dir.join(template)),
            ..Self::network(request.playlist, cookie_file, user_agent)
        };
        options.ignore_errors = request.playlist;

        match request.kind {
            MediaKind::Audio => {
                options.format = Some("bestaudio/best".to_string());
                options.postprocessor = Some(PostProcessor::ExtractAudio {
                    codec: request.container.as_str().to_string(),
                    quality: audio_quality(&request.quality),
                });
                options.keep_video = false;
            }
            MediaKind::Video => {
                options.format = Some(video_format(&request.quality));
                options.merge_output_format = Some(request.container.as_str().to_string());
            }
        }

        options
    }

    /// Options for a metadata lookup: same network and auth setup, nothing downloaded
    pub fn for_metadata(playlist: bool, cookie_file: Option<&Path>, user_agent: &str) -> Self {
        Self::network(playlist, cookie_file, user_agent)
    }

    fn network(playlist: bool, cookie_file: Option<&Path>, user_agent: &str) -> Self {
        Self {
            mode: Mode::MetadataOnly,
            format: None,
            output_template: None,
            postprocessor: None,
            merge_output_format: None,
            keep_video: false,
            user_agent: user_agent.to_string(),
            cookie_file: cookie_file.map(Path::to_path_buf),
            retries: RETRIES,
            fragment_retries: FRAGMENT_RETRIES,
            no_playlist: !playlist,
            ignore_errors: false,
        }
    }

    /// Render as a yt-dlp command line, URL excluded
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--quiet".into(),
            "--no-progress".into(),
            "--no-warnings".into(),
            "--dump-single-json".into(),
        ];

        if self.mode == Mode::Download {
            args.push("--no-simulate".into());
        }

        args.push("--user-agent".into());
        args.push(self.user_agent.clone());
        args.push("--retries".into());
        args.push(self.retries.to_string());
        args.push("--fragment-retries".into());
        args.push(self.fragment_retries.to_string());

        args.push(if self.no_playlist { "--no-playlist" } else { "--yes-playlist" }.into());
        if self.ignore_errors {
            args.push("--ignore-errors".into());
        }

        if let Some(cookie_file) = &self.cookie_file {
            args.push("--cookies".into());
            args.push(cookie_file.to_string_lossy().into_owned());
        }

        if let Some(template) = &self.output_template {
            args.push("--output".into());
            args.push(template.to_string_lossy().into_owned());
        }

        if let Some(format) = &self.format {
            args.push("--format".into());
            args.push(format.clone());
        }

        match &self.postprocessor {
            Some(PostProcessor::ExtractAudio { codec, quality }) => {
                args.push("--extract-audio".into());
                args.push("--audio-format".into());
                args.push(codec.clone());
                args.push("--audio-quality".into());
                args.push(quality.clone());
                if self.keep_video {
                    args.push("--keep-video".into());
                }
            }
            None => {}
        }

        if let Some(merge) = &self.merge_output_format {
            args.push("--merge-output-format".into());
            args.push(merge.clone());
        }

        args
    }
}

/// Format selector for video: best video under the height ceiling plus best audio
pub fn video_format(quality: &Quality) -> String {
    let filter = match quality {
        Quality::MaxHeight(height) => format!("[height<=?{}]", height),
        _ => String::new(),
    };
    format!(
        "bestvideo{f}[ext=mp4]+bestaudio[ext=m4a]/bestvideo{f}+bestaudio/best",
        f = filter
    )
}

fn audio_quality(quality: &Quality) -> String {
    match quality {
        Quality::Bitrate(kbps) => kbps.to_string(),
        // 0 is the engine's best VBR setting
        _ => "0".to_string(),
    }
}

/// The file name the engine would produce from the output template
pub fn expected_file_name(title: &str, playlist_index: Option<usize>, ext: &str) -> String {
    let title = crate::utils::safe_file_name(title);
    match playlist_index {
        Some(index) => format!("{} - {}.{}", index, title, ext),
        None => format!("{}.{}", title, ext),
    }
}
