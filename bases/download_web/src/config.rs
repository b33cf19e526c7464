// bases/download_web/src/config.rs
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Server configuration, secrets included
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind
    pub bind: String,

    /// Port to listen on
    pub port: u16,

    /// Shared secret that unlocks a session, `None` when not configured
    pub access_code: Option<String>,

    /// Cookie file contents passed verbatim to the engine
    pub cookies: Option<Vec<u8>>,

    /// Parent directory for per-request workspaces
    pub workspace_root: Option<PathBuf>,

    /// Engine executable
    pub ytdlp_path: PathBuf,
}

/// JY2mate - paste a link, get the media file
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind: String,

    /// Access code users must enter before downloading
    #[arg(long, env = "ACCESS_CODE", hide_env_values = true)]
    pub access_code: Option<String>,

    /// Netscape cookie file handed to yt-dlp
    #[arg(long, env = "YTDLP_COOKIES_FILE", default_value = "cookies.txt")]
    pub cookies_file: PathBuf,

    /// Directory for temporary request workspaces (defaults to the system temp dir)
    #[arg(long, env = "WORKSPACE_ROOT")]
    pub workspace_root: Option<PathBuf>,

    /// yt-dlp executable to run
    #[arg(long, env = "YTDLP_PATH", default_value = "yt-dlp")]
    pub ytdlp_path: PathBuf,
}

impl Config {
    /// Create configuration from CLI arguments, reading the cookie file once
    pub fn from_args(args: CliArgs) -> std::io::Result<Self> {
        let access_code = args
            .access_code
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty());

        Ok(Self {
            bind: args.bind,
            port: args.port,
            access_code,
            cookies: read_cookies(&args.cookies_file)?,
            workspace_root: args.workspace_root,
            ytdlp_path: args.ytdlp_path,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn read_cookies(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) if !bytes.is_empty() => Ok(Some(bytes)),
        Ok(_) => {
            warn!(path = %path.display(), "cookie file is empty, downloads are likely to be blocked");
            Ok(None)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "cookie file not found, downloads are likely to be blocked");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
