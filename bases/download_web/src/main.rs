// bases/download_web/src/main.rs
use clap::Parser;
use color_eyre::Result;
use media_downloader::MediaDownloader;

mod config;
mod error;
mod server;
mod session;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "download_web=info,media_downloader=info,tower_http=info".into()
            }),
        )
        .init();

    let args = config::CliArgs::parse();
    let config = config::Config::from_args(args)?;

    if config.access_code.is_none() {
        tracing::warn!("ACCESS_CODE is not set, nobody will be able to log in");
    }

    let mut downloader = MediaDownloader::new(config.ytdlp_path.clone()).await?;
    if let Some(root) = &config.workspace_root {
        downloader = downloader.with_workspace_root(root);
    }
    if let Some(cookies) = &config.cookies {
        downloader = downloader.with_cookies(cookies.clone());
    }

    server::run(downloader, config).await?;

    Ok(())
}
