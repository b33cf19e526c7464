// bases/download_web/src/server.rs
use crate::config::Config;
use crate::error::AppError;
use crate::session::{SessionId, SessionStore};
use askama::Template;
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use media_downloader::{DownloadRequest, DownloadedFile, InfoOutcome, MediaDownloader, MediaKind};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    downloader: Arc<MediaDownloader>,
    sessions: SessionStore,
    config: Arc<Config>,
    engine_version: Arc<str>,
}

impl AppState {
    pub async fn new(downloader: MediaDownloader, config: Config) -> Self {
        let engine_version = match downloader.engine_version().await {
            Ok(version) => version,
            Err(e) => {
                tracing::warn!(error = %e, "could not determine yt-dlp version");
                "unknown".to_string()
            }
        };
        info!(version = %engine_version, "using yt-dlp");

        Self {
            downloader: Arc::new(downloader),
            sessions: SessionStore::new(),
            config: Arc::new(config),
            engine_version: engine_version.into(),
        }
    }
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    engine_version: &'a str,
    has_cookies: bool,
    video_qualities: &'static [&'static str],
    video_containers: &'static [&'static str],
    audio_qualities: &'static [&'static str],
    audio_containers: &'static [&'static str],
}

#[derive(Template)]
#[template(path = "info.html")]
struct InfoTemplate {
    title: Option<String>,
    details: String,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    code: String,
}

#[derive(Debug, Deserialize)]
struct DownloadForm {
    url: String,
    kind: String,
    quality: String,
    container: String,
    playlist: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfoForm {
    url: String,
    playlist: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/download", post(download))
        .route("/info", post(details))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(downloader: MediaDownloader, config: Config) -> color_eyre::Result<()> {
    let addr = config.address();
    let state = AppState::new(downloader, config).await;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn with_session_cookie(mut response: Response, id: SessionId, is_new: bool) -> Response {
    if is_new {
        response.headers_mut().insert(header::SET_COOKIE, id.set_cookie());
    }
    response
}

/// Reject callers whose session has not been unlocked
async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<SessionId, AppError> {
    let id = SessionId::from_headers(headers).ok_or(AppError::Unauthorized)?;
    if state.sessions.get(&id).await.authenticated {
        Ok(id)
    } else {
        Err(AppError::Unauthorized)
    }
}

/// Handler for the main page: login form or download form
async fn index(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if state.config.access_code.is_none() {
        return Err(AppError::NotConfigured);
    }

    let (id, session, is_new) = state.sessions.resolve(&headers).await;

    let html = if session.authenticated {
        IndexTemplate {
            engine_version: &state.engine_version,
            has_cookies: state.downloader.has_cookies(),
            video_qualities: MediaKind::Video.quality_labels(),
            video_containers: MediaKind::Video.containers(),
            audio_qualities: MediaKind::Audio.quality_labels(),
            audio_containers: MediaKind::Audio.containers(),
        }
        .render()?
    } else {
        LoginTemplate { error: None }.render()?
    };

    Ok(with_session_cookie(Html(html).into_response(), id, is_new))
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let (id, _, is_new) = state.sessions.resolve(&headers).await;
    let expected = state.config.access_code.as_deref();

    if expected.is_none() {
        return Err(AppError::NotConfigured);
    }

    let response = if state.sessions.authenticate(id, expected, &form.code).await {
        info!(session = %id, "session unlocked");
        Redirect::to("/").into_response()
    } else {
        info!(session = %id, "wrong access code");
        let html = LoginTemplate {
            error: Some("The access code is not correct".to_string()),
        }
        .render()?;
        (StatusCode::UNAUTHORIZED, Html(html)).into_response()
    };

    Ok(with_session_cookie(response, id, is_new))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Redirect {
    if let Some(id) = SessionId::from_headers(&headers) {
        state.sessions.logout(&id).await;
    }
    Redirect::to("/")
}

async fn download(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<DownloadForm>,
) -> Result<Response, AppError> {
    authorize(&state, &headers).await?;

    let kind: MediaKind = form.kind.parse()?;
    let request = DownloadRequest::parse(
        &form.url,
        kind,
        &form.quality,
        &form.container,
        form.playlist.is_some(),
    )?;

    let file = state.downloader.download(&request).await?;
    Ok(file_response(file))
}

async fn details(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<InfoForm>,
) -> Result<Html<String>, AppError> {
    authorize(&state, &headers).await?;

    let template = match state
        .downloader
        .fetch_info(&form.url, form.playlist.is_some())
        .await
    {
        InfoOutcome::Found(info) => InfoTemplate {
            title: Some(info.display_title().to_string()),
            details: serde_json::to_string_pretty(&info.raw).unwrap_or_default(),
        },
        InfoOutcome::Failed(message) => InfoTemplate {
            title: None,
            details: message,
        },
    };

    Ok(Html(template.render()?))
}

/// Hand the bytes to the browser as an attachment
fn file_response(file: DownloadedFile) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_filename(&file.display_name),
        urlencoding::encode(&file.display_name)
    );

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(file.content_type));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );

    (headers, file.bytes).into_response()
}

/// Fallback name for clients that ignore `filename*`
fn ascii_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use media_downloader::{DownloadError, Downloader, EngineOptions, ExtractionResult, Mode, Url};
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct FakeEngine;

    #[async_trait]
    impl Downloader for FakeEngine {
        async fn check_available(&self) -> Result<(), DownloadError> {
            Ok(())
        }

        async fn version(&self) -> Result<String, DownloadError> {
            Ok("2024.01.01".to_string())
        }

        async fn extract_info(
            &self,
            options: &EngineOptions,
            url: &Url,
        ) -> Result<ExtractionResult, DownloadError> {
            if url.path() == "/gone" {
                return Err(media_downloader::classify_engine_error("ERROR: Video unavailable"));
            }
            if options.mode == Mode::Download {
                let dir = options
                    .output_template
                    .as_ref()
                    .and_then(|t| t.parent())
                    .expect("download mode has an output template");
                std::fs::write(dir.join("Fake Song.mp3"), b"ID3")?;
            }
            Ok(ExtractionResult::from_json(br#"{"title": "Fake Song", "ext": "mp3"}"#).unwrap())
        }
    }

    async fn app(access_code: Option<&str>, root: &TempDir) -> Router {
        let downloader = MediaDownloader::new_with_downloader(Arc::new(FakeEngine))
            .await
            .unwrap()
            .with_workspace_root(root.path());
        let config = Config {
            bind: "127.0.0.1".to_string(),
            port: 0,
            access_code: access_code.map(str::to_string),
            cookies: None,
            workspace_root: Some(root.path().to_path_buf()),
            ytdlp_path: PathBuf::from("yt-dlp"),
        };
        router(AppState::new(downloader, config).await)
    }

    fn form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Log in and return the cookie header to send afterwards
    async fn login(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(form("/login", None, "code=secret"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn first_visit_shows_login_and_sets_cookie() {
        let root = TempDir::new().unwrap();
        let app = app(Some("secret"), &root).await;

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::SET_COOKIE));
        assert!(body_text(response).await.contains("name=\"code\""));
    }

    #[tokio::test]
    async fn missing_access_code_is_reported() {
        let root = TempDir::new().unwrap();
        let app = app(None, &root).await;

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("ACCESS_CODE"));
    }

    #[tokio::test]
    async fn wrong_code_stays_locked() {
        let root = TempDir::new().unwrap();
        let app = app(Some("secret"), &root).await;

        let response = app
            .oneshot(form("/login", None, "code=nope"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn download_requires_login() {
        let root = TempDir::new().unwrap();
        let app = app(Some("secret"), &root).await;

        let response = app
            .oneshot(form(
                "/download",
                None,
                "url=https%3A%2F%2Fexample.com%2Fv&kind=audio&quality=192&container=mp3",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logged_in_download_returns_attachment() {
        let root = TempDir::new().unwrap();
        let app = app(Some("secret"), &root).await;
        let cookie = login(&app).await;

        let index = app
            .clone()
            .oneshot(
                Request::get("/")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(body_text(index).await.contains("2024.01.01"));

        let response = app
            .oneshot(form(
                "/download",
                Some(&cookie),
                "url=https%3A%2F%2Fexample.com%2Fv&kind=audio&quality=192&container=mp3",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.contains("filename=\"Fake Song.mp3\""), "{}", disposition);
        assert!(disposition.ends_with("filename*=UTF-8''Fake%20Song.mp3"), "{}", disposition);
        assert_eq!(body_text(response).await, "ID3");
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_url_is_a_user_error() {
        let root = TempDir::new().unwrap();
        let app = app(Some("secret"), &root).await;
        let cookie = login(&app).await;

        let response = app
            .oneshot(form(
                "/download",
                Some(&cookie),
                "url=&kind=video&quality=720p&container=mp4",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("Please enter a video URL"));
    }

    #[tokio::test]
    async fn unavailable_source_is_translated() {
        let root = TempDir::new().unwrap();
        let app = app(Some("secret"), &root).await;
        let cookie = login(&app).await;

        let response = app
            .oneshot(form(
                "/download",
                Some(&cookie),
                "url=https%3A%2F%2Fexample.com%2Fgone&kind=video&quality=best&container=mkv",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("could not be found"));
    }

    #[tokio::test]
    async fn info_shows_title_or_error_text() {
        let root = TempDir::new().unwrap();
        let app = app(Some("secret"), &root).await;
        let cookie = login(&app).await;

        let found = app
            .clone()
            .oneshot(form("/info", Some(&cookie), "url=https%3A%2F%2Fexample.com%2Fv"))
            .await
            .unwrap();
        assert_eq!(found.status(), StatusCode::OK);
        assert!(body_text(found).await.contains("Fake Song"));

        let failed = app
            .oneshot(form("/info", Some(&cookie), "url=https%3A%2F%2Fexample.com%2Fgone"))
            .await
            .unwrap();
        assert_eq!(failed.status(), StatusCode::OK);
        let text = body_text(failed).await;
        assert!(text.contains("ERROR: Video unavailable"), "{}", text);
        assert!(!text.contains("could not be found"));
    }

    #[test]
    fn disposition_names() {
        assert_eq!(ascii_filename("노래 \"live\".mp3"), "__ _live_.mp3");
        assert_eq!(urlencoding::encode("노래 a.mp3"), "%EB%85%B8%EB%9E%98%20a.mp3");
    }
}
