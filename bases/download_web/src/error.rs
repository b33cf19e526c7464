// bases/download_web/src/error.rs
use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use media_downloader::DownloadError;
use thiserror::Error;

/// Errors surfaced to the browser as an error page
#[derive(Error, Debug)]
pub enum AppError {
    #[error("failed to render page: {0}")]
    Template(#[from] askama::Error),

    #[error("{0}")]
    Download(#[from] DownloadError),

    #[error("Enter the access code first")]
    Unauthorized,

    #[error("ACCESS_CODE is not configured on the server. Set it in the environment or pass --access-code")]
    NotConfigured,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Template(_) | AppError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Download(err) => match err {
                DownloadError::MissingUrl
                | DownloadError::InvalidUrl(_)
                | DownloadError::InvalidOption(_) => StatusCode::BAD_REQUEST,
                DownloadError::SourceUnavailable { .. } => StatusCode::NOT_FOUND,
                DownloadError::AccessDenied { .. } | DownloadError::Engine(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let engine_output = match &self {
            AppError::Download(err) => err.engine_output(),
            _ => None,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, engine_output, "request failed");
        } else {
            tracing::info!(error = %self, engine_output, "request rejected");
        }

        let message = self.to_string();
        let body = ErrorTemplate { message: &message }
            .render()
            .unwrap_or_else(|_| message.clone());

        (status, Html(body)).into_response()
    }
}
