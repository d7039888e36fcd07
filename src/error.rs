use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::audio::ConversionError;
use crate::handlers::ErrorResponse;
use crate::languages::UnsupportedLanguage;
use crate::translate::TranslationServiceError;

/// Failure classes a translate request can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conversion,
    Service,
    Unknown,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::Conversion => StatusCode::BAD_REQUEST,
        ErrorKind::Service | ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Service(#[from] TranslationServiceError),

    #[error("{phase} timed out after {seconds}s")]
    Timeout { phase: &'static str, seconds: u64 },

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl From<UnsupportedLanguage> for TranslateError {
    fn from(err: UnsupportedLanguage) -> Self {
        TranslateError::Validation(err.to_string())
    }
}

impl TranslateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslateError::Validation(_) => ErrorKind::Validation,
            TranslateError::Conversion(e) if e.is_malformed_input() => ErrorKind::Conversion,
            TranslateError::Service(_) => ErrorKind::Service,
            TranslateError::Conversion(_)
            | TranslateError::Timeout { .. }
            | TranslateError::Io { .. } => ErrorKind::Unknown,
        }
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.kind())
    }

    pub(crate) fn io(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| TranslateError::Io { context, source }
    }
}

impl IntoResponse for TranslateError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorResponse {
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}
