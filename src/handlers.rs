use std::fmt;

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::error::TranslateError;
use crate::languages::{self, UnsupportedLanguage};
use crate::state::AppState;
use crate::utils::RequestFiles;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResponse {
    /// The translated text
    pub translation: String,
    /// Display name of the target language
    pub target_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// A target language that has been checked against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub target_language: String,
    pub target_language_name: &'static str,
}

impl TranslationRequest {
    pub fn new(target_language: &str) -> Result<Self, UnsupportedLanguage> {
        let target_language_name = languages::resolve(target_language)?;
        Ok(Self {
            target_language: target_language.to_string(),
            target_language_name,
        })
    }
}

/// Progress of a translate request. Failures can happen in any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Staged,
    Converted,
    Translated,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Staged => "staged",
            Stage::Converted => "converted",
            Stage::Translated => "translated",
            Stage::Responded => "responded",
        };
        f.write_str(name)
    }
}

pub fn translation_instruction(language_name: &str) -> String {
    format!(
        "You are a helpful assistant. Translate the audio to {}.",
        language_name
    )
}

/// Documentation text for the translate endpoint.
pub fn translate_description() -> String {
    format!(
        "POST /translate\n\n\
         Translate an audio file to the specified target language.\n\n\
         Multipart fields:\n\
         - audio_file: the audio upload\n\
         - target_language: language code from the list below\n\n\
         **Supported Languages**:\n\n{}\n",
        languages::format_language_list()
    )
}

#[derive(Default)]
struct TranslateForm {
    audio_file: Option<(Option<String>, Bytes)>,
    target_language: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<TranslateForm, TranslateError> {
    let mut form = TranslateForm::default();
    let bad_multipart = |e: MultipartError| {
        TranslateError::Validation(format!("Failed to read multipart: {}", e))
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("audio_file") => {
                let filename = field.file_name().map(|n| n.to_string());
                let data = field.bytes().await.map_err(bad_multipart)?;
                form.audio_file = Some((filename, data));
            }
            Some("target_language") => {
                form.target_language = Some(field.text().await.map_err(bad_multipart)?);
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    Ok(form)
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!("translate: {} -> {}", stage, next);
    *stage = next;
}

#[tracing::instrument(skip_all)]
pub async fn translate_audio(State(state): State<AppState>, multipart: Multipart) -> Response {
    let mut files = RequestFiles::new(state.settings.temp_dir());
    let mut stage = Stage::Received;

    let response = match run_translation(&state, multipart, &mut files, &mut stage).await {
        Ok(response) => {
            info!("Translated audio to {}", response.target_language);
            Json(response).into_response()
        }
        Err(e) => {
            error!("Error translating audio (stage {}): {}", stage, e);
            e.into_response()
        }
    };

    // Temp files go away once the body has been sent.
    files.release_after(response)
}

async fn run_translation(
    state: &AppState,
    multipart: Multipart,
    files: &mut RequestFiles,
    stage: &mut Stage,
) -> Result<TranslationResponse, TranslateError> {
    let settings = &state.settings;

    let form = read_form(multipart).await?;
    let target_language = form.target_language.ok_or_else(|| {
        TranslateError::Validation("target_language is required".to_string())
    })?;
    let request = TranslationRequest::new(&target_language)?;

    let (filename, data) = form
        .audio_file
        .ok_or_else(|| TranslateError::Validation("audio_file is required".to_string()))?;
    let filename = filename
        .filter(|name| settings.accepts_filename(name))
        .ok_or_else(|| TranslateError::Validation("Unsupported file format".to_string()))?;
    debug!(
        "Translating {} to {} ({})",
        filename, request.target_language, request.target_language_name
    );
    advance(stage, Stage::Validated);

    let input_path = files
        .stage_input(&filename, &data)
        .await
        .map_err(TranslateError::io("Failed to store upload"))?;
    let output_pcm_path = files
        .reserve_output(".pcm")
        .await
        .map_err(TranslateError::io("Failed to allocate PCM output"))?;
    advance(stage, Stage::Staged);

    timeout(
        settings.conversion_timeout(),
        state
            .converter
            .convert(&input_path, &output_pcm_path, settings.pcm_sample_rate),
    )
    .await
    .map_err(|_| TranslateError::Timeout {
        phase: "Audio conversion",
        seconds: settings.conversion_timeout_secs,
    })??;
    advance(stage, Stage::Converted);

    let audio_bytes = tokio::fs::read(&output_pcm_path)
        .await
        .map_err(TranslateError::io("Failed to read converted audio"))?;
    let instruction = translation_instruction(request.target_language_name);

    let translation = timeout(
        settings.translation_timeout(),
        state.translator.translate(&audio_bytes, &instruction),
    )
    .await
    .map_err(|_| TranslateError::Timeout {
        phase: "Translation",
        seconds: settings.translation_timeout_secs,
    })??;
    advance(stage, Stage::Translated);

    let response = TranslationResponse {
        translation: translation.trim().to_string(),
        target_language: request.target_language_name.to_string(),
    };
    advance(stage, Stage::Responded);
    Ok(response)
}
