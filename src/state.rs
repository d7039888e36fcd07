use std::sync::Arc;

use crate::audio::{FfmpegConverter, MediaConverter};
use crate::settings::Settings;
use crate::translate::{GeminiLiveClient, TranslationService};

/// Shared, read-only dependencies of the request handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub converter: Arc<dyn MediaConverter>,
    pub translator: Arc<dyn TranslationService>,
}

impl AppState {
    /// Wire the production collaborators: ffmpeg and the Gemini Live client.
    pub fn new(settings: Settings) -> Self {
        let converter = Arc::new(FfmpegConverter::new(settings.ffmpeg_path.clone()));
        let translator = Arc::new(GeminiLiveClient::from_settings(&settings));
        Self::with_services(settings, converter, translator)
    }

    pub fn with_services(
        settings: Settings,
        converter: Arc<dyn MediaConverter>,
        translator: Arc<dyn TranslationService>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            converter,
            translator,
        }
    }
}
