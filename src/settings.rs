use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Runtime settings, sourced from an optional `translator.*` file and the environment.
///
/// Field names match the lower-cased environment variables, so `GEMINI_API_KEY`
/// fills `gemini_api_key`.
#[derive(Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_response_modalities")]
    pub gemini_response_modalities: Vec<String>,
    #[serde(default = "default_gemini_endpoint")]
    pub gemini_endpoint: String,
    #[serde(default = "default_audio_formats")]
    pub supported_audio_formats: Vec<String>,
    #[serde(default = "default_sample_rate")]
    pub pcm_sample_rate: u32,
    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub conversion_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub translation_timeout_secs: u64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash-live-001".to_string()
}

fn default_response_modalities() -> Vec<String> {
    vec!["TEXT".to_string()]
}

fn default_gemini_endpoint() -> String {
    DEFAULT_GEMINI_ENDPOINT.to_string()
}

fn default_audio_formats() -> Vec<String> {
    ["mp3", "wav", "m4a", "ogg"]
        .iter()
        .map(|f| f.to_string())
        .collect()
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

impl Settings {
    /// Load settings from `CONFIG_PATH` (or `translator.{yaml,toml,json}` if present),
    /// then overlay the process environment.
    pub fn load() -> Result<Self> {
        let file = match std::env::var("CONFIG_PATH") {
            Ok(path) => ::config::File::with_name(&path).required(true),
            Err(_) => ::config::File::with_name("translator").required(false),
        };

        let source = ::config::Config::builder()
            .add_source(file)
            .add_source(environment())
            .build()?;

        Self::from_config(source)
    }

    pub fn from_config(source: ::config::Config) -> Result<Self> {
        let mut settings: Settings = source.try_deserialize()?;
        settings.normalize();
        settings.validate()?;
        Ok(settings)
    }

    /// Comma-separated env lists keep the blanks around each entry.
    fn normalize(&mut self) {
        self.supported_audio_formats = self
            .supported_audio_formats
            .iter()
            .map(|format| format.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|format| !format.is_empty())
            .collect();
        self.gemini_response_modalities = self
            .gemini_response_modalities
            .iter()
            .map(|modality| modality.trim().to_string())
            .filter(|modality| !modality.is_empty())
            .collect();
    }

    fn validate(&self) -> Result<()> {
        if self.gemini_api_key.trim().is_empty() {
            anyhow::bail!("GEMINI_API_KEY is not set");
        }
        if self.pcm_sample_rate == 0 {
            anyhow::bail!("PCM_SAMPLE_RATE must be greater than zero");
        }
        if self.supported_audio_formats.is_empty() {
            anyhow::bail!("SUPPORTED_AUDIO_FORMATS must list at least one extension");
        }
        Ok(())
    }

    /// Whether the upload's filename carries one of the accepted audio extensions.
    pub fn accepts_filename(&self, filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.supported_audio_formats
                    .iter()
                    .any(|format| format.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout_secs)
    }

    pub fn translation_timeout(&self) -> Duration {
        Duration::from_secs(self.translation_timeout_secs)
    }
}

fn environment() -> ::config::Environment {
    ::config::Environment::default()
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("supported_audio_formats")
        .with_list_parse_key("gemini_response_modalities")
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("gemini_api_key", &"<redacted>")
            .field("gemini_model", &self.gemini_model)
            .field("gemini_response_modalities", &self.gemini_response_modalities)
            .field("gemini_endpoint", &self.gemini_endpoint)
            .field("supported_audio_formats", &self.supported_audio_formats)
            .field("pcm_sample_rate", &self.pcm_sample_rate)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("temp_dir", &self.temp_dir)
            .field("conversion_timeout_secs", &self.conversion_timeout_secs)
            .field("translation_timeout_secs", &self.translation_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_model: default_gemini_model(),
            gemini_response_modalities: default_response_modalities(),
            gemini_endpoint: default_gemini_endpoint(),
            supported_audio_formats: default_audio_formats(),
            pcm_sample_rate: default_sample_rate(),
            server_host: default_host(),
            server_port: default_port(),
            ffmpeg_path: default_ffmpeg_path(),
            temp_dir: None,
            conversion_timeout_secs: default_timeout_secs(),
            translation_timeout_secs: default_timeout_secs(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}
