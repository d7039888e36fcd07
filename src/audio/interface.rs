use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Audio conversion failed: {detail}")]
    Failed { status: Option<i32>, detail: String },

    #[error("Audio conversion produced no audio")]
    EmptyOutput,

    #[error("Failed to start audio converter: {0}")]
    Spawn(#[source] std::io::Error),
}

impl ConversionError {
    /// True when the upload itself is to blame (unreadable or unsupported media),
    /// as opposed to the converter being unavailable.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, ConversionError::Failed { .. } | ConversionError::EmptyOutput)
    }
}

/// Converts an arbitrary audio container to raw mono s16le PCM.
#[async_trait]
pub trait MediaConverter: Send + Sync {
    /// Convert `input` into PCM at `sample_rate`, overwriting `output`.
    ///
    /// # Arguments
    /// * `input` - Path of the uploaded audio file
    /// * `output` - Destination for the raw PCM bytes
    /// * `sample_rate` - Output sample rate in Hz
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        sample_rate: u32,
    ) -> Result<(), ConversionError>;
}
