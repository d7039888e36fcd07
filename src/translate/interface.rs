//! Translation interface: the live streaming client implements it, tests fake it.

use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslationServiceError {
    #[error("Failed to connect to translation service: {0}")]
    Connect(String),

    #[error("Translation stream failed: {0}")]
    Transport(String),

    #[error("Unexpected message from translation service: {0}")]
    Protocol(String),

    #[error("Translation service closed the session ({code}): {reason}")]
    Closed { code: u16, reason: String },

    #[error("Translation service ended the session before setup completed")]
    SetupRejected,
}

#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Translate one PCM payload in a fresh streaming session.
    ///
    /// # Arguments
    /// * `pcm` - Mono s16le audio at the configured sample rate
    /// * `instruction` - System instruction naming the target language
    ///
    /// # Returns
    /// Every text fragment the service emitted, concatenated in arrival order.
    /// The text is not trimmed.
    async fn translate(
        &self,
        pcm: &[u8],
        instruction: &str,
    ) -> Result<String, TranslationServiceError>;
}

/// Drain a fragment stream to completion and join the fragments without a separator.
///
/// Any error aborts the fold, so a partially received translation is never returned.
pub async fn collect_fragments<S, E>(fragments: S) -> Result<String, E>
where
    S: Stream<Item = Result<String, E>>,
{
    fragments
        .try_fold(String::new(), |mut text, fragment| async move {
            text.push_str(&fragment);
            Ok(text)
        })
        .await
}
