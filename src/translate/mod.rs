pub mod interface;
pub mod protocol;
pub mod live_client;

pub use interface::{collect_fragments, TranslationService, TranslationServiceError};
pub use live_client::{GeminiLiveClient, LiveSession};
