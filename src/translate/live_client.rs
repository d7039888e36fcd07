use std::fmt;

use async_trait::async_trait;
use futures::{stream, SinkExt, Stream, StreamExt, TryStreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::interface::{collect_fragments, TranslationService, TranslationServiceError};
use super::protocol::{ClientMessage, ServerMessage};
use crate::settings::Settings;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client for the Gemini Live bidirectional streaming API.
///
/// Every call to [`TranslationService::translate`] opens its own session; nothing
/// is pooled or reused between requests.
#[derive(Clone)]
pub struct GeminiLiveClient {
    endpoint: String,
    api_key: String,
    model: String,
    response_modalities: Vec<String>,
    mime_type: String,
}

impl GeminiLiveClient {
    pub fn new(
        endpoint: String,
        api_key: String,
        model: String,
        response_modalities: Vec<String>,
        sample_rate: u32,
    ) -> Self {
        info!("Initialized GeminiLiveClient: model={}, endpoint={}", model, endpoint);
        Self {
            endpoint,
            api_key,
            model,
            response_modalities,
            mime_type: format!("audio/pcm;rate={}", sample_rate),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.gemini_endpoint.clone(),
            settings.gemini_api_key.clone(),
            settings.gemini_model.clone(),
            settings.gemini_response_modalities.clone(),
            settings.pcm_sample_rate,
        )
    }

    fn session_url(&self) -> String {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        format!("{}{}key={}", self.endpoint, separator, self.api_key)
    }

    /// Open a session and complete the setup handshake.
    pub async fn connect(&self, instruction: &str) -> Result<LiveSession, TranslationServiceError> {
        let (socket, _) = connect_async(self.session_url())
            .await
            .map_err(|e| TranslationServiceError::Connect(e.to_string()))?;

        let mut session = LiveSession { socket };
        session
            .send(&ClientMessage::setup(
                &self.model,
                &self.response_modalities,
                instruction,
            ))
            .await?;
        session.await_setup_complete().await?;
        debug!("Live session ready for model {}", self.model);
        Ok(session)
    }
}

impl fmt::Debug for GeminiLiveClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiLiveClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("response_modalities", &self.response_modalities)
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

#[async_trait]
impl TranslationService for GeminiLiveClient {
    async fn translate(
        &self,
        pcm: &[u8],
        instruction: &str,
    ) -> Result<String, TranslationServiceError> {
        info!("Getting translation for {} bytes of PCM", pcm.len());

        let mut session = self.connect(instruction).await?;
        let outcome = session.exchange(pcm, &self.mime_type).await;
        session.close().await;
        outcome
    }
}

/// One open streaming session. Dropping it drops the socket.
pub struct LiveSession {
    socket: Socket,
}

impl LiveSession {
    async fn send(&mut self, message: &ClientMessage) -> Result<(), TranslationServiceError> {
        let payload = serde_json::to_string(message)
            .map_err(|e| TranslationServiceError::Protocol(e.to_string()))?;
        self.socket
            .send(Message::Text(payload))
            .await
            .map_err(|e| TranslationServiceError::Transport(e.to_string()))
    }

    async fn await_setup_complete(&mut self) -> Result<(), TranslationServiceError> {
        loop {
            match next_server_message(&mut self.socket).await? {
                Some(message) if message.setup_complete.is_some() => return Ok(()),
                Some(_) => continue,
                None => return Err(TranslationServiceError::SetupRejected),
            }
        }
    }

    pub async fn send_media(
        &mut self,
        data: &[u8],
        mime_type: &str,
    ) -> Result<(), TranslationServiceError> {
        self.send(&ClientMessage::media(data, mime_type)).await
    }

    pub async fn end_audio_stream(&mut self) -> Result<(), TranslationServiceError> {
        self.send(&ClientMessage::audio_stream_end()).await
    }

    /// Text fragments of the model's turn, ending when the turn completes or the
    /// server closes the session normally.
    pub fn receive(&mut self) -> impl Stream<Item = Result<String, TranslationServiceError>> + '_ {
        stream::unfold(Some(&mut self.socket), |socket| async move {
            let socket = socket?;
            loop {
                match next_server_message(socket).await {
                    Err(err) => return Some((Err(err), None)),
                    Ok(None) => return None,
                    Ok(Some(message)) => {
                        let finished = message.is_turn_complete();
                        match message.text() {
                            Some(text) => {
                                let next = if finished { None } else { Some(socket) };
                                return Some((Ok(text), next));
                            }
                            None if finished => return None,
                            None => continue,
                        }
                    }
                }
            }
        })
    }

    /// Send the whole payload, mark the end of input, and gather the reply.
    pub async fn exchange(
        &mut self,
        pcm: &[u8],
        mime_type: &str,
    ) -> Result<String, TranslationServiceError> {
        self.send_media(pcm, mime_type).await?;
        self.end_audio_stream().await?;

        collect_fragments(
            self.receive()
                .inspect_ok(|fragment| debug!("Translation fragment: {:?}", fragment)),
        )
        .await
    }

    pub async fn close(mut self) {
        if let Err(e) = self.socket.close(None).await {
            debug!("Live session already closed: {}", e);
        }
    }
}

async fn next_server_message(
    socket: &mut Socket,
) -> Result<Option<ServerMessage>, TranslationServiceError> {
    while let Some(frame) = socket.next().await {
        let frame = frame.map_err(|e| TranslationServiceError::Transport(e.to_string()))?;
        let payload = match frame {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(bytes) => bytes,
            Message::Close(frame) => return close_outcome(frame).map(|()| None),
            _ => continue,
        };

        let message: ServerMessage = serde_json::from_slice(&payload)
            .map_err(|e| TranslationServiceError::Protocol(e.to_string()))?;
        if message.go_away.is_some() {
            warn!("Translation service announced it will close the session soon");
        }
        return Ok(Some(message));
    }
    Ok(None)
}

fn close_outcome(frame: Option<CloseFrame<'_>>) -> Result<(), TranslationServiceError> {
    match frame {
        Some(frame) if frame.code != CloseCode::Normal => Err(TranslationServiceError::Closed {
            code: frame.code.into(),
            reason: frame.reason.to_string(),
        }),
        _ => Ok(()),
    }
}
