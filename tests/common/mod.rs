#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::Request;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::stream;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use audio_translator::audio::{ConversionError, MediaConverter};
use audio_translator::settings::Settings;
use audio_translator::translate::{collect_fragments, TranslationService, TranslationServiceError};

const BOUNDARY: &str = "translate-test-boundary";

pub fn test_settings(temp_dir: &Path) -> Settings {
    Settings {
        gemini_api_key: "test-key".to_string(),
        temp_dir: Some(temp_dir.to_path_buf()),
        ..Settings::default()
    }
}

/// Build a multipart `POST /translate` request; `None` leaves a field out.
pub fn translate_request(audio: Option<(&str, &[u8])>, target_language: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    if let Some((filename, bytes)) = audio {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"audio_file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(code) = target_language {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"target_language\"\r\n\r\n{}\r\n",
                BOUNDARY, code
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/translate")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Wait for the post-response cleanup to empty `dir`.
pub async fn wait_for_empty_dir(dir: &Path) -> bool {
    for _ in 0..100 {
        if std::fs::read_dir(dir).unwrap().next().is_none() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

pub enum ConvertBehaviour {
    Write(Vec<u8>),
    Malformed,
    Unavailable,
    Stall,
}

pub struct FakeConverter {
    behaviour: ConvertBehaviour,
    delay: Duration,
    pub inputs: Mutex<Vec<PathBuf>>,
    pub calls: AtomicUsize,
}

impl FakeConverter {
    pub fn new(behaviour: ConvertBehaviour) -> Arc<Self> {
        Self::with_delay(behaviour, Duration::ZERO)
    }

    pub fn with_delay(behaviour: ConvertBehaviour, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            delay,
            inputs: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaConverter for FakeConverter {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        _sample_rate: u32,
    ) -> Result<(), ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(input.to_path_buf());
        assert!(input.exists(), "upload should be staged before conversion");
        tokio::time::sleep(self.delay).await;

        match &self.behaviour {
            ConvertBehaviour::Write(bytes) => {
                tokio::fs::write(output, bytes).await.unwrap();
                Ok(())
            }
            ConvertBehaviour::Malformed => Err(ConversionError::Failed {
                status: Some(1),
                detail: "Invalid data found when processing input".to_string(),
            }),
            ConvertBehaviour::Unavailable => Err(ConversionError::Spawn(std::io::Error::from(
                std::io::ErrorKind::NotFound,
            ))),
            ConvertBehaviour::Stall => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            }
        }
    }
}

pub struct FakeTranslator {
    fragments: Vec<&'static str>,
    fail_after_fragments: bool,
    stall: bool,
    pub calls: Mutex<Vec<(Vec<u8>, String)>>,
}

impl FakeTranslator {
    pub fn replying(fragments: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            fragments,
            fail_after_fragments: false,
            stall: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_after(fragments: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            fragments,
            fail_after_fragments: true,
            stall: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Never answers within any test's timeout.
    pub fn stalling() -> Arc<Self> {
        Arc::new(Self {
            fragments: Vec::new(),
            fail_after_fragments: false,
            stall: true,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TranslationService for FakeTranslator {
    async fn translate(
        &self,
        pcm: &[u8],
        instruction: &str,
    ) -> Result<String, TranslationServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push((pcm.to_vec(), instruction.to_string()));
        if self.stall {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }

        let mut items: Vec<Result<String, TranslationServiceError>> = self
            .fragments
            .iter()
            .map(|f| Ok(f.to_string()))
            .collect();
        if self.fail_after_fragments {
            items.push(Err(TranslationServiceError::Transport(
                "connection reset by peer".to_string(),
            )));
        }
        collect_fragments(stream::iter(items)).await
    }
}

/// What the in-process live server does once the client has finished sending audio.
#[derive(Clone)]
pub enum LiveScript {
    Reply(Vec<&'static str>),
    FailAfter(Vec<&'static str>, u16),
    RejectSetup(u16, &'static str),
}

#[derive(Clone)]
struct LiveState {
    script: LiveScript,
    received: Arc<Mutex<Vec<Value>>>,
    api_keys: Arc<Mutex<Vec<String>>>,
}

/// Websocket server speaking the BidiGenerateContent message shapes.
pub struct MockLiveServer {
    pub endpoint: String,
    pub received: Arc<Mutex<Vec<Value>>>,
    pub api_keys: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl MockLiveServer {
    pub async fn start(script: LiveScript) -> Self {
        let state = LiveState {
            script,
            received: Arc::new(Mutex::new(Vec::new())),
            api_keys: Arc::new(Mutex::new(Vec::new())),
        };
        let received = state.received.clone();
        let api_keys = state.api_keys.clone();

        let app = Router::new().route("/live", get(upgrade)).with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server run");
        });

        Self {
            endpoint: format!("ws://{}/live", addr),
            received,
            api_keys,
            handle,
        }
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

impl Drop for MockLiveServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<LiveState>,
) -> Response {
    if let Some(key) = params.get("key") {
        state.api_keys.lock().unwrap().push(key.clone());
    }
    ws.on_upgrade(move |socket| run_script(socket, state))
}

async fn run_script(mut socket: WebSocket, state: LiveState) {
    let Some(Ok(WsMessage::Text(setup))) = socket.recv().await else {
        return;
    };
    state
        .received
        .lock()
        .unwrap()
        .push(serde_json::from_str(&setup).unwrap_or(Value::Null));

    let (fragments, failure) = match &state.script {
        LiveScript::RejectSetup(code, reason) => {
            let _ = socket
                .send(WsMessage::Close(Some(CloseFrame {
                    code: *code,
                    reason: (*reason).into(),
                })))
                .await;
            return;
        }
        LiveScript::Reply(fragments) => (fragments.clone(), None),
        LiveScript::FailAfter(fragments, code) => (fragments.clone(), Some(*code)),
    };

    if socket
        .send(WsMessage::Text(json!({"setupComplete": {}}).to_string()))
        .await
        .is_err()
    {
        return;
    }

    while let Some(Ok(WsMessage::Text(text))) = socket.recv().await {
        let value: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        let finished = value["realtimeInput"]["audioStreamEnd"] == json!(true);
        state.received.lock().unwrap().push(value);
        if finished {
            break;
        }
    }

    for fragment in fragments {
        let payload = json!({"serverContent": {"modelTurn": {"parts": [{"text": fragment}]}}});
        let _ = socket
            .send(WsMessage::Binary(payload.to_string().into_bytes()))
            .await;
    }

    match failure {
        Some(code) => {
            let _ = socket
                .send(WsMessage::Close(Some(CloseFrame {
                    code,
                    reason: "internal error".into(),
                })))
                .await;
        }
        None => {
            let done = json!({"serverContent": {"turnComplete": true}});
            let _ = socket.send(WsMessage::Text(done.to_string())).await;
            while let Some(Ok(message)) = socket.recv().await {
                if matches!(message, WsMessage::Close(_)) {
                    break;
                }
            }
        }
    }
}
