use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use super::base::{
    PlaybackSink, RealtimeConfig, RealtimeConnector, RealtimeError, RealtimeEvent,
    RealtimeSession, StreamHandle,
};
use super::messages::{ClientEvent, ServerEvent, SessionSettings};

type ProviderSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Buffered provider events per stream before the reader waits on the consumer
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Connector for the OpenAI realtime WebSocket API
pub struct OpenAIRealtime {
    config: RealtimeConfig,
}

impl OpenAIRealtime {
    pub fn new(config: RealtimeConfig) -> Result<Self, RealtimeError> {
        if config.api_key.trim().is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Build the WebSocket URL with the model query parameter
    fn build_websocket_url(&self) -> Result<String, RealtimeError> {
        let mut url = Url::parse(&self.config.url).map_err(|e| {
            RealtimeError::ConfigurationError(format!("Invalid WebSocket URL: {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("model", &self.config.model);
        Ok(url.to_string())
    }

    fn session_update(&self) -> Result<Message, RealtimeError> {
        let event = ClientEvent::SessionUpdate {
            session: SessionSettings::new(
                &self.config.voice,
                &self.config.transcription_model,
                self.config.create_responses,
            ),
        };
        let payload = serde_json::to_string(&event)
            .map_err(|e| RealtimeError::ProviderError(format!("Failed to encode event: {e}")))?;
        Ok(Message::Text(payload.into()))
    }
}

#[async_trait::async_trait]
impl RealtimeConnector for OpenAIRealtime {
    async fn open(
        &self,
        session_id: &str,
        playback: PlaybackSink,
    ) -> Result<RealtimeSession, RealtimeError> {
        let ws_url = self.build_websocket_url()?;

        let mut request = ws_url
            .as_str()
            .into_client_request()
            .map_err(|e| RealtimeError::ConfigurationError(format!("Invalid request: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|_| {
                RealtimeError::AuthenticationFailed("API key is not a valid header".to_string())
            })?;
        request.headers_mut().insert(AUTHORIZATION, bearer);
        request
            .headers_mut()
            .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        let (ws_stream, _) = connect_async(request).await.map_err(|e| {
            error!("Failed to connect to OpenAI realtime: {}", e);
            RealtimeError::ConnectionFailed(e.to_string())
        })?;

        let (mut ws_sink, ws_source) = ws_stream.split();
        ws_sink
            .send(self.session_update()?)
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(format!("session.update: {e}")))?;

        let stream_id = Uuid::new_v4().to_string();
        info!(
            "Realtime stream {} opened for session {}",
            stream_id, session_id
        );

        let (ws_tx, ws_rx) = mpsc::unbounded_channel::<Message>();
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let (event_tx, event_rx) = mpsc::channel::<RealtimeEvent>(EVENT_CHANNEL_CAPACITY);
        let open = Arc::new(AtomicBool::new(true));

        tokio::spawn(run_connection(
            stream_id.clone(),
            ws_sink,
            ws_source,
            ws_rx,
            shutdown_rx,
            event_tx,
            open.clone(),
        ));

        let handle = OpenAIRealtimeStream {
            id: stream_id,
            ws_sender: ws_tx,
            shutdown_tx,
            open,
            playback,
        };

        Ok(RealtimeSession {
            handle: Arc::new(handle),
            events: event_rx,
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Pump the provider socket until it ends or the handle is closed.
///
/// [`RealtimeEvent::Closed`] is always the last event sent.
async fn run_connection(
    stream_id: String,
    mut ws_sink: SplitSink<ProviderSocket, Message>,
    mut ws_source: SplitStream<ProviderSocket>,
    mut ws_rx: mpsc::UnboundedReceiver<Message>,
    mut shutdown_rx: broadcast::Receiver<()>,
    event_tx: mpsc::Sender<RealtimeEvent>,
    open: Arc<AtomicBool>,
) {
    loop {
        tokio::select! {
            Some(message) = ws_rx.recv() => {
                if let Err(e) = ws_sink.send(message).await {
                    error!("Failed to send to realtime stream {}: {}", stream_id, e);
                    let _ = event_tx.send(RealtimeEvent::Error(e.to_string())).await;
                    break;
                }
            }

            message = ws_source.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerEvent>(text.as_str()) {
                            Ok(server_event) => {
                                let event_type = server_event.event_type.clone();
                                match server_event.into_realtime_event() {
                                    Some(event) => {
                                        if event_tx.send(event).await.is_err() {
                                            debug!("Event consumer for stream {} is gone", stream_id);
                                        }
                                    }
                                    None => debug!("Ignoring realtime event: {}", event_type),
                                }
                            }
                            Err(e) => warn!("Unparseable realtime event: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!("Realtime stream {} closed by provider: {:?}", stream_id, frame);
                        break;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!("Unexpected binary message from provider: {} bytes", data.len());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("Realtime stream {} error: {}", stream_id, e);
                        let _ = event_tx.send(RealtimeEvent::Error(e.to_string())).await;
                        break;
                    }
                    None => {
                        info!("Realtime stream {} ended", stream_id);
                        break;
                    }
                }
            }

            // Also fires when every handle clone has been dropped
            _ = shutdown_rx.recv() => {
                debug!("Closing realtime stream {}", stream_id);
                let _ = ws_sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    open.store(false, Ordering::SeqCst);
    let _ = event_tx.send(RealtimeEvent::Closed).await;
    info!("Realtime stream {} connection closed", stream_id);
}

/// Handle to an open OpenAI realtime stream
pub struct OpenAIRealtimeStream {
    id: String,
    ws_sender: mpsc::UnboundedSender<Message>,
    shutdown_tx: broadcast::Sender<()>,
    open: Arc<AtomicBool>,
    playback: PlaybackSink,
}

impl StreamHandle for OpenAIRealtimeStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn push_input(&self, audio: Bytes) -> Result<(), RealtimeError> {
        if !self.is_open() {
            return Err(RealtimeError::StreamClosed);
        }
        let event = ClientEvent::InputAudioBufferAppend {
            audio: BASE64.encode(&audio),
        };
        let payload = serde_json::to_string(&event)
            .map_err(|e| RealtimeError::ProviderError(format!("Failed to encode audio: {e}")))?;
        self.ws_sender
            .send(Message::Text(payload.into()))
            .map_err(|_| RealtimeError::StreamClosed)
    }

    fn send(&self, audio: Bytes) -> Result<(), RealtimeError> {
        if !self.is_open() {
            return Err(RealtimeError::StreamClosed);
        }
        self.playback
            .send(audio)
            .map_err(|_| RealtimeError::StreamClosed)
    }

    fn close(&self) -> bool {
        if self.open.swap(false, Ordering::SeqCst) {
            let _ = self.shutdown_tx.send(());
            true
        } else {
            false
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_hdr_async;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    struct FakeProvider {
        url: String,
        headers: oneshot::Receiver<(String, Option<String>, Option<String>)>,
        received: mpsc::UnboundedReceiver<Value>,
        outgoing: mpsc::UnboundedSender<Option<Value>>,
    }

    /// Accept one realtime connection. Values pushed on `outgoing` are sent
    /// to the client; `None` closes the socket.
    async fn fake_provider() -> FakeProvider {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (headers_tx, headers_rx) = oneshot::channel();
        let (received_tx, received_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<Option<Value>>();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                let header = |name: &str| {
                    req.headers()
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string)
                };
                let _ = headers_tx.send((
                    req.uri().to_string(),
                    header("authorization"),
                    header("openai-beta"),
                ));
                Ok(resp)
            };
            let ws = accept_hdr_async(tcp, callback).await.unwrap();
            let (mut sink, mut source) = ws.split();

            loop {
                tokio::select! {
                    incoming = source.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let _ = received_tx.send(serde_json::from_str(text.as_str()).unwrap());
                        }
                        Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                        _ => {}
                    },
                    outgoing = outgoing_rx.recv() => match outgoing {
                        Some(Some(value)) => {
                            sink.send(Message::Text(value.to_string().into())).await.unwrap();
                        }
                        _ => {
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    },
                }
            }
        });

        FakeProvider {
            url: format!("ws://{addr}/v1/realtime"),
            headers: headers_rx,
            received: received_rx,
            outgoing: outgoing_tx,
        }
    }

    fn connector(url: &str) -> OpenAIRealtime {
        let mut server = ServerConfig::with_api_key("sk-test");
        server.realtime_url = url.to_string();
        OpenAIRealtime::new(RealtimeConfig::from(&server)).unwrap()
    }

    async fn next_event(events: &mut mpsc::Receiver<RealtimeEvent>) -> RealtimeEvent {
        timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[test]
    fn test_rejects_empty_api_key() {
        let server = ServerConfig::with_api_key("");
        assert!(matches!(
            OpenAIRealtime::new(RealtimeConfig::from(&server)),
            Err(RealtimeError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_websocket_url_carries_model() {
        let connector = connector("wss://api.openai.com/v1/realtime");
        assert_eq!(
            connector.build_websocket_url().unwrap(),
            "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview"
        );
    }

    #[tokio::test]
    async fn test_open_configures_session_and_forwards_events() {
        let mut provider = fake_provider().await;
        let (playback_tx, _playback_rx) = mpsc::unbounded_channel();

        let mut session = connector(&provider.url)
            .open("session-1", playback_tx)
            .await
            .unwrap();

        let (uri, auth, beta) = (&mut provider.headers).await.unwrap();
        assert!(uri.contains("model=gpt-4o-realtime-preview"));
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(beta.as_deref(), Some("realtime=v1"));

        let update = provider.received.recv().await.unwrap();
        assert_eq!(update["type"], "session.update");
        assert_eq!(update["session"]["voice"], "alloy");
        assert_eq!(update["session"]["input_audio_transcription"]["model"], "whisper-1");
        assert_eq!(update["session"]["turn_detection"]["create_response"], false);

        provider
            .outgoing
            .send(Some(json!({"type": "session.created"})))
            .unwrap();
        provider
            .outgoing
            .send(Some(json!({"type": "response.created"})))
            .unwrap();
        provider
            .outgoing
            .send(Some(json!({
                "type": "conversation.item.input_audio_transcription.completed",
                "transcript": "hello"
            })))
            .unwrap();
        provider.outgoing.send(None).unwrap();

        assert_eq!(
            next_event(&mut session.events).await,
            RealtimeEvent::Status("session.created".to_string())
        );
        assert_eq!(
            next_event(&mut session.events).await,
            RealtimeEvent::Transcript("hello".to_string())
        );
        assert_eq!(next_event(&mut session.events).await, RealtimeEvent::Closed);
        assert!(!session.handle.is_open());
    }

    #[tokio::test]
    async fn test_push_input_and_close() {
        let mut provider = fake_provider().await;
        let (playback_tx, mut playback_rx) = mpsc::unbounded_channel();

        let mut session = connector(&provider.url)
            .open("session-2", playback_tx)
            .await
            .unwrap();
        let _ = provider.received.recv().await.unwrap();

        session
            .handle
            .push_input(Bytes::from_static(&[0, 1, 2]))
            .unwrap();
        let append = provider.received.recv().await.unwrap();
        assert_eq!(append, json!({"type": "input_audio_buffer.append", "audio": "AAEC"}));

        session.handle.send(Bytes::from_static(b"mp3")).unwrap();
        assert_eq!(playback_rx.recv().await.unwrap(), Bytes::from_static(b"mp3"));

        assert!(session.handle.close());
        assert!(!session.handle.close());
        assert!(!session.handle.is_open());
        assert!(matches!(
            session.handle.push_input(Bytes::from_static(&[0])),
            Err(RealtimeError::StreamClosed)
        ));
        assert!(matches!(
            session.handle.send(Bytes::from_static(b"x")),
            Err(RealtimeError::StreamClosed)
        ));
        assert_eq!(next_event(&mut session.events).await, RealtimeEvent::Closed);
    }

    #[tokio::test]
    async fn test_open_fails_when_unreachable() {
        let (playback_tx, _playback_rx) = mpsc::unbounded_channel();
        let result = connector("ws://127.0.0.1:9/v1/realtime")
            .open("session-3", playback_tx)
            .await;
        assert!(matches!(result, Err(RealtimeError::ConnectionFailed(_))));
    }
}
