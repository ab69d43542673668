//! HTTP/WebSocket server
//!
//! Routes:
//!
//! | Method | Path              | Purpose                               |
//! |--------|-------------------|---------------------------------------|
//! | GET    | `/`               | Viewer page                           |
//! | GET    | `/video`          | WebSocket, base64 JPEG text frames    |
//! | GET    | `/audio`          | WebSocket, binary S16LE PCM chunks    |
//! | POST   | `/control/start`  | Start capture (always 200)            |
//! | POST   | `/control/stop`   | Stop capture (always 200)             |
//! | GET    | `/control/status` | JSON status snapshot                  |

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::registry::{StreamChannel, SubscriberRegistry};
use crate::server::config::ServerConfig;
use crate::server::connection::serve_viewer;
use crate::server::controller::{StreamController, StreamStatus};

const VIEWER_PAGE: &str = include_str!("../../assets/viewer.html");

/// Shared handler state
#[derive(Clone)]
struct AppState {
    controller: Arc<StreamController>,
    registry: Arc<SubscriberRegistry>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

/// Capture-to-WebSocket broadcast server
pub struct StreamServer {
    config: ServerConfig,
    registry: Arc<SubscriberRegistry>,
    controller: Arc<StreamController>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl StreamServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(SubscriberRegistry::with_config(config.registry.clone()));
        let controller = Arc::new(StreamController::new(
            config.capture.clone(),
            Arc::clone(&registry),
        ));

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            registry,
            controller,
            connection_semaphore,
        }
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Get a reference to the stream controller
    pub fn controller(&self) -> &Arc<StreamController> {
        &self.controller
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Build the HTTP router
    pub fn router(&self) -> Router {
        let state = AppState {
            controller: Arc::clone(&self.controller),
            registry: Arc::clone(&self.registry),
            connection_semaphore: self.connection_semaphore.clone(),
        };

        Router::new()
            .route("/", get(index))
            .route("/video", get(video_socket))
            .route("/audio", get(audio_socket))
            .route("/control/start", post(start_stream))
            .route("/control/stop", post(stop_stream))
            .route("/control/status", get(stream_status))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    ///
    /// When `shutdown` resolves, capture is stopped, every capture process is
    /// reaped and all viewers are disconnected before in-flight requests are
    /// drained.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "Stream server listening");

        let controller = Arc::clone(&self.controller);
        let registry = Arc::clone(&self.registry);
        let teardown = async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
            controller.shutdown().await;
            registry.close_all().await;
        };

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(teardown)
            .await?;

        Ok(())
    }
}

async fn index() -> Html<&'static str> {
    Html(VIEWER_PAGE)
}

async fn video_socket(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    upgrade(state, StreamChannel::Video, peer, ws)
}

async fn audio_socket(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    upgrade(state, StreamChannel::Audio, peer, ws)
}

fn upgrade(
    state: AppState,
    channel: StreamChannel,
    peer: SocketAddr,
    ws: WebSocketUpgrade,
) -> Response {
    // Check connection limit
    let permit = if let Some(ref sem) = state.connection_semaphore {
        match sem.clone().try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(channel = %channel, peer = %peer, "Viewer rejected: limit reached");
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
        }
    } else {
        None
    };

    tracing::debug!(channel = %channel, peer = %peer, "Viewer connecting");

    ws.on_upgrade(move |socket| async move {
        let _permit = permit;
        serve_viewer(socket, channel, peer, state.registry).await;
    })
}

async fn start_stream(State(state): State<AppState>) -> StatusCode {
    state.controller.start().await;
    StatusCode::OK
}

async fn stop_stream(State(state): State<AppState>) -> StatusCode {
    state.controller.stop().await;
    StatusCode::OK
}

async fn stream_status(State(state): State<AppState>) -> Json<StreamStatus> {
    Json(state.controller.status().await)
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request};
    use bytes::Bytes;
    use futures::StreamExt;
    use http_body_util::BodyExt;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;
    use tower::ServiceExt;

    use super::*;
    use crate::capture::{CaptureCommand, CaptureConfig};
    use crate::registry::BroadcastFrame;

    fn test_server() -> StreamServer {
        let sleep = CaptureCommand::new("sh").args(["-c", "exec sleep 30"]);
        let capture = CaptureConfig::default().video(sleep.clone()).audio(sleep);
        StreamServer::new(ServerConfig::default().capture(capture))
    }

    async fn wait_for_subscribers(
        registry: &SubscriberRegistry,
        channel: StreamChannel,
        expected: usize,
    ) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while registry.subscriber_count(channel).await != expected {
            assert!(
                tokio::time::Instant::now() < deadline,
                "{} subscribers never reached {}",
                channel,
                expected
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_control_start_stop() {
        let server = test_server();

        let response = server
            .router()
            .oneshot(request(Method::POST, "/control/start"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(server.controller().is_active().await);

        // Duplicate start still reports success
        let response = server
            .router()
            .oneshot(request(Method::POST, "/control/start"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = server
            .router()
            .oneshot(request(Method::POST, "/control/stop"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!server.controller().is_active().await);

        server.controller().shutdown().await;
    }

    #[tokio::test]
    async fn test_control_requires_post() {
        let server = test_server();

        let response = server
            .router()
            .oneshot(request(Method::GET, "/control/start"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(!server.controller().is_active().await);
    }

    #[tokio::test]
    async fn test_status_json() {
        let server = test_server();

        let response = server
            .router()
            .oneshot(request(Method::GET, "/control/status"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["active"], false);
        assert_eq!(json["video"]["subscribers"], 0);
        assert_eq!(json["audio"]["running"], false);
    }

    #[tokio::test]
    async fn test_index_page() {
        let server = test_server();

        let response = server
            .router()
            .oneshot(request(Method::GET, "/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains("/control/start"));
        assert!(page.contains("/video"));
    }

    #[tokio::test]
    async fn test_serve_shuts_down_capture() {
        let server = test_server();
        let controller = Arc::clone(server.controller());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        controller.start().await;
        crate::testing::eventually(|| controller.stats(StreamChannel::Video).is_running()).await;

        let shutdown = async move {
            let _ = rx.await;
        };
        let serving = async {
            server.serve(listener, shutdown).await
        };
        let trigger = async {
            tx.send(()).unwrap();
        };

        let (result, ()) = tokio::join!(serving, trigger);
        assert!(result.is_ok());
        assert!(!controller.is_active().await);
        assert!(!controller.stats(StreamChannel::Video).is_running());
        assert!(!controller.stats(StreamChannel::Audio).is_running());
    }

    #[tokio::test]
    async fn test_viewer_sockets_deliver_and_unsubscribe() {
        let server = test_server();
        let registry = Arc::clone(server.registry());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let serving = tokio::spawn(async move {
            let shutdown = async move {
                let _ = rx.await;
            };
            server.serve(listener, shutdown).await
        });

        let (mut video, _) = connect_async(format!("ws://{}/video", addr)).await.unwrap();
        let (mut audio, _) = connect_async(format!("ws://{}/audio", addr)).await.unwrap();
        wait_for_subscribers(&registry, StreamChannel::Video, 1).await;
        wait_for_subscribers(&registry, StreamChannel::Audio, 1).await;

        let jpeg = Bytes::from_static(&[0xFF, 0xD8, 0x61, 0x62, 0xFF, 0xD9]);
        let outcome = registry.broadcast(&BroadcastFrame::video(0, jpeg)).await;
        assert_eq!(outcome.delivered, 1);
        let pcm = Bytes::from_static(&[0x01, 0x00, 0xFF, 0x7F]);
        let outcome = registry.broadcast(&BroadcastFrame::audio(0, pcm)).await;
        assert_eq!(outcome.delivered, 1);

        match video.next().await {
            Some(Ok(Message::Text(text))) => assert_eq!(text.as_str(), "/9hhYv/Z"),
            other => panic!("expected a text frame, got {:?}", other),
        }
        match audio.next().await {
            Some(Ok(Message::Binary(data))) => assert_eq!(&data[..], &[0x01, 0x00, 0xFF, 0x7F]),
            other => panic!("expected a binary frame, got {:?}", other),
        }

        // Disconnecting is unsubscribing
        drop(video);
        wait_for_subscribers(&registry, StreamChannel::Video, 0).await;
        assert_eq!(registry.subscriber_count(StreamChannel::Audio).await, 1);

        audio.close(None).await.unwrap();
        wait_for_subscribers(&registry, StreamChannel::Audio, 0).await;

        tx.send(()).unwrap();
        assert!(serving.await.unwrap().is_ok());
    }
}
