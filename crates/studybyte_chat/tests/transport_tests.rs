//! Integration tests for the streaming and fallback transports against
//! in-process servers on loopback.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use studybyte_chat::{
    ChatRequest, ClientConfig, ExchangeOutcome, FailureKind, HttpTransport, ServerFrame,
    SessionController, StreamEvent, StreamMetadata, TransportKind,
};

/// Serve one WebSocket exchange: read the request, send `frames`, and
/// optionally close before the client does.
async fn spawn_ws_server(frames: Vec<String>, close_after: bool) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let request = match ws.next().await {
            Some(Ok(WsMessage::Text(text))) => text,
            other => panic!("expected request frame, got {:?}", other),
        };

        for frame in frames {
            ws.send(WsMessage::Text(frame)).await.unwrap();
        }
        if close_after {
            let _ = ws.close(None).await;
        }
        while let Some(Ok(_)) = ws.next().await {}
        request
    });

    (format!("ws://{}", addr), handle)
}

fn frame(frame: ServerFrame) -> String {
    serde_json::to_string(&frame).unwrap()
}

fn streaming_config(ws_url: &str) -> ClientConfig {
    ClientConfig {
        ws_url: ws_url.to_string(),
        ..ClientConfig::development()
    }
}

/// Read one HTTP request including its body.
async fn read_http_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let body_len = text[..end]
                .lines()
                .find_map(|line| {
                    line.to_ascii_lowercase()
                        .strip_prefix("content-length:")
                        .map(|v| v.trim().parse::<usize>().unwrap())
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Serve one HTTP request with a fixed status line and JSON body.
async fn spawn_http_server(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_http_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
        request
    });

    (format!("http://{}", addr), handle)
}

fn fallback_config(api_url: &str, timeout_secs: u64) -> ClientConfig {
    ClientConfig {
        api_url: api_url.to_string(),
        streaming: false,
        timeout_secs,
        ..ClientConfig::development()
    }
}

/// An address nothing listens on.
async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

#[tokio::test]
async fn test_streaming_exchange_accumulates_aggregate() {
    let frames = vec![
        frame(ServerFrame::Stream {
            content: "Hi".into(),
            full_content: Some("Hi".into()),
            metadata: None,
        }),
        frame(ServerFrame::Stream {
            content: " there".into(),
            full_content: Some("Hi there".into()),
            metadata: None,
        }),
        frame(ServerFrame::End {
            content: "Hi there".into(),
            metadata: Some(StreamMetadata {
                rag_context: Some("Abstract reasoning notes".into()),
                tool_calls: Vec::new(),
            }),
        }),
    ];
    let (url, server) = spawn_ws_server(frames, false).await;

    let mut session = SessionController::from_config(&streaming_config(&url)).unwrap();
    assert_eq!(session.transport_kind(), TransportKind::Streaming);

    let mut updates = Vec::new();
    let outcome = session
        .send("hello", Some("UCAT prep".into()), |m| updates.push(m.content.clone()))
        .await
        .unwrap();

    assert_eq!(outcome, ExchangeOutcome::Completed);
    assert_eq!(updates, vec!["Hi", "Hi there", "Hi there"]);

    let reply = session.last_assistant().unwrap();
    assert_eq!(reply.content, "Hi there");
    assert_eq!(
        reply.metadata.as_ref().and_then(|m| m.rag_context.as_deref()),
        Some("Abstract reasoning notes")
    );

    let request: ChatRequest = serde_json::from_str(&server.await.unwrap()).unwrap();
    assert_eq!(request, ChatRequest::new("hello", Some("UCAT prep".into())));
}

#[tokio::test]
async fn test_streaming_error_frame_fails_exchange() {
    let frames = vec![frame(ServerFrame::Error {
        content: "DeepSeek API unavailable".into(),
    })];
    let (url, _server) = spawn_ws_server(frames, false).await;

    let mut session = SessionController::from_config(&streaming_config(&url)).unwrap();
    let outcome = session.send("q", None, |_| {}).await.unwrap();

    let ExchangeOutcome::Failed(failure) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FailureKind::ServerReported);
    assert_eq!(
        session.last_assistant().unwrap().content,
        "Error: DeepSeek API unavailable"
    );
}

#[tokio::test]
async fn test_streaming_malformed_frame_is_protocol_error() {
    let frames = vec![
        frame(ServerFrame::Stream {
            content: "ok".into(),
            full_content: Some("ok".into()),
            metadata: None,
        }),
        r#"{"kind":"stream"}"#.to_string(),
    ];
    let (url, _server) = spawn_ws_server(frames, true).await;

    let mut session = SessionController::from_config(&streaming_config(&url)).unwrap();
    let outcome = session.send("q", None, |_| {}).await.unwrap();

    let ExchangeOutcome::Failed(failure) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FailureKind::Protocol);
}

#[tokio::test]
async fn test_streaming_early_close_is_protocol_error() {
    let frames = vec![frame(ServerFrame::Stream {
        content: "partial".into(),
        full_content: Some("partial".into()),
        metadata: None,
    })];
    let (url, _server) = spawn_ws_server(frames, true).await;

    let mut session = SessionController::from_config(&streaming_config(&url)).unwrap();
    let handle = session.start("q", None).unwrap();
    let events: Vec<StreamEvent> = handle.collect().await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StreamEvent::chunk("partial", "partial"));
    assert!(matches!(
        &events[1],
        StreamEvent::Error(failure) if failure.kind == FailureKind::Protocol
    ));
}

#[tokio::test]
async fn test_streaming_unavailable_does_not_fall_back() {
    let url = format!("ws://{}", closed_port().await);
    let mut session = SessionController::from_config(&streaming_config(&url)).unwrap();

    let outcome = session.send("q", None, |_| {}).await.unwrap();
    let ExchangeOutcome::Failed(failure) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FailureKind::TransportUnavailable);
    assert!(session.last_assistant().unwrap().content.starts_with("Error: "));
}

#[tokio::test]
async fn test_fallback_synthesizes_chunk_then_end() {
    let (url, server) = spawn_http_server("200 OK", r#"{"answer":"X"}"#).await;
    let mut session = SessionController::from_config(&fallback_config(&url, 5)).unwrap();
    assert_eq!(session.transport_kind(), TransportKind::SingleRequest);

    let handle = session.start("question", Some("notes".into())).unwrap();
    let events: Vec<StreamEvent> = handle.collect().await;
    assert_eq!(events, vec![StreamEvent::chunk("X", "X"), StreamEvent::end("X")]);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /chat/with-context "));
    assert!(request.ends_with(r#"{"message":"question","context":"notes"}"#));
}

#[tokio::test]
async fn test_fallback_reply_updates_message() {
    let (url, _server) = spawn_http_server("200 OK", r#"{"answer":"**Tip:** pace yourself","context":"timing"}"#).await;
    let mut session = SessionController::from_config(&fallback_config(&url, 5)).unwrap();

    let outcome = session.send("q", None, |_| {}).await.unwrap();
    assert!(outcome.is_success());

    let reply = session.last_assistant().unwrap();
    assert_eq!(reply.content, "**Tip:** pace yourself");
    assert_eq!(
        reply.metadata.as_ref().and_then(|m| m.rag_context.as_deref()),
        Some("timing")
    );
}

#[tokio::test]
async fn test_fallback_error_detail() {
    let (url, _server) = spawn_http_server("500 Internal Server Error", r#"{"detail":"API key not configured"}"#).await;
    let mut session = SessionController::from_config(&fallback_config(&url, 5)).unwrap();

    let outcome = session.send("q", None, |_| {}).await.unwrap();
    let ExchangeOutcome::Failed(failure) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FailureKind::ServerReported);
    assert_eq!(session.last_assistant().unwrap().content, "Error: API key not configured");
}

#[tokio::test]
async fn test_fallback_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let _server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        drop(stream);
    });

    let mut session = SessionController::from_config(&fallback_config(&url, 1)).unwrap();
    let outcome = session.send("q", None, |_| {}).await.unwrap();

    let ExchangeOutcome::Failed(failure) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn test_fallback_connection_refused() {
    let url = format!("http://{}", closed_port().await);
    let mut session = SessionController::from_config(&fallback_config(&url, 5)).unwrap();

    let outcome = session.send("q", None, |_| {}).await.unwrap();
    let ExchangeOutcome::Failed(failure) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FailureKind::TransportUnavailable);
    assert_eq!(
        failure.message,
        "Connection failed. Please check if the server is running."
    );
}

#[tokio::test]
async fn test_health_endpoint() {
    let (url, server) = spawn_http_server("200 OK", r#"{"status":"healthy","message":"API is running"}"#).await;
    let transport = HttpTransport::new(&fallback_config(&url, 5)).unwrap();

    let health = transport.health().await.unwrap();
    assert!(health.is_healthy());
    assert_eq!(health.message, "API is running");
    assert!(server.await.unwrap().starts_with("GET / "));
}
