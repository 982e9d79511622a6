mod support;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use common::AppRoute;
use gateway::{
    CloseReason, Credential, ErrorKind, FilePart, Gateway, GatewayConfig, GatewayError,
    RequestDescriptor, SessionContext,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use support::{RecordingHandler, RecordingNavigator, RecordingNotifier};

fn envelope(data: serde_json::Value) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "code": 0, "message": "success", "data": data }))
}

fn bearer(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn user_info(req: HttpRequest) -> HttpResponse {
    match bearer(&req).as_deref() {
        Some("Bearer valid") => envelope(json!({ "id": 1, "userName": "alice", "role": "admin" })),
        _ => HttpResponse::Unauthorized().finish(),
    }
}

async fn echo(req: HttpRequest) -> HttpResponse {
    envelope(json!({
        "query": req.query_string(),
        "authorization": bearer(&req),
    }))
}

async fn upload(req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = String::from_utf8_lossy(&body).to_string();

    if !content_type.starts_with("multipart/form-data; boundary=")
        || !body.contains("name=\"file\"; filename=\"notes.txt\"")
    {
        return HttpResponse::BadRequest().json(json!({ "message": "expected a multipart upload" }));
    }

    envelope(json!({
        "id": 10,
        "knowledgeBaseId": 3,
        "fileName": "notes_10.txt",
        "originalName": "notes.txt",
        "fileSize": 5
    }))
}

async fn logical_failure() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "code": 2, "message": "knowledge base name taken" }))
}

async fn slow() -> HttpResponse {
    tokio::time::sleep(Duration::from_millis(1500)).await;
    envelope(json!(null))
}

async fn chat_stream(req: HttpRequest) -> HttpResponse {
    if bearer(&req).is_none() {
        return HttpResponse::Unauthorized().finish();
    }

    let chunks = vec![
        Ok::<_, actix_web::Error>(web::Bytes::from_static(b"data: he")),
        Ok(web::Bytes::from_static(b"llo\n\n")),
        Ok(web::Bytes::from_static(b"event: done\ndata: bye\n\n")),
    ];

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .streaming(futures_util::stream::iter(chunks))
}

async fn busy() -> HttpResponse {
    HttpResponse::TooManyRequests().finish()
}

async fn start_backend() -> (SocketAddr, ServerHandle) {
    let server = HttpServer::new(|| {
        App::new()
            .route("/user/info", web::get().to(user_info))
            .route("/echo", web::get().to(echo))
            .route("/knowledge-base/{id}/files", web::post().to(upload))
            .route("/knowledge-base", web::post().to(logical_failure))
            .route("/slow", web::get().to(slow))
            .route("/chat/stream", web::get().to(chat_stream))
            .route("/chat/busy", web::get().to(busy))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("Failed to bind test backend");

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_rt::spawn(server);

    (addr, handle)
}

struct Client {
    gateway: Gateway,
    notifier: Arc<RecordingNotifier>,
    navigator: Arc<RecordingNavigator>,
}

fn client(addr: SocketAddr, token: Option<&str>) -> Client {
    let config = GatewayConfig {
        base_url: format!("http://{}", addr),
        timeout_ms: 300,
        ..GatewayConfig::default()
    };

    let session = SessionContext::in_memory();
    if let Some(token) = token {
        session.set(Credential::new(token)).unwrap();
    }

    let notifier = Arc::new(RecordingNotifier::default());
    let navigator = Arc::new(RecordingNavigator::default());
    let gateway = Gateway::builder(config)
        .session(session)
        .notifier(notifier.clone())
        .navigator(navigator.clone())
        .build()
        .expect("Failed to build gateway");

    Client {
        gateway,
        notifier,
        navigator,
    }
}

#[actix_web::test]
async fn test_authenticated_call_over_http() {
    let (addr, server) = start_backend().await;
    let client = client(addr, Some("valid"));

    let info = client.gateway.users().info().await.expect("info should succeed");
    assert_eq!(info.user_name.as_deref(), Some("alice"));
    assert_eq!(info.id.as_deref(), Some("1"));

    server.stop(false).await;
}

#[actix_web::test]
async fn test_query_and_bearer_reach_backend() {
    let (addr, server) = start_backend().await;
    let client = client(addr, Some("valid"));

    let data: serde_json::Value = client
        .gateway
        .fetch(RequestDescriptor::new("/echo").query("page", 1).query("size", 10))
        .await
        .expect("echo should succeed");

    assert_eq!(data["query"], "page=1&size=10");
    assert_eq!(data["authorization"], "Bearer valid");

    server.stop(false).await;
}

#[actix_web::test]
async fn test_rejected_token_redirects_to_login() {
    let (addr, server) = start_backend().await;
    let client = client(addr, Some("abc"));

    let err = client.gateway.users().info().await.unwrap_err();

    assert!(matches!(err, GatewayError::Unauthorized));
    assert!(client.gateway.session().token().is_none());
    assert_eq!(client.notifier.notices().len(), 1);
    assert_eq!(client.navigator.routes(), vec![AppRoute::Login]);

    server.stop(false).await;
}

#[actix_web::test]
async fn test_multipart_upload_over_http() {
    let (addr, server) = start_backend().await;
    let client = client(addr, Some("valid"));

    let file = client
        .gateway
        .knowledge_bases()
        .upload_file(3, FilePart::new("file", "notes.txt", b"hello".to_vec()))
        .await
        .expect("upload should succeed");

    assert_eq!(file.id, 10);
    assert_eq!(file.original_name, "notes.txt");

    server.stop(false).await;
}

#[actix_web::test]
async fn test_logical_failure_over_http() {
    let (addr, server) = start_backend().await;
    let client = client(addr, Some("valid"));

    let err = client
        .gateway
        .post(RequestDescriptor::new("/knowledge-base"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Logical);
    assert_eq!(err.user_message(), "knowledge base name taken");

    server.stop(false).await;
}

#[actix_web::test]
async fn test_timeout_is_network_error() {
    let (addr, server) = start_backend().await;
    let client = client(addr, Some("valid"));

    let err = client
        .gateway
        .get(RequestDescriptor::new("/slow"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(client.gateway.session().token().as_deref(), Some("valid"));

    server.stop(false).await;
}

#[actix_web::test]
async fn test_event_stream_over_http() {
    let (addr, server) = start_backend().await;
    let client = client(addr, Some("valid"));
    let handler = RecordingHandler::default();

    let handle = client
        .gateway
        .chat()
        .chat_stream("hi", handler.clone())
        .await
        .expect("stream should open");

    assert_eq!(handle.closed().await, CloseReason::Completed);

    let events = handler.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].data, "hello");
    assert_eq!(events[1].event, "done");
    assert_eq!(handler.close_count(), 1);

    server.stop(false).await;
}

#[actix_web::test]
async fn test_stream_rejections_over_http() {
    let (addr, server) = start_backend().await;

    let anonymous = client(addr, None);
    let err = anonymous
        .gateway
        .chat()
        .chat_stream("hi", RecordingHandler::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unauthorized));

    let busy = client(addr, Some("valid"));
    let err = busy
        .gateway
        .get_stream(RequestDescriptor::new("/chat/busy"), RecordingHandler::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(429));
    assert!(err.is_retriable());

    server.stop(false).await;
}

/// Answers one request with a 401 whose body stops short of its
/// content-length.
async fn start_truncating_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test backend");
    let addr = listener.local_addr().expect("Failed to read local address");

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("Failed to accept");

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }

        let _ = socket
            .write_all(b"HTTP/1.1 401 Unauthorized\r\ncontent-length: 64\r\n\r\n{\"mes")
            .await;
        let _ = socket.shutdown().await;
    });

    addr
}

#[tokio::test]
async fn test_truncated_unauthorized_body_still_expires_session() {
    let addr = start_truncating_backend().await;
    let client = client(addr, Some("abc"));

    let err = client.gateway.users().info().await.unwrap_err();

    assert!(matches!(err, GatewayError::Unauthorized));
    assert!(client.gateway.session().token().is_none());
    assert_eq!(client.navigator.routes(), vec![AppRoute::Login]);
}
