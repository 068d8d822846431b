//! Drive the router directly, without a listening socket.

mod common;

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use futures_util::stream;
use tower::ServiceExt;

use api_relay::config::{ProxyConfig, UpstreamConfig};
use api_relay::{HttpServer, Recorder};
use common::{start_backend, Reply};

fn config_for(upstream: std::net::SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.upstream = UpstreamConfig::new(format!("http://{}", upstream), Some("sk-router".into()));
    config.upstream.use_system_proxy = false;
    config.logging.log_to_stdout = false;
    config
}

#[tokio::test]
async fn test_broken_request_body_returns_500_without_forwarding() {
    let (backend, mut seen) = start_backend(Reply::json("{}")).await;
    let server = HttpServer::new(config_for(backend), Arc::new(Recorder::disabled())).unwrap();
    let in_flight = server.in_flight();

    let body = Body::from_stream(stream::iter(vec![
        Ok::<_, std::io::Error>(Bytes::from_static(b"{\"partial\":")),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client went away")),
    ]));
    let request = Request::post("/chat/completions").body(body).unwrap();

    let response = server.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&text[..], b"Error reading request body\n");

    assert!(seen.try_recv().is_err());
    assert_eq!(in_flight.active(), 0);
}

#[tokio::test]
async fn test_every_method_and_path_is_relayed() {
    let (backend, mut seen) = start_backend(Reply::json("{}")).await;
    let server = HttpServer::new(config_for(backend), Arc::new(Recorder::disabled())).unwrap();

    for (method, uri, line) in [
        ("GET", "/", "GET / HTTP/1.1"),
        ("DELETE", "/files/file-1", "DELETE /files/file-1 HTTP/1.1"),
        ("PATCH", "/a/b/c?x=1&y=2", "PATCH /a/b/c?x=1&y=2 HTTP/1.1"),
    ] {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = server.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let upstream = seen.recv().await.unwrap();
        assert_eq!(upstream.request_line, line);
        assert_eq!(upstream.header("authorization"), vec!["Bearer sk-router"]);
    }
}
