//! End-to-end HTTP/1.1 client/server round trips over an in-memory duplex
//! pipe, grounded on the `tokio::io::duplex` loopback idiom this crate
//! already uses for its WebSocket connection tests (`ws::connection`).

use bytes::Bytes;
use httpcore::client::connection::{ConnectionHandle, Protocol};
use httpcore::client::{into_body_bytes, request};
use httpcore::config::{H1Config, H2Config};
use httpcore::server;

#[tokio::test]
async fn get_request_returns_server_response() {
    let (client_io, server_io) = tokio::io::duplex(8192);

    let server_task = tokio::spawn(async move {
        server::serve(server_io, Protocol::Http1, H1Config::default(), H2Config::default(), |req| async move {
            assert_eq!(req.method.as_str(), "GET");
            let mut response = httpcore::HttpResponse::new(200, req.version);
            response.entity = httpcore::Entity::Strict(httpcore::entity::StrictEntity {
                content_type: httpcore::entity::ContentType::None,
                body: Bytes::from_static(b"hello"),
            });
            response
        })
        .await
    });

    let handle = ConnectionHandle::spawn(client_io, Protocol::Http1, H1Config::default(), H2Config::default())
        .await
        .unwrap();
    let uri = httpcore::Uri::parse_absolute("http://example.com/greet").unwrap();
    let response = handle.submit(request::get(uri)).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(into_body_bytes(response).await.unwrap(), Bytes::from_static(b"hello"));

    drop(handle);
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn post_request_delivers_body_to_handler() {
    let (client_io, server_io) = tokio::io::duplex(8192);

    let server_task = tokio::spawn(async move {
        server::serve(server_io, Protocol::Http1, H1Config::default(), H2Config::default(), |req| async move {
            let body = match &req.entity {
                httpcore::Entity::Strict(s) => s.body.clone(),
                _ => Bytes::new(),
            };
            assert_eq!(body, Bytes::from_static(b"payload"));
            httpcore::HttpResponse::new(204, req.version)
        })
        .await
    });

    let handle = ConnectionHandle::spawn(client_io, Protocol::Http1, H1Config::default(), H2Config::default())
        .await
        .unwrap();
    let uri = httpcore::Uri::parse_absolute("http://example.com/submit").unwrap();
    let req = request::post(uri, "text/plain", Bytes::from_static(b"payload"));
    let response = handle.submit(req).await.unwrap();
    assert_eq!(response.status, 204);

    drop(handle);
    server_task.await.unwrap().unwrap();
}
