//! End-to-end HTTP/2 client/server round trip over an in-memory duplex
//! pipe: preface/SETTINGS handshake, one HEADERS-only request, one
//! HEADERS+DATA response.

use bytes::Bytes;
use httpcore::client::connection::{ConnectionHandle, Protocol};
use httpcore::client::{into_body_bytes, request};
use httpcore::config::{H1Config, H2Config};
use httpcore::server;

#[tokio::test]
async fn get_request_round_trips_over_http2() {
    let (client_io, server_io) = tokio::io::duplex(16384);

    let server_task = tokio::spawn(async move {
        server::serve(server_io, Protocol::Http2, H1Config::default(), H2Config::default(), |req| async move {
            assert_eq!(req.method.as_str(), "GET");
            let mut response = httpcore::HttpResponse::new(200, req.version);
            response.entity = httpcore::Entity::Strict(httpcore::entity::StrictEntity {
                content_type: httpcore::entity::ContentType::None,
                body: Bytes::from_static(b"h2 hello"),
            });
            response
        })
        .await
    });

    let handle = ConnectionHandle::spawn(client_io, Protocol::Http2, H1Config::default(), H2Config::default())
        .await
        .unwrap();
    let uri = httpcore::Uri::parse_absolute("https://example.com/greet").unwrap();
    let response = handle.submit(request::get(uri)).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(into_body_bytes(response).await.unwrap(), Bytes::from_static(b"h2 hello"));

    drop(handle);
    let _ = tokio::time::timeout(std::time::Duration::from_secs(1), server_task).await;
}
