//! End-to-end WebSocket upgrade: a client sends an HTTP/1.1 upgrade
//! request, the server validates and accepts it, and both sides exchange a
//! text message over the resulting `WebSocketConnection`.

use httpcore::config::{H1Config, WebSocketConfig};
use httpcore::h2::Role;
use httpcore::server::websocket;
use httpcore::ws::handshake;
use httpcore::ws::{IncomingMessage, WebSocketConnection, WsEvent};

#[tokio::test]
async fn client_upgrades_and_exchanges_a_message() {
    let (client_io, server_io) = tokio::io::duplex(8192);
    let uri = httpcore::Uri::parse_absolute("ws://example.com/chat").unwrap();
    let (request, key) = handshake::client_request(&uri, &[]);

    let server_task = tokio::spawn(async move {
        websocket::accept(server_io, &request, &H1Config::default(), WebSocketConfig::default(), None)
            .await
            .unwrap()
    });

    let mut client_io = client_io;
    let mut buf = Vec::new();
    let response = loop {
        let mut chunk = [0u8; 4096];
        use tokio::io::AsyncReadExt;
        let n = client_io.read(&mut chunk).await.unwrap();
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if text.contains("\r\n\r\n") {
            break parse_minimal_response(&text);
        }
    };
    assert_eq!(response.0, 101);
    let accept_header = response
        .1
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("sec-websocket-accept"))
        .map(|(_, v)| v.clone())
        .unwrap();
    assert_eq!(accept_header, handshake::compute_accept(&key));

    let mut server_ws = server_task.await.unwrap();
    let mut client_ws = WebSocketConnection::new(client_io, Role::Client, WebSocketConfig::default());
    client_ws.send_text("ping").await.unwrap();
    match server_ws.next_event().await.unwrap() {
        WsEvent::Message(IncomingMessage::Text(s)) => assert_eq!(s, "ping"),
        _ => panic!("expected a text message"),
    }
}

fn parse_minimal_response(text: &str) -> (u16, Vec<(String, String)>) {
    let mut lines = text.split("\r\n");
    let status_line = lines.next().unwrap();
    let status = status_line.split_whitespace().nth(1).unwrap().parse().unwrap();
    let headers = lines
        .take_while(|l| !l.is_empty())
        .filter_map(|l| l.split_once(": "))
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
    (status, headers)
}
