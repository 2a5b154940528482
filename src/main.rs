//! Demo CLI: fetches one URL through the client pool and prints the
//! response. Grounded on `Atte-http2/src/main.rs`'s clap-based single-URL
//! fetcher, with the synchronous `rustls`/`TcpStream` socket (`socket.rs`)
//! replaced by an async `tokio_rustls`/`TcpStream` connector plugged into
//! `client::pool::Connector`.

use clap::{crate_version, App, Arg};
use httpcore::client::connection::Protocol;
use httpcore::client::pool::{BoxFuture, Connector, IoStream, Pool, PoolId};
use httpcore::client::{into_body_bytes, request};
use httpcore::config::StackConfig;
use httpcore::error::HttpError;
use httpcore::Uri;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore, ServerName};
use tokio_rustls::TlsConnector;

struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, host: String, port: u16, encrypted: bool) -> BoxFuture<'static, Result<Box<dyn IoStream>, HttpError>> {
        Box::pin(async move {
            let stream = TcpStream::connect((host.as_str(), port))
                .await
                .map_err(|e| HttpError::transport("tcp connect failed", e.to_string()))?;
            if !encrypted {
                return Ok(Box::new(stream) as Box<dyn IoStream>);
            }

            let mut roots = RootCertStore::empty();
            roots.add_server_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.0.iter().map(|ta| {
                OwnedTrustAnchor::from_subject_spki_name_constraints(ta.subject, ta.spki, ta.name_constraints)
            }));
            let config = ClientConfig::builder().with_safe_defaults().with_root_certificates(roots).with_no_client_auth();
            let connector = TlsConnector::from(Arc::new(config));
            let server_name = ServerName::try_from(host.as_str()).map_err(|e| HttpError::configuration("invalid TLS server name", e.to_string()))?;
            let tls_stream = connector
                .connect(server_name, stream)
                .await
                .map_err(|e| HttpError::transport("tls handshake failed", e.to_string()))?;
            Ok(Box::new(tls_stream) as Box<dyn IoStream>)
        })
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let matches = App::new("httpcore")
        .version(crate_version!())
        .arg(Arg::with_name("url").required(true).index(1))
        .arg(Arg::with_name("http2").long("http2").help("speak HTTP/2 instead of HTTP/1.1"))
        .get_matches();

    let raw_url = matches.value_of("url").expect("missing url");
    let uri = Uri::parse_absolute(raw_url).expect("invalid url");
    let protocol = if matches.is_present("http2") { Protocol::Http2 } else { Protocol::Http1 };

    let stack = StackConfig::default();
    let fingerprint = httpcore::client::pool::settings_fingerprint(&stack.h1, &stack.h2);
    let pool_id = PoolId::from_uri(&uri, fingerprint).expect("non-absolute or unresolvable url");
    let pool = Pool::new(pool_id, Arc::new(TcpConnector), protocol, stack.pool.clone(), stack.h1.clone(), stack.h2.clone());

    let request = request::get(uri);
    let (result, ()) = pool.submit(request, ()).await;
    match result {
        Ok(response) => {
            println!("{} {}", response.status, response.reason.as_deref().unwrap_or(""));
            match into_body_bytes(response).await {
                Ok(body) => println!("{}", String::from_utf8_lossy(&body)),
                Err(e) => eprintln!("{e:#?}"),
            }
        }
        Err(err) => eprintln!("{err:#?}"),
    }
}
