// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright © 2024 RemasteredArch
//
// This file is part of smtp_sink.
//
// smtp_sink is free software: you can redistribute it and/or modify it under the terms of the GNU
// Affero General Public License as published by the Free Software Foundation, either version 3 of
// the License, or (at your option) any later version.
//
// smtp_sink is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU
// Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License along with smtp_sink.
// If not, see <https://www.gnu.org/licenses/>.

//! Tests for [`super`].

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use rustls::{
    crypto::ring,
    pki_types::{CertificateDer, ServerName},
    ClientConfig, RootCertStore,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpStream,
};
use tokio_rustls::TlsConnector;

use super::*;

type Result<T = ()> = std::result::Result<T, Box<dyn std::error::Error>>;

const LOCALHOST: &str = "127.0.0.1:0";

/// Run a whole mail transaction over `stream`, checking each reply.
async fn exchange<S: AsyncRead + AsyncWrite + Unpin>(stream: S) -> Result {
    let mut stream = BufReader::new(stream);
    let mut line = String::new();

    stream.read_line(&mut line).await?;
    assert_eq!(line, "220 mx.example.com Service ready\r\n");

    for (command, reply) in [
        ("HELO client.example.com\r\n", "250 mx.example.com at your service\r\n"),
        ("MAIL FROM:<a@b.com>\r\n", "250 OK\r\n"),
        ("RCPT TO:<c@d.com>\r\n", "250 OK\r\n"),
        ("DATA\r\n", "354 Start mail input; end with <CRLF>.<CRLF>\r\n"),
        ("Subject: hi\r\n\r\nhello\r\n.\r\n", "250 OK\r\n"),
        ("QUIT\r\n", "221 mx.example.com Service closing transmission channel\r\n"),
    ] {
        stream.write_all(command.as_bytes()).await?;
        stream.flush().await?;

        line.clear();
        stream.read_line(&mut line).await?;
        assert_eq!(line, reply, "reply to {command:?}");
    }

    Ok(())
}

#[tokio::test]
async fn test_plain_exchange() -> Result {
    let server = Server::plain(LOCALHOST, Config::new("mx.example.com"));
    let addr = server.start().await?;
    assert!(server.is_running());

    exchange(TcpStream::connect(addr).await?).await?;

    server.stop();
    assert!(!server.is_running());

    Ok(())
}

#[tokio::test]
async fn test_start_twice() -> Result {
    let server = Server::plain(LOCALHOST, Config::default());
    server.start().await?;

    assert!(matches!(
        server.start().await,
        Err(StartError::AlreadyRunning)
    ));
    assert!(server.is_running());

    Ok(())
}

#[tokio::test]
async fn test_bind_failure() -> Result {
    let first = Server::plain(LOCALHOST, Config::default());
    let addr = first.start().await?;

    let second = Server::plain(addr.to_string(), Config::default());
    assert!(matches!(
        second.start().await,
        Err(StartError::Bind { .. })
    ));
    assert!(!second.is_running());

    Ok(())
}

#[tokio::test]
async fn test_stop() -> Result {
    let server = Server::plain(LOCALHOST, Config::default());
    server.set_logger(None);
    let addr = server.start().await?;
    server.stop();

    // The operating system still completes the connection, but it is closed without a greeting.
    let mut stream = TcpStream::connect(addr).await?;
    let mut received = Vec::new();
    stream.read_to_end(&mut received).await?;
    assert!(received.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_concurrent_start() -> Result {
    // A host name makes `bind` resolve first, so both calls are in flight at once.
    let server = Server::plain("localhost:0", Config::default());

    let (first, second) = tokio::join!(server.start(), server.start());

    match (first, second) {
        (Ok(_), Err(StartError::AlreadyRunning)) | (Err(StartError::AlreadyRunning), Ok(_)) => (),
        (first, second) => panic!("expected exactly one start to succeed: {first:?}, {second:?}"),
    }
    assert!(server.is_running());

    Ok(())
}

#[tokio::test]
async fn test_restart_after_failure() -> Result {
    let first = Server::plain(LOCALHOST, Config::default());
    let addr = first.start().await?;

    let second = Server::plain(addr.to_string(), Config::default());
    assert!(second.start().await.is_err());

    // A failed start releases the server, so it fails for the same reason again.
    assert!(matches!(
        second.start().await,
        Err(StartError::Bind { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_missing_certificate() -> Result {
    let directory = tempfile::tempdir()?;
    let server = Server::tls(
        LOCALHOST,
        directory.path().join("cert.pem"),
        directory.path().join("key.pem"),
        Config::default(),
    );

    assert!(matches!(
        server.start().await,
        Err(StartError::Pem { path, .. }) if path.ends_with("cert.pem")
    ));
    assert!(!server.is_running());

    Ok(())
}

#[tokio::test]
async fn test_empty_certificate() -> Result {
    let directory = tempfile::tempdir()?;
    let certificate = directory.path().join("cert.pem");
    std::fs::write(&certificate, "")?;

    let server = Server::tls(
        LOCALHOST,
        &certificate,
        directory.path().join("key.pem"),
        Config::default(),
    );

    assert!(matches!(
        server.start().await,
        Err(StartError::NoCertificates { .. })
    ));

    Ok(())
}

/// Write a fresh self-signed certificate for `localhost` and its key into `directory`.
fn self_signed(directory: &std::path::Path) -> Result<CertificateDer<'static>> {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()])?;

    std::fs::write(directory.join("cert.pem"), cert.pem())?;
    std::fs::write(directory.join("key.pem"), key_pair.serialize_pem())?;

    Ok(cert.der().clone())
}

async fn connect_tls(
    addr: SocketAddr,
    certificate: CertificateDer<'static>,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let mut roots = RootCertStore::empty();
    roots.add(certificate)?;

    let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let stream = TcpStream::connect(addr).await?;
    let server_name = ServerName::try_from("localhost")?;

    Ok(connector.connect(server_name, stream).await?)
}

#[tokio::test]
async fn test_tls_exchange() -> Result {
    let directory = tempfile::tempdir()?;
    let certificate = self_signed(directory.path())?;

    let server = Server::tls(
        LOCALHOST,
        directory.path().join("cert.pem"),
        directory.path().join("key.pem"),
        Config::new("mx.example.com"),
    );
    let addr = server.start().await?;

    exchange(connect_tls(addr, certificate.clone()).await?).await?;

    // A failed handshake only ends that one connection.
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(b"HELO plain.example.com\r\n").await?;
    let mut received = Vec::new();
    let _ = stream.read_to_end(&mut received).await;
    assert!(!received.starts_with(b"220"));

    exchange(connect_tls(addr, certificate).await?).await?;

    server.stop();

    Ok(())
}

/// Log output collected in memory.
#[derive(Clone, Default)]
struct Logs(Arc<Mutex<Vec<u8>>>);

impl Logs {
    /// A subscriber that writes everything at `DEBUG` and above into these logs.
    fn dispatch(&self) -> Dispatch {
        let logs = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || logs.clone())
            .finish();

        Dispatch::new(subscriber)
    }

    fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);

        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl std::io::Write for Logs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);

        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_attached_logger() -> Result {
    let logs = Logs::default();

    let server = Server::plain(LOCALHOST, Config::new("mx.example.com"));
    server.set_logger(Some(logs.dispatch()));
    let addr = server.start().await?;

    exchange(TcpStream::connect(addr).await?).await?;

    let contents = logs.contents();
    assert!(contents.contains("plain smtp starting up"), "{contents}");
    assert!(contents.contains("listening"), "{contents}");
    assert!(contents.contains("connection accepted"), "{contents}");
    // Replies are logged before they are written, so the last one is already here.
    assert!(contents.contains("sending reply"), "{contents}");
    assert!(contents.contains("220 mx.example.com Service ready"), "{contents}");
    assert!(
        contents.contains("221 mx.example.com Service closing transmission channel"),
        "{contents}"
    );

    server.stop();
    assert!(logs.contents().contains("shutting down"));

    Ok(())
}

#[tokio::test]
async fn test_detached_logger() -> Result {
    let logs = Logs::default();

    // The server picks up the default subscriber when it is created.
    let server = {
        let _default = tracing::dispatcher::set_default(&logs.dispatch());
        Server::plain(LOCALHOST, Config::new("mx.example.com"))
    };
    server.start().await?;
    server.stop();
    assert!(logs.contents().contains("plain smtp starting up"));

    let logs_before = logs.contents();
    let server = {
        let _default = tracing::dispatcher::set_default(&logs.dispatch());
        Server::plain(LOCALHOST, Config::new("mx.example.com"))
    };
    server.set_logger(None);
    let addr = server.start().await?;

    exchange(TcpStream::connect(addr).await?).await?;
    server.stop();

    assert_eq!(logs.contents(), logs_before);

    Ok(())
}
