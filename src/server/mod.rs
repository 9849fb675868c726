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

//! Accepts connections and runs an SMTP session on each.
//!
//! See [`Server`].

#[cfg(test)]
mod test;
pub mod tls;

use std::{
    io,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, PoisonError, RwLock,
    },
};

use futures_core::Stream;
use futures_util::{pin_mut, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{
    dispatcher, instrument::WithSubscriber, subscriber::NoSubscriber, Dispatch, Instrument,
};

use crate::{
    config::Config,
    connection::{self, CloseReason},
};

/// Errors from [`Server::start`].
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// [`Server::start`] was called while the server was running.
    #[error("server is already running")]
    AlreadyRunning,
    /// The listening socket couldn't be opened.
    #[error("failed to listen on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    /// A certificate or key file couldn't be read or parsed.
    #[error("failed to load {}", path.display())]
    Pem {
        path: PathBuf,
        #[source]
        source: rustls::pki_types::pem::Error,
    },
    /// The certificate file held no certificates.
    #[error("no certificates found in {}", path.display())]
    NoCertificates { path: PathBuf },
    /// The certificate and key don't make a usable TLS configuration.
    #[error("invalid TLS configuration")]
    Tls(#[from] rustls::Error),
}

/// Whether connections are plain TCP or TLS from the first byte.
#[derive(Debug, Clone)]
enum Security {
    Plain,
    Tls {
        certificate: PathBuf,
        private_key: PathBuf,
    },
}

impl Security {
    const fn protocol(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Tls { .. } => "tls",
        }
    }
}

/// State shared between a [`Server`] and its accept loop.
#[derive(Debug)]
struct Shared {
    config: Arc<Config>,
    running: AtomicBool,
    logger: RwLock<Dispatch>,
}

impl Shared {
    fn logger(&self) -> Dispatch {
        self.logger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run `f` with the current logger as the default subscriber.
    fn with_logger<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.logger(), f)
    }
}

/// An SMTP server listening on one address, either over plain TCP or over TLS.
///
/// Every accepted connection runs its own session on its own task, and sessions never share
/// state. Messages are read, checked, and discarded.
///
/// Logs go to the subscriber that was the default when the server was created, unless replaced
/// with [`Self::set_logger`].
#[derive(Debug)]
pub struct Server {
    addr: String,
    security: Security,
    shared: Arc<Shared>,
}

impl Server {
    /// Create a [`Self`] that will serve plain TCP connections on `addr`.
    pub fn plain(addr: impl Into<String>, config: Config) -> Self {
        Self::new(addr.into(), Security::Plain, config)
    }

    /// Create a [`Self`] that will serve TLS connections on `addr`, using the PEM certificate
    /// chain at `certificate` and the PEM private key at `private_key`.
    ///
    /// The files are read by [`Self::start`], not here.
    pub fn tls(
        addr: impl Into<String>,
        certificate: impl Into<PathBuf>,
        private_key: impl Into<PathBuf>,
        config: Config,
    ) -> Self {
        let security = Security::Tls {
            certificate: certificate.into(),
            private_key: private_key.into(),
        };

        Self::new(addr.into(), security, config)
    }

    fn new(addr: String, security: Security, config: Config) -> Self {
        let logger = dispatcher::get_default(Dispatch::clone);

        Self {
            addr,
            security,
            shared: Arc::new(Shared {
                config: Arc::new(config),
                running: AtomicBool::new(false),
                logger: RwLock::new(logger),
            }),
        }
    }

    /// Replace the logger of this server, or silence it with `None`.
    ///
    /// Takes effect for messages from the accept loop immediately, and for sessions accepted
    /// afterwards. Sessions already running keep the logger they started with.
    pub fn set_logger(&self, logger: Option<Dispatch>) {
        let logger = logger.unwrap_or_else(|| Dispatch::new(NoSubscriber::default()));

        *self
            .shared
            .logger
            .write()
            .unwrap_or_else(PoisonError::into_inner) = logger;
    }

    /// Whether the server was started and not stopped since.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Start listening and serving connections in the background.
    ///
    /// Returns the address that was actually bound, which differs from the configured one if
    /// that asked for port 0.
    ///
    /// # Errors
    ///
    /// - [`StartError::AlreadyRunning`] if the server is already running, or another call is still
    ///   starting it.
    /// - [`StartError::Bind`] if the listening socket couldn't be opened.
    /// - Any of the TLS variants of [`StartError`] if the certificate or key couldn't be loaded.
    ///
    /// The server is left stopped on error.
    pub async fn start(&self) -> Result<SocketAddr, StartError> {
        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(StartError::AlreadyRunning);
        }

        let (listener, acceptor) = match self.bind().await {
            Ok(bound) => bound,
            Err(error) => {
                self.shared.running.store(false, Ordering::Release);
                return Err(error);
            }
        };

        let local_addr = match listener.local_addr() {
            Ok(local_addr) => local_addr,
            Err(source) => {
                self.shared.running.store(false, Ordering::Release);
                return Err(StartError::Bind {
                    addr: self.addr.clone(),
                    source,
                });
            }
        };

        self.shared
            .with_logger(|| tracing::info!(%local_addr, "listening"));

        tokio::spawn(accept_loop(listener, acceptor, Arc::clone(&self.shared)));

        Ok(local_addr)
    }

    /// Load the TLS configuration, if any, and open the listening socket.
    async fn bind(&self) -> Result<(TcpListener, Option<TlsAcceptor>), StartError> {
        let protocol = self.security.protocol();
        self.shared
            .with_logger(|| tracing::info!("{protocol} smtp starting up"));

        let acceptor = match &self.security {
            Security::Plain => None,
            Security::Tls {
                certificate,
                private_key,
            } => Some(TlsAcceptor::from(tls::make_server_config(
                certificate,
                private_key,
            )?)),
        };

        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|source| StartError::Bind {
                addr: self.addr.clone(),
                source,
            })?;

        Ok((listener, acceptor))
    }

    /// Stop accepting connections.
    ///
    /// The accept loop notices on its next accepted connection, which is dropped unserved.
    /// Sessions already running are left to finish.
    pub fn stop(&self) {
        self.shared.with_logger(|| tracing::info!("shutting down"));
        self.shared.running.store(false, Ordering::Release);
    }
}

/// Turn a [`TcpListener`] into a stream of accepted connections.
///
/// Never ends on its own; errors from individual accepts are yielded as they happen.
pub fn listen(listener: TcpListener) -> impl Stream<Item = io::Result<(TcpStream, SocketAddr)>> {
    async_stream::stream! {
        loop {
            yield listener.accept().await;
        }
    }
}

/// Accept connections until the server is stopped, serving each on its own task.
async fn accept_loop(listener: TcpListener, acceptor: Option<TlsAcceptor>, shared: Arc<Shared>) {
    let connections = listen(listener);
    pin_mut!(connections);

    while let Some(connection) = connections.next().await {
        let (stream, peer) = match connection {
            Ok(connection) => connection,
            Err(error) => {
                shared.with_logger(|| tracing::warn!(%error, "failed to accept connection"));
                continue;
            }
        };

        if !shared.running.load(Ordering::Acquire) {
            shared.with_logger(|| tracing::debug!(%peer, "stopped, dropping connection"));
            break;
        }

        let logger = shared.logger();
        let span = dispatcher::with_default(&logger, || tracing::info_span!("session", %peer));

        tokio::spawn(
            serve(stream, acceptor.clone(), Arc::clone(&shared.config))
                .instrument(span)
                .with_subscriber(logger),
        );
    }

    shared.with_logger(|| tracing::info!("stopped accepting connections"));
}

/// Serve one connection, completing the TLS handshake first if there is an `acceptor`.
async fn serve(stream: TcpStream, acceptor: Option<TlsAcceptor>, config: Arc<Config>) {
    tracing::info!("connection accepted");

    let close_reason: CloseReason = match acceptor {
        None => connection::handle(stream, config).await,
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(stream) => connection::handle(stream, config).await,
            Err(error) => {
                tracing::warn!(%error, "TLS handshake failed");
                return;
            }
        },
    };

    tracing::info!(?close_reason, "connection closed");
}
