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

//! Handles connections as SMTP sessions.
//!
//! See [`handle`].

pub mod command;
pub mod reader;
pub mod transaction;

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use self::{
    reader::{ReadError, Reader},
    transaction::Transaction,
};
use crate::{
    config::Config,
    reply::{Code, ReplyWriter},
};

/// Handle a connection as an SMTP session.
///
/// Sends the greeting, then replies to commands until the client quits or the connection fails.
/// Failures are logged and answered with a reply where possible rather than returned; the
/// returned [`CloseReason`] says how the session ended.
///
/// There are no timeouts: a client that stops sending keeps its session open indefinitely.
pub async fn handle<S>(stream: S, config: Arc<Config>) -> CloseReason
where
    S: AsyncRead + AsyncWrite,
{
    let (read_stream, write_stream) = tokio::io::split(stream);

    Session::new(read_stream, write_stream, config).run().await
}

/// The stages of an SMTP session.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum State {
    /// The connection was just accepted and the greeting has not been sent.
    Greeting,
    /// Waiting for the next command.
    Ready,
    /// `DATA` was accepted and mail data is being read.
    AwaitingData,
    /// The session is over. Nothing more will be read or written.
    Closed,
}

/// The state of one SMTP session: its connection, its [`Transaction`], and its [`State`].
#[derive(Debug)]
pub struct Session<R, W> {
    reader: Reader<R>,
    writer: ReplyWriter<W>,
    transaction: Transaction,
    state: State,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a [`Self`] over a read half and a write half.
    pub fn new(read_stream: R, write_stream: W, config: Arc<Config>) -> Self {
        Self {
            reader: Reader::new(read_stream),
            writer: ReplyWriter::new(write_stream, config),
            transaction: Transaction::new(),
            state: State::Greeting,
        }
    }

    /// Get the current [`State`].
    pub const fn state(&self) -> State {
        self.state
    }

    /// Get the mail transaction in progress.
    pub const fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Run the session to completion.
    pub async fn run(&mut self) -> CloseReason {
        /// Evaluate a [`std::io::Result`], or log the error, try to send a `451` reply, and
        /// `break` with [`CloseReason::Error`].
        ///
        /// Implicitly calls `.await`.
        macro_rules! ok_or_break {
            ($self:ident, $result:expr) => {
                match $result {
                    Ok(value) => value,
                    Err(error) => {
                        tracing::warn!(%error, "transport error");
                        $self.abort().await;
                        break CloseReason::Error;
                    }
                }
            };
        }

        if let Err(error) = self.writer.code(Code::ServiceReady).await {
            tracing::warn!(%error, "failed to send greeting");
            self.state = State::Closed;

            return CloseReason::Error;
        }
        self.state = State::Ready;

        let close_reason = loop {
            let command = match self.reader.read_command().await {
                Ok(command) => command,
                Err(ReadError::Syntax) => {
                    tracing::debug!("malformed command line");
                    ok_or_break!(self, self.writer.code(Code::SyntaxErrorUnrecognized).await);
                    continue;
                }
                Err(ReadError::TooLarge) => {
                    ok_or_break!(self, self.writer.code(Code::ExceededStorage).await);
                    continue;
                }
                Err(ReadError::Closed) => {
                    tracing::info!("connection closed by client");
                    self.abort().await;
                    break CloseReason::ClosedByClient;
                }
                Err(error @ (ReadError::Framing | ReadError::Io(_))) => {
                    tracing::warn!(%error, "failed to read command");
                    self.abort().await;
                    break CloseReason::Error;
                }
            };

            tracing::debug!(%command, "received command");

            match ok_or_break!(self, command::handle(self, command).await) {
                ShouldClose::Close(reason) => break reason,
                ShouldClose::Keep => (),
            }
        };

        self.state = State::Closed;
        close_reason
    }

    /// Try to tell the client that processing was aborted, ignoring any failure to do so.
    async fn abort(&mut self) {
        if let Err(error) = self.writer.code(Code::AbortedInProcessing).await {
            tracing::debug!(%error, "failed to send abort reply");
        }
    }
}

/// Indicates if and why a connection should be closed.
#[derive(PartialEq, Eq, Debug)]
pub enum ShouldClose {
    /// The connection should be kept open.
    Keep,
    /// The connection should be closed because [`CloseReason`].
    Close(CloseReason),
}

/// Indicates why a connection was closed.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum CloseReason {
    /// The SMTP client requested to quit the session.
    Quit,
    /// Reading from or writing to the connection failed.
    Error,
    /// The connection was ended by the client without quitting.
    ClosedByClient,
}
