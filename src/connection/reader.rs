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

//! Reads command lines and mail data from the read half of a connection.

use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

use super::command::Command;
use crate::str::{max_lengths, strip_terminator};

/// Reasons a read from the client did not produce a command or mail data.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The bytes read were not exactly one `<verb>[ <argument>]<CRLF>` line.
    #[error("command line does not match `<verb>[ <argument>]<CRLF>`")]
    Syntax,
    /// Mail data exceeded [`max_lengths::MESSAGE`] before its terminator was seen.
    #[error("mail data exceeded {} bytes", max_lengths::MESSAGE)]
    TooLarge,
    /// The connection ended before the terminator of the mail data was seen.
    #[error("connection ended before the end of mail data")]
    Framing,
    /// The connection ended while waiting for a command.
    #[error("connection closed by client")]
    Closed,
    /// The underlying transport failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reads from a client one command, or one block of mail data, at a time.
#[derive(Debug)]
pub struct Reader<R> {
    inner: BufReader<R>,
}

impl<R: AsyncRead + Unpin> Reader<R> {
    /// Create a [`Self`] that reads from `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
        }
    }

    /// Read the next command.
    ///
    /// This performs exactly one read of at most [`max_lengths::COMMAND_READ`] bytes, which must
    /// hold exactly one command line. Lines split across reads, or several lines sent together,
    /// fail with [`ReadError::Syntax`] like any other malformed line.
    ///
    /// # Errors
    ///
    /// - [`ReadError::Syntax`] if the bytes read don't parse with [`Command::parse`].
    /// - [`ReadError::Closed`] if the client has closed the connection.
    /// - [`ReadError::Io`] if the read fails.
    pub async fn read_command(&mut self) -> Result<Command, ReadError> {
        let mut buffer = [0; max_lengths::COMMAND_READ];

        let read = self.inner.read(&mut buffer).await?;
        if read == 0 {
            return Err(ReadError::Closed);
        }

        let line = &buffer[..read];
        tracing::trace!(line = ?String::from_utf8_lossy(line), "read command line");

        Command::parse(line).ok_or(ReadError::Syntax)
    }

    /// Read mail data up to and including the `<CRLF>.<CRLF>` terminator.
    ///
    /// Returns the data with the terminator stripped. Dot-stuffed lines are not unstuffed.
    ///
    /// # Errors
    ///
    /// - [`ReadError::TooLarge`] as soon as more than [`max_lengths::MESSAGE`] bytes have been
    ///   read. Whatever the client sends after that is left unread.
    /// - [`ReadError::Framing`] if the connection ends before the terminator.
    /// - [`ReadError::Io`] if a read fails.
    pub async fn read_data(&mut self) -> Result<Vec<u8>, ReadError> {
        let mut data = Vec::new();
        let mut chunk = vec![0; max_lengths::DATA_READ];

        loop {
            let read = self.inner.read(&mut chunk).await?;
            if read == 0 {
                return Err(ReadError::Framing);
            }

            if data.len() + read > max_lengths::MESSAGE {
                return Err(ReadError::TooLarge);
            }

            data.extend_from_slice(&chunk[..read]);
            tracing::trace!(read, total = data.len(), "read mail data");

            if let Some(body) = strip_terminator(&data) {
                let len = body.len();
                data.truncate(len);

                return Ok(data);
            }
        }
    }
}
