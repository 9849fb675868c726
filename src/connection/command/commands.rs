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

//! Handles responding to particular commands from SMTP clients.
//!
//! Each handler sends exactly the reply (or replies) for its command and reports whether the
//! session should continue.

use std::io::Result;

use tokio::io::{AsyncRead, AsyncWrite};

use super::{
    super::{reader::ReadError, CloseReason, Session, ShouldClose, State},
    Command,
};
use crate::{
    reply::{Code, Reply},
    str::{address, max_lengths},
};

/// Reply to an unrecognized command from a client.
///
/// See [`not_implemented`] for commands that are recognized, but not implemented. See [RFC 5321
/// section 4.2.4](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.2.4) for more details.
///
/// # Errors
///
/// [`std::io::Error`] from writing the reply.
pub async fn unrecognized<R, W>(session: &mut Session<R, W>, _: &Command) -> Result<ShouldClose>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    session.writer.code(Code::SyntaxErrorUnrecognized).await?;

    Ok(ShouldClose::Keep)
}

/// Reply to a command from the client that is recognized but not implemented.
///
/// [RFC 5321 section 4.2.4](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.2.4).
///
/// See [`unrecognized`] for cases of truly unrecognized commands.
///
/// # Errors
///
/// [`std::io::Error`] from writing the reply.
pub async fn not_implemented<R, W>(
    session: &mut Session<R, W>,
    command: &Command,
) -> Result<ShouldClose>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    tracing::debug!(verb = %command.verb_str(), "command not implemented");
    session.writer.code(Code::NotImplemented).await?;

    Ok(ShouldClose::Keep)
}

/// Reply to the hello (`HELO`) command from a client.
///
/// [RFC 821 section 4.1.1](https://www.rfc-editor.org/rfc/rfc821.html#page-29).
///
/// # Errors
///
/// [`std::io::Error`] from writing the reply.
pub async fn hello<R, W>(session: &mut Session<R, W>, _: &Command) -> Result<ShouldClose>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let text = format!("{} at your service", session.writer.config().domain);
    session.writer.reply(&Reply::custom(Code::Ok, text)).await?;

    Ok(ShouldClose::Keep)
}

/// Reply to the extended hello (`EHLO`) command from a client, advertising the supported
/// extensions.
///
/// [RFC 5321 section 4.1.1.1](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.1.1.1).
///
/// # Errors
///
/// [`std::io::Error`] from writing the reply.
pub async fn extended_hello<R, W>(session: &mut Session<R, W>, _: &Command) -> Result<ShouldClose>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let greeting = format!("{} at your service", session.writer.config().domain);

    session
        .writer
        .multiline(&[
            Reply::custom(Code::Ok, greeting),
            Reply::custom(Code::Ok, format!("SIZE {}", max_lengths::MESSAGE)),
            Reply::custom(Code::Ok, "SMTPUTF8"),
        ])
        .await?;

    Ok(ShouldClose::Keep)
}

/// Reply to the mail (`MAIL FROM:<reverse-path>`) command from a client.
///
/// Every accepted reverse-path is added to the sender of the transaction, even if one was already
/// given. Only a reset (`RSET` or a completed `DATA`) starts the sender over.
///
/// # Errors
///
/// [`std::io::Error`] from writing the reply.
pub async fn mail<R, W>(session: &mut Session<R, W>, command: &Command) -> Result<ShouldClose>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match address::reverse_path(command.argument()) {
        Some(path) => {
            session.transaction.add_sender(path);
            session.writer.code(Code::Ok).await?;
        }
        None => session.writer.code(Code::SyntaxErrorInArguments).await?,
    }

    Ok(ShouldClose::Keep)
}

/// Reply to the recipient (`RCPT TO:<forward-path>`) command from a client.
///
/// Only one recipient is kept; a later `RCPT` replaces an earlier one.
///
/// # Errors
///
/// [`std::io::Error`] from writing the reply.
pub async fn recipient<R, W>(session: &mut Session<R, W>, command: &Command) -> Result<ShouldClose>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match address::forward_path(command.argument()) {
        Some(path) => {
            session.transaction.set_recipient(path);
            session.writer.code(Code::Ok).await?;
        }
        None => session.writer.code(Code::SyntaxErrorInArguments).await?,
    }

    Ok(ShouldClose::Keep)
}

/// Reply to the data (`DATA`) command from a client, then read and reply to the mail data.
///
/// The mail data is checked for its terminator and size, stored in the transaction, and then
/// discarded along with the rest of the transaction.
///
/// # Errors
///
/// [`std::io::Error`] from writing a reply or from reading the mail data.
pub async fn data<R, W>(session: &mut Session<R, W>, _: &Command) -> Result<ShouldClose>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if !session.transaction.is_ready_for_data() {
        session.writer.code(Code::BadSequence).await?;
        return Ok(ShouldClose::Keep);
    }

    session.writer.code(Code::StartMailInput).await?;
    session.state = State::AwaitingData;

    let result = session.reader.read_data().await;
    session.state = State::Ready;

    match result {
        Ok(body) => {
            session.transaction.set_body(body);
            tracing::info!(
                sender = %session.transaction.sender(),
                recipient = session.transaction.recipient(),
                size = session.transaction.body().len(),
                "accepted message"
            );

            session.transaction.reset();
            session.writer.code(Code::Ok).await?;
        }
        // The envelope is kept so that the client may try again.
        Err(ReadError::TooLarge) => {
            tracing::info!("mail data exceeded storage allocation");
            session.writer.code(Code::ExceededStorage).await?;
        }
        Err(ReadError::Io(error)) => return Err(error),
        Err(error @ (ReadError::Framing | ReadError::Syntax | ReadError::Closed)) => {
            tracing::info!(%error, "failed to read mail data");
            session.writer.code(Code::TransactionFailed).await?;
        }
    }

    Ok(ShouldClose::Keep)
}

/// Reply to the reset (`RSET`) command from a client, clearing the transaction.
///
/// # Errors
///
/// [`std::io::Error`] from writing the reply.
pub async fn reset<R, W>(session: &mut Session<R, W>, _: &Command) -> Result<ShouldClose>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    session.transaction.reset();
    session.writer.code(Code::Ok).await?;

    Ok(ShouldClose::Keep)
}

/// Reply to the no-op (`NOOP`) command from a client.
///
/// # Errors
///
/// [`std::io::Error`] from writing the reply.
pub async fn noop<R, W>(session: &mut Session<R, W>, _: &Command) -> Result<ShouldClose>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    session.writer.code(Code::Ok).await?;

    Ok(ShouldClose::Keep)
}

/// Reply to the quit (`QUIT`) command from a client.
///
/// [RFC 5321 section 4.1.1.10](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.1.1.10).
///
/// # Errors
///
/// [`std::io::Error`] from writing the reply.
pub async fn quit<R, W>(session: &mut Session<R, W>, _: &Command) -> Result<ShouldClose>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    session.writer.code(Code::ServiceClosing).await?;

    Ok(ShouldClose::Close(CloseReason::Quit))
}

/// Reply to the verify (`VRFY`) command from a client.
///
/// Only checks that the argument is a syntactically valid mailbox; no mailbox is looked up.
///
/// # Errors
///
/// [`std::io::Error`] from writing the reply.
pub async fn verify<R, W>(session: &mut Session<R, W>, command: &Command) -> Result<ShouldClose>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let code = if address::is_mailbox(command.argument()) {
        Code::Ok
    } else {
        Code::SyntaxErrorInArguments
    };
    session.writer.code(code).await?;

    Ok(ShouldClose::Keep)
}

/// Reply to the help (`HELP`) command from a client.
///
/// Help on a particular topic is not implemented.
///
/// # Errors
///
/// [`std::io::Error`] from writing the reply.
pub async fn help<R, W>(session: &mut Session<R, W>, command: &Command) -> Result<ShouldClose>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let code = if command.argument().is_empty() {
        Code::HelpMessage
    } else {
        Code::ParameterNotImplemented
    };
    session.writer.code(code).await?;

    Ok(ShouldClose::Keep)
}
