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

//! Renders and sends numbered replies to an SMTP client.
//!
//! See [`Code`] for the replies this server can send and [`ReplyWriter`] for sending them.

use std::{borrow::Cow, fmt::Display, sync::Arc};

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{config::Config, str::CRLF};


/// The reply codes of [RFC 821 section 4.2](https://www.rfc-editor.org/rfc/rfc821.html#page-35).
///
/// The discriminant of each variant is its three-digit code.
#[repr(u16)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Copy, Clone)]
pub enum Code {
    /// System status, or system help reply.
    SystemStatus = 211,
    /// Help message.
    HelpMessage = 214,
    /// `<domain>` Service ready.
    ServiceReady = 220,
    /// `<domain>` Service closing transmission channel.
    ServiceClosing = 221,
    /// Requested mail action okay, completed.
    Ok = 250,
    /// User not local; will forward to `<forward-path>`.
    UserNotLocalWillForward = 251,
    /// Start mail input; end with `<CRLF>.<CRLF>`.
    StartMailInput = 354,
    /// `<domain>` Service not available, closing transmission channel.
    ServiceNotAvailable = 421,
    /// Requested mail action not taken: mailbox unavailable (for example, busy).
    MailboxBusy = 450,
    /// Requested action aborted: local error in processing.
    AbortedInProcessing = 451,
    /// Requested action not taken: insufficient system storage.
    InsufficientStorage = 452,
    /// Syntax error, command unrecognized.
    SyntaxErrorUnrecognized = 500,
    /// Syntax error in parameters or arguments.
    SyntaxErrorInArguments = 501,
    /// Command not implemented.
    NotImplemented = 502,
    /// Bad sequence of commands.
    BadSequence = 503,
    /// Command parameter not implemented.
    ParameterNotImplemented = 504,
    /// Requested action not taken: mailbox unavailable (for example, not found).
    MailboxUnavailable = 550,
    /// User not local; please try `<forward-path>`.
    UserNotLocal = 551,
    /// Requested mail action aborted: exceeded storage allocation.
    ExceededStorage = 552,
    /// Requested action not taken: mailbox name not allowed.
    MailboxNameNotAllowed = 553,
    /// Transaction failed.
    TransactionFailed = 554,
}

impl Code {
    /// The three-digit number of this code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// The fixed text sent alongside this code.
    ///
    /// `{domain}` is replaced with [`Config::domain`] and `{}` with the argument of
    /// [`Reply::with_argument`].
    #[must_use]
    pub const fn template(self) -> &'static str {
        match self {
            Self::SystemStatus => "System status, or system help reply",
            Self::HelpMessage => "Help message",
            Self::ServiceReady => "{domain} Service ready",
            Self::ServiceClosing => "{domain} Service closing transmission channel",
            Self::Ok => "OK",
            Self::UserNotLocalWillForward => "User not local; will forward to {}",
            Self::StartMailInput => "Start mail input; end with <CRLF>.<CRLF>",
            Self::ServiceNotAvailable => "{domain} Service not available",
            Self::MailboxBusy => "Requested mail action not taken: mailbox unavailable",
            Self::AbortedInProcessing => "Requested action aborted: error in processing",
            Self::InsufficientStorage => {
                "Requested action not taken: insufficient system storage"
            }
            Self::SyntaxErrorUnrecognized => "Syntax error, command unrecognized",
            Self::SyntaxErrorInArguments => "Syntax error in parameters or arguments",
            Self::NotImplemented => "Command not implemented",
            Self::BadSequence => "Bad sequence of commands",
            Self::ParameterNotImplemented => "Command parameter not implemented",
            Self::MailboxUnavailable => "Requested action not taken: mailbox unavailable",
            Self::UserNotLocal => "User not local; please try {}",
            Self::ExceededStorage => "Requested mail action aborted: exceeded storage allocation",
            Self::MailboxNameNotAllowed => "Requested action not taken: mailbox name not allowed",
            Self::TransactionFailed => "Transaction failed",
        }
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.as_u16())
    }
}

/// Indicates if a reply line is the last line of its reply.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum MultiLine {
    /// This is the last (or only) line of the reply.
    LastLine,
    /// This is not the last line of the reply, there will be more following it.
    HasNext,
}

impl MultiLine {
    /// Get the character used to separate the code and text of a reply line.
    #[must_use]
    pub const fn split(self) -> char {
        match self {
            Self::LastLine => ' ',
            Self::HasNext => '-',
        }
    }
}

/// One line of a reply: a [`Code`] and its text.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Reply {
    code: Code,
    text: Cow<'static, str>,
}

impl Reply {
    /// Create a [`Self`] with the fixed text of `code`.
    #[must_use]
    pub fn new(code: Code, config: &Config) -> Self {
        let template = code.template();

        let text = if template.contains("{domain}") {
            Cow::Owned(template.replace("{domain}", &config.domain))
        } else {
            Cow::Borrowed(template)
        };

        Self { code, text }
    }

    /// Create a [`Self`] with the fixed text of `code`, substituting `argument` into it.
    ///
    /// Intended for [`Code::UserNotLocalWillForward`] and [`Code::UserNotLocal`]. Codes without a
    /// placeholder ignore `argument`.
    #[must_use]
    pub fn with_argument(code: Code, config: &Config, argument: &str) -> Self {
        let Self { code, text } = Self::new(code, config);

        let text = if text.contains("{}") {
            Cow::Owned(text.replacen("{}", argument, 1))
        } else {
            text
        };

        Self { code, text }
    }

    /// Create a [`Self`] with text other than the fixed text of `code`.
    #[must_use]
    pub fn custom(code: Code, text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// Get the [`Code`] of the reply.
    #[must_use]
    pub const fn code(&self) -> Code {
        self.code
    }

    /// Get the text of the reply.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Render the reply as a full line, including the trailing [`CRLF`].
    ///
    /// `"<code> <text>\r\n"` for the last line of a reply, `"<code>-<text>\r\n"` otherwise.
    #[must_use]
    pub fn render(&self, multiline: MultiLine) -> String {
        format!("{}{}{}{CRLF}", self.code, multiline.split(), self.text)
    }
}

/// Sends replies into the write half of a connection.
///
/// Every line is logged at the `DEBUG` level before it is written.
#[derive(Debug)]
pub struct ReplyWriter<W> {
    inner: W,
    config: Arc<Config>,
}

impl<W: AsyncWrite + Unpin> ReplyWriter<W> {
    /// Create a [`Self`] that writes into `inner`.
    pub const fn new(inner: W, config: Arc<Config>) -> Self {
        Self { inner, config }
    }

    /// Get the [`Config`] used to fill reply templates.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Send a reply with the fixed text of `code`.
    ///
    /// # Errors
    ///
    /// [`std::io::Error`] from [`AsyncWriteExt::write_all`] or [`AsyncWriteExt::flush`].
    pub async fn code(&mut self, code: Code) -> std::io::Result<()> {
        let reply = Reply::new(code, &self.config);

        self.reply(&reply).await
    }

    /// Send a single-line reply.
    ///
    /// # Errors
    ///
    /// [`std::io::Error`] from [`AsyncWriteExt::write_all`] or [`AsyncWriteExt::flush`].
    pub async fn reply(&mut self, reply: &Reply) -> std::io::Result<()> {
        self.write_line(reply.render(MultiLine::LastLine)).await
    }

    /// Send a reply spanning all of `replies`, marking every line but the last as a continuation.
    ///
    /// Does nothing if `replies` is empty.
    ///
    /// # Errors
    ///
    /// [`std::io::Error`] from [`AsyncWriteExt::write_all`] or [`AsyncWriteExt::flush`].
    pub async fn multiline(&mut self, replies: &[Reply]) -> std::io::Result<()> {
        let mut replies = replies.iter().peekable();

        while let Some(reply) = replies.next() {
            let multiline = if replies.peek().is_some() {
                MultiLine::HasNext
            } else {
                MultiLine::LastLine
            };

            self.write_line(reply.render(multiline)).await?;
        }

        Ok(())
    }

    /// Log and write one rendered line.
    async fn write_line(&mut self, line: String) -> std::io::Result<()> {
        tracing::debug!(reply = line.trim_end(), "sending reply");

        self.inner.write_all(line.as_bytes()).await?;
        // TLS streams buffer records until flushed.
        self.inner.flush().await
    }
}
