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

//! Parses command lines from an SMTP client and dispatches them to their handlers.
//!
//! See [`Command::parse`] and [`handle`].

mod commands;

use std::{fmt::Display, sync::LazyLock};

use ascii::{AsciiStr, AsciiString};
use regex::bytes::Regex;
use tokio::io::{AsyncRead, AsyncWrite};

use super::{Session, ShouldClose};

/// Reply to one command from the client in an SMTP session.
///
/// # Errors
///
/// [`std::io::Error`] from writing the reply, or from reading mail data after `DATA`.
pub async fn handle<R, W>(
    session: &mut Session<R, W>,
    command: Command,
) -> std::io::Result<ShouldClose>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match command.verb() {
        Verb::Helo => commands::hello(session, &command).await,
        Verb::Ehlo => commands::extended_hello(session, &command).await,
        Verb::Mail => commands::mail(session, &command).await,
        Verb::Rcpt => commands::recipient(session, &command).await,
        Verb::Data => commands::data(session, &command).await,
        Verb::Rset => commands::reset(session, &command).await,
        Verb::Noop => commands::noop(session, &command).await,
        Verb::Quit => commands::quit(session, &command).await,
        Verb::Vrfy => commands::verify(session, &command).await,
        Verb::Help => commands::help(session, &command).await,
        Verb::Send
        | Verb::Soml
        | Verb::Saml
        | Verb::Expn
        | Verb::Turn
        | Verb::EightBitMime
        | Verb::Atrn
        | Verb::Auth
        | Verb::Chunking
        | Verb::Dsn
        | Verb::Etrn
        | Verb::Pipelining
        | Verb::StartTls
        | Verb::SmtpUtf8 => commands::not_implemented(session, &command).await,
        Verb::Unrecognized => commands::unrecognized(session, &command).await,
    }
}

/// One command line from the client: a verb and its (possibly empty) argument.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Command {
    /// The verb, uppercased.
    verb: AsciiString,
    /// Everything after the verb and its separating space, excluding the trailing `CRLF`.
    argument: String,
}

impl Command {
    /// Parse a command line.
    ///
    /// `line` must be exactly one `<verb>[ <argument>]<CRLF>` line, where the verb is one or more
    /// ASCII letters or digits and the argument contains no line feed. Leading whitespace, a
    /// missing `CRLF`, or more than one line all fail to parse.
    ///
    /// The verb is made uppercase for standardized comparison. The argument is kept as written,
    /// since the local part of a mailbox (ex. `smith` in `smith@example.com`) is case-sensitive.
    /// Invalid UTF-8 in the argument is replaced with `U+FFFD`.
    #[must_use]
    pub fn parse(line: &[u8]) -> Option<Self> {
        static LINE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(?-u)^([A-Za-z0-9]+) ?(.*)\r\n$").unwrap());

        let captures = LINE.captures(line)?;

        let mut verb = AsciiString::from_ascii(captures.get(1)?.as_bytes()).ok()?;
        verb.make_ascii_uppercase();

        let argument = captures
            .get(2)
            .map(|argument| String::from_utf8_lossy(argument.as_bytes()).into_owned())
            .unwrap_or_default();

        Some(Self { verb, argument })
    }

    /// Get the verb of the command as an uppercase string slice.
    #[must_use]
    pub fn verb_str(&self) -> &AsciiStr {
        &self.verb
    }

    /// Get the [`Verb`] this command is dispatched on.
    #[must_use]
    pub fn verb(&self) -> Verb {
        Verb::from(self.verb_str())
    }

    /// Get the argument of the command, which is empty if there was none.
    #[must_use]
    pub fn argument(&self) -> &str {
        &self.argument
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.argument.is_empty() {
            write!(f, "{}", self.verb)
        } else {
            write!(f, "{} {}", self.verb, self.argument)
        }
    }
}

/// Every command verb this server recognizes.
///
/// Verbs after [`Self::Help`] are recognized, but answered with `502 Command not implemented`.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Verb {
    Helo,
    Ehlo,
    Mail,
    Rcpt,
    Data,
    Rset,
    Noop,
    Quit,
    Vrfy,
    Help,

    Send,
    Soml,
    Saml,
    Expn,
    Turn,
    EightBitMime,
    Atrn,
    Auth,
    Chunking,
    Dsn,
    Etrn,
    Pipelining,
    StartTls,
    SmtpUtf8,

    /// Anything else.
    Unrecognized,
}

impl From<&AsciiStr> for Verb {
    /// Match an uppercase verb.
    fn from(verb: &AsciiStr) -> Self {
        match verb.as_str() {
            "HELO" => Self::Helo,
            "EHLO" => Self::Ehlo,
            "MAIL" => Self::Mail,
            "RCPT" => Self::Rcpt,
            "DATA" => Self::Data,
            "RSET" => Self::Rset,
            "NOOP" => Self::Noop,
            "QUIT" => Self::Quit,
            "VRFY" => Self::Vrfy,
            "HELP" => Self::Help,
            "SEND" => Self::Send,
            "SOML" => Self::Soml,
            "SAML" => Self::Saml,
            "EXPN" => Self::Expn,
            "TURN" => Self::Turn,
            "8BITMIME" => Self::EightBitMime,
            "ATRN" => Self::Atrn,
            "AUTH" => Self::Auth,
            "CHUNKING" => Self::Chunking,
            "DSN" => Self::Dsn,
            "ETRN" => Self::Etrn,
            "PIPELINING" => Self::Pipelining,
            "STARTTLS" => Self::StartTls,
            "SMTPUTF8" => Self::SmtpUtf8,
            _ => Self::Unrecognized,
        }
    }
}
