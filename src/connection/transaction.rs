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

//! The envelope and body of the mail transaction in progress on a session.

/// The mutable state of one mail transaction.
///
/// Owned by exactly one session and only changed by its command handlers.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct Transaction {
    /// Reverse-paths from `MAIL` commands, in the order they were received.
    ///
    /// Every `MAIL` before a reset adds another path rather than replacing the first.
    sender: Vec<String>,
    /// The forward-path from the most recent `RCPT` command.
    ///
    /// Only one recipient is kept; a later `RCPT` replaces an earlier one.
    recipient: Option<String>,
    /// Mail data from `DATA`, without the terminating `<CRLF>.<CRLF>`.
    body: Vec<u8>,
}

impl Transaction {
    /// Create an empty [`Self`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the envelope and body.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record another reverse-path.
    pub fn add_sender(&mut self, path: impl Into<String>) {
        self.sender.push(path.into());
    }

    /// Record the forward-path, replacing any previous one.
    pub fn set_recipient(&mut self, path: impl Into<String>) {
        self.recipient = Some(path.into());
    }

    /// Store the mail data.
    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }

    /// Get every recorded reverse-path, joined by commas.
    ///
    /// Empty if no `MAIL` command has been accepted since the last reset.
    #[must_use]
    pub fn sender(&self) -> String {
        self.sender.join(",")
    }

    /// Get the forward-path, if one has been recorded.
    #[must_use]
    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref()
    }

    /// Get the stored mail data.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether both a reverse-path and a forward-path have been recorded, which `DATA` requires.
    #[must_use]
    pub fn is_ready_for_data(&self) -> bool {
        !self.sender.is_empty() && self.recipient.is_some()
    }

    /// Whether nothing at all has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sender.is_empty() && self.recipient.is_none() && self.body.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_envelope() {
        let mut transaction = Transaction::new();
        assert!(transaction.is_empty());
        assert!(!transaction.is_ready_for_data());

        transaction.add_sender("a@b.com");
        assert!(!transaction.is_ready_for_data());

        transaction.add_sender("e@f.com");
        assert_eq!(transaction.sender(), "a@b.com,e@f.com");

        transaction.set_recipient("c@d.com");
        transaction.set_recipient("g@h.com");
        assert_eq!(transaction.recipient(), Some("g@h.com"));
        assert!(transaction.is_ready_for_data());

        transaction.set_body(b"hello\r\n".to_vec());
        assert_eq!(transaction.body(), b"hello\r\n");

        transaction.reset();
        assert!(transaction.is_empty());
        assert_eq!(transaction.sender(), "");
        assert_eq!(transaction.recipient(), None);
    }
}
