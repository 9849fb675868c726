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

//! Wire-level string constants and grammars for SMTP.

pub mod address;
pub(crate) mod max_lengths;

/// The line ending sequence required by [RFC 5321 section
/// 2.3.8](https://www.rfc-editor.org/rfc/rfc5321.html#section-2.3.8).
pub const CRLF: &str = "\r\n";

/// The dot-stuffed sequence that ends the mail data following a `DATA` command.
///
/// [RFC 5321 § 4.1.1.4](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.1.1.4).
pub const DATA_TERMINATOR: &[u8] = b"\r\n.\r\n";

/// Strip [`DATA_TERMINATOR`] from the end of `data`, if present.
///
/// Returns `None` if `data` does not end with the terminator.
#[must_use]
pub fn strip_terminator(data: &[u8]) -> Option<&[u8]> {
    data.strip_suffix(DATA_TERMINATOR)
}
