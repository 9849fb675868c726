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

//! The maximum length, in number of 8-bit bytes, of a variety of items.
//!
//! [RFC 5321 section 4.5.3.1](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.5.3.1) only
//! sets *minimums* that implementations must be able to handle; these are the limits this server
//! actually enforces.

/// The size of the single read used to receive a command line.
///
/// A command line is expected to arrive whole within one read of at most this many bytes. Anything
/// that doesn't is treated as a syntax error rather than buffered.
pub const COMMAND_READ: usize = 1 << 10;

/// The size of each read while receiving mail data.
pub const DATA_READ: usize = 24 << 10;

/// The maximum length of a message (including both the headers and body and the terminator) in
/// bytes.
///
/// This is well above the 64,000 byte minimum of [RFC 5321 §
/// 4.5.3.1.7](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.5.3.1.7), and is advertised to
/// clients as the `SIZE` extension in the reply to `EHLO`.
pub const MESSAGE: usize = 32 << 20;
