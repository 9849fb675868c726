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

#![warn(clippy::nursery, clippy::pedantic)]
#![cfg_attr(debug_assertions, allow(clippy::missing_errors_doc))]

//! A minimal SMTP server that accepts mail and throws it away.
//!
//! Each connection runs an [RFC 821](https://www.rfc-editor.org/rfc/rfc821.html) session: the
//! envelope and mail data are checked and acknowledged, and then discarded. See [`Server`] for
//! listening over plain TCP or TLS, or [`handle`] for running a session over any stream.

pub mod config;
pub mod connection;
pub mod reply;
pub mod server;
pub mod str;
#[cfg(test)]
mod test;

pub use self::{
    config::Config,
    connection::{handle, CloseReason},
    server::{Server, StartError},
};
