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

//! Read-only configuration shared by every session of a server.

/// Settings that shape the replies of a server.
///
/// One [`Config`] is shared (behind an [`std::sync::Arc`]) by a [`crate::Server`] and all of its
/// sessions, and never changes after the server is constructed.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Config {
    /// The domain the server identifies itself as in its greeting, closing, and `HELO`/`EHLO`
    /// replies.
    pub domain: String,
}

impl Config {
    /// Create a [`Self`] that identifies as `domain`.
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("localhost")
    }
}
