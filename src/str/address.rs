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

//! Grammars for the addresses carried by `MAIL`, `RCPT`, and `VRFY`.

use std::sync::LazyLock;

use regex::Regex;

/// The characters allowed in an atom, per [RFC 5322 section
/// 3.2.3](https://www.rfc-editor.org/rfc/rfc5322.html#section-3.2.3), plus any non-ASCII
/// character (as allowed by `SMTPUTF8`).
const ATEXT: &str = r"[A-Za-z0-9!#$%&'*+/=?^_`{|}~\-]|[^\x00-\x7F]";

/// A quoted string, allowing backslash escapes but not bare line endings.
const QUOTED: &str = r#""(?:[^"\\\r\n]|\\[^\r\n])*""#;

/// Build the pattern for an RFC 5322 `addr-spec` (`local-part@domain`).
fn addr_spec() -> String {
    let atom = format!("(?:{ATEXT})+");
    let dot_atom = format!(r"{atom}(?:\.{atom})*");
    let domain_literal = r"\[[^\[\]\\\r\n]*\]";

    format!("(?:{dot_atom}|{QUOTED})@(?:{dot_atom}|{domain_literal})")
}

/// Extract the reverse-path from the argument of a `MAIL` command (`FROM:<address>`).
///
/// The `FROM` keyword is case-insensitive; the address is returned as written, without its angle
/// brackets. Returns `None` if `argument` does not have that shape.
#[must_use]
pub fn reverse_path(argument: &str) -> Option<&str> {
    static FROM: LazyLock<Regex> =
        LazyLock::new(|| Regex::new("^[Ff][Rr][Oo][Mm]:<([^>]+)>$").unwrap());

    FROM.captures(argument)
        .and_then(|captures| captures.get(1))
        .map(|path| path.as_str())
}

/// Extract the forward-path from the argument of a `RCPT` command (`TO:<address>`).
///
/// See [`reverse_path`].
#[must_use]
pub fn forward_path(argument: &str) -> Option<&str> {
    static TO: LazyLock<Regex> = LazyLock::new(|| Regex::new("^[Tt][Oo]:<([^>]+)>$").unwrap());

    TO.captures(argument)
        .and_then(|captures| captures.get(1))
        .map(|path| path.as_str())
}

/// Checks whether `argument` is a single RFC 5322 mailbox.
///
/// Accepts either a bare `addr-spec` (`user@example.com`) or a name and angle-bracketed address
/// (`User <user@example.com>`, `<user@example.com>`). Comments are not supported.
#[must_use]
pub fn is_mailbox(argument: &str) -> bool {
    static MAILBOX: LazyLock<Regex> = LazyLock::new(|| {
        let addr_spec = addr_spec();
        let word = format!(r"(?:(?:{ATEXT}|\.)+|{QUOTED})");
        let phrase = format!(r"{word}(?:[ \t]+{word})*");

        Regex::new(&format!(
            r"^[ \t]*(?:{addr_spec}|(?:{phrase})?[ \t]*<{addr_spec}>)[ \t]*$"
        ))
        .unwrap()
    });

    MAILBOX.is_match(argument)
}
