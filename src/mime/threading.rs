//-
// Copyright (c) 2026, Jason Lingle
//
// This file is part of Mailbridge.
//
// Mailbridge is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailbridge is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Mailbridge. If not, see <http://www.gnu.org/licenses/>.

//! Extraction of a message's place in its thread.

use super::header::{find_header, strip_comments, unfold, RawHeader};

/// The message's own identifier, without angle brackets.
pub fn message_id(headers: &[RawHeader]) -> Option<String> {
    let value = find_header(headers, "Message-ID")?;
    msg_id_tokens(value).into_iter().next()
}

/// The ordered ancestor chain of the message.
///
/// Every `In-Reply-To` header contributes its tokens first, followed by
/// the tokens of every `References` header. Nothing is deduplicated, so the
/// same identifier may appear more than once.
pub fn references(headers: &[RawHeader]) -> Vec<String> {
    let mut references = Vec::new();
    for field in &["In-Reply-To", "References"] {
        for (_, value) in headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(field))
        {
            references.extend(msg_id_tokens(value));
        }
    }
    references
}

/// Find the closest ancestor of a message which `lookup` knows about.
///
/// `references` is scanned from its last entry backwards; the first entry
/// for which `lookup` yields a value wins. Since `In-Reply-To` entries come
/// first, a message carrying both headers resolves through the last
/// `References` entry it has metadata for before consulting `In-Reply-To`.
pub fn nearest_known<T, E, F>(
    references: &[String],
    mut lookup: F,
) -> Result<Option<(String, T)>, E>
where
    F: FnMut(&str) -> Result<Option<T>, E>,
{
    for reference in references.iter().rev() {
        if let Some(found) = lookup(reference)? {
            return Ok(Some((reference.clone(), found)));
        }
    }

    Ok(None)
}

fn msg_id_tokens(value: &str) -> Vec<String> {
    let value = strip_comments(&unfold(value));
    let mut tokens = Vec::new();
    let mut rest = value.as_str();

    loop {
        match (rest.find('<'), rest.find('>')) {
            (Some(open), Some(close)) if open < close => {
                let token = rest[open + 1..close].trim();
                if !token.is_empty() {
                    tokens.push(token.to_owned());
                }
                rest = &rest[close + 1..];
            }
            // Stray `>` before the next `<`
            (Some(_), Some(close)) => rest = &rest[close + 1..],
            _ => break,
        }
    }

    if tokens.is_empty() {
        // Some agents omit the brackets entirely
        tokens.extend(
            value
                .split_whitespace()
                .filter(|t| t.contains('@'))
                .map(|t| t.trim_matches(|c| '<' == c || '>' == c).to_owned()),
        );
    }

    tokens
}
