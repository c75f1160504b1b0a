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

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

use super::quoted_printable::qp_decode;
use super::transfer_encoding::charset_encoding;

lazy_static! {
    static ref ENCODED_WORD: Regex =
        Regex::new(r"^=\?([!->@-~]*)\?([!->@-~]*)\?([!->@-~]*)\?=$").unwrap();
    static ref ENCODED_WORD_IN_TEXT: Regex =
        Regex::new(r"=\?[!->@-~]+\?[bBqQ]\?[!->@-~]*\?=").unwrap();
}

/// Test if `word` (in its entirety) is an RFC 2047 "encoded word".
///
/// If it is, decode it and return its decoded value.
///
/// Returns `None` if it is not an encoded word or if it could not be decoded,
/// in which case the caller should keep the word as literal text.
///
/// Encoded words longer than the 75 characters RFC 2047 allows are accepted,
/// since enough agents produce them.
pub fn ew_decode(word: &str) -> Option<String> {
    let captures = ENCODED_WORD.captures(word)?;

    // RFC 2231 allows a language tag after the charset; we have no use for it
    let charset = captures.get(1)?.as_str();
    let charset = charset.split('*').next().unwrap_or(charset);
    let transfer_encoding = captures.get(2)?.as_str();
    let content = captures.get(3)?.as_str().as_bytes();

    let content: Cow<[u8]> = match transfer_encoding {
        "q" | "Q" => {
            // _ in the content (before transfer decoding) stands for ASCII
            // space regardless of charset
            let spaced: Vec<u8> = content
                .iter()
                .map(|&b| if b'_' == b { b' ' } else { b })
                .collect();
            Cow::Owned(qp_decode(&spaced))
        }
        "b" | "B" => Cow::Owned(base64::decode(content).ok()?),
        _ => return None,
    };

    let (text, had_errors) =
        charset_encoding(charset)?.decode_without_bom_handling(&content);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}

/// Decode every encoded word found in the header value `value`.
///
/// Linear whitespace (including folding line breaks) between two adjacent
/// encoded words is dropped, as RFC 2047 requires; all other text, line
/// breaks included, is kept as is.
pub fn decode_header_value(value: &str) -> Cow<str> {
    if !value.contains("=?") {
        return Cow::Borrowed(value);
    }

    let mut decoded = String::with_capacity(value.len());
    let mut last_end = 0;
    let mut after_encoded_word = false;

    for m in ENCODED_WORD_IN_TEXT.find_iter(value) {
        let gap = &value[last_end..m.start()];
        match ew_decode(m.as_str()) {
            Some(word) => {
                if !(after_encoded_word && gap.trim().is_empty()) {
                    decoded.push_str(gap);
                }
                decoded.push_str(&word);
                after_encoded_word = true;
            }
            None => {
                decoded.push_str(gap);
                decoded.push_str(m.as_str());
                after_encoded_word = false;
            }
        }
        last_end = m.end();
    }

    decoded.push_str(&value[last_end..]);
    Cow::Owned(decoded)
}
