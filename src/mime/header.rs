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

//! Splitting a raw message into its header block and body.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::support::error::Error;

lazy_static! {
    static ref CHARSET_PARAM: Regex =
        Regex::new(r#"(?i)(?:^|;)\s*charset\s*=\s*"?([^";\s]+)"?"#).unwrap();
}

/// A raw header field. The value keeps folding line breaks (as `\n`
/// followed by the continuation's leading whitespace) and has not been
/// decoded.
pub type RawHeader = (String, String);

/// Split `raw` into header fields and body.
///
/// Line endings are normalised to LF. A leading mbox `From ` line is
/// skipped. Continuation lines are appended to the preceding field's value.
///
/// Fails with `MalformedMessage` if no blank line terminates the header
/// block or if the block contains no fields at all.
pub fn split_message(raw: &[u8]) -> Result<(Vec<RawHeader>, Vec<u8>), Error> {
    let mut normalised = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i..].starts_with(b"\r\n") {
            normalised.push(b'\n');
            i += 2;
        } else {
            normalised.push(raw[i]);
            i += 1;
        }
    }

    let mut start = 0;
    if normalised.starts_with(b"From ") {
        start = match normalised.iter().position(|&b| b'\n' == b) {
            Some(lf) => lf + 1,
            None => {
                return Err(Error::MalformedMessage(
                    "nothing follows the mbox From line".to_owned(),
                ))
            }
        };
    }
    let message = &normalised[start..];

    let header_len = if message.starts_with(b"\n") {
        0
    } else {
        match find(message, b"\n\n") {
            Some(pos) => pos + 1,
            None => {
                return Err(Error::MalformedMessage(
                    "header block is not terminated by a blank line"
                        .to_owned(),
                ))
            }
        }
    };

    let headers = parse_header_block(&message[..header_len]);
    if headers.is_empty() {
        return Err(Error::MalformedMessage("no header fields".to_owned()));
    }

    Ok((headers, message[header_len + 1..].to_vec()))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_header_block(block: &[u8]) -> Vec<RawHeader> {
    let mut headers: Vec<RawHeader> = Vec::new();

    for line in block.split(|&b| b'\n' == b) {
        if line.is_empty() {
            continue;
        }

        let line = header_text(line);
        if line.starts_with(' ') || line.starts_with('\t') {
            match headers.last_mut() {
                Some((_, value)) => {
                    value.push('\n');
                    value.push_str(&line);
                }
                None => debug!("Ignoring continuation line before any header"),
            }
            continue;
        }

        match line.find(':') {
            Some(colon) => {
                let name = line[..colon].trim().to_owned();
                let value = line[colon + 1..]
                    .trim_start_matches(|c| ' ' == c || '\t' == c)
                    .to_owned();
                headers.push((name, value));
            }
            None => debug!("Ignoring header line without colon: {:?}", line),
        }
    }

    headers
}

/// Headers ought to be ASCII, but RFC 6532 permits UTF-8 and some agents
/// just write whatever charset they like.
fn header_text(line: &[u8]) -> String {
    match std::str::from_utf8(line) {
        Ok(s) => s.to_owned(),
        Err(_) => line.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Remove the line breaks introduced by header folding.
pub fn unfold(value: &str) -> String {
    value.replace('\n', "")
}

/// Return the first header in `headers` named `name` (case-insensitively).
pub fn find_header<'a>(headers: &'a [RawHeader], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Extract the `charset` parameter from a `Content-Type` value.
pub fn content_type_charset(content_type: &str) -> Option<String> {
    CHARSET_PARAM
        .captures(&unfold(content_type))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Remove RFC 5322 comments (parenthesised text, which may nest) from
/// `value`.
///
/// Parentheses inside angle brackets or quoted strings are not comments.
pub fn strip_comments(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut depth = 0usize;
    let mut in_angle = false;
    let mut in_quote = false;
    let mut escaped = false;

    for ch in value.chars() {
        if escaped {
            escaped = false;
            if 0 == depth {
                out.push(ch);
            }
            continue;
        }

        match ch {
            '\\' if depth > 0 || in_quote => {
                escaped = true;
                if 0 == depth {
                    out.push(ch);
                }
                continue;
            }
            '(' if !in_angle && !in_quote => {
                depth += 1;
                continue;
            }
            ')' if depth > 0 => {
                depth -= 1;
                continue;
            }
            _ if depth > 0 => continue,
            '"' if !in_angle => in_quote = !in_quote,
            '<' if !in_quote => in_angle = true,
            '>' if !in_quote => in_angle = false,
            _ => (),
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn split_simple() {
        let (headers, body) = split_message(
            b"From: a@x\r\nSubject: hi\r\n\r\nbody\r\nmore\r\n",
        )
        .unwrap();
        assert_eq!(
            vec![
                ("From".to_owned(), "a@x".to_owned()),
                ("Subject".to_owned(), "hi".to_owned()),
            ],
            headers
        );
        assert_eq!(b"body\nmore\n", &body[..]);
    }

    #[test]
    fn split_skips_mbox_from_line() {
        let (headers, body) = split_message(
            b"From mboxrd@z Thu Jan  1 00:00:00 1970\n\
              Message-Id: <a@x>\n\
              \n\
              hello",
        )
        .unwrap();
        assert_eq!(1, headers.len());
        assert_eq!("Message-Id", headers[0].0);
        assert_eq!(b"hello", &body[..]);
    }

    #[test]
    fn folding_is_preserved() {
        let (headers, _) = split_message(
            b"To: Alice <a@x>,\n\
              \tBob <b@x>,\n  Carol <c@x>\n\
              Subject: a long\n subject\n\
              \n",
        )
        .unwrap();
        assert_eq!(
            vec![
                (
                    "To".to_owned(),
                    "Alice <a@x>,\n\tBob <b@x>,\n  Carol <c@x>".to_owned()
                ),
                ("Subject".to_owned(), "a long\n subject".to_owned()),
            ],
            headers
        );
        assert_eq!("a long subject", unfold(&headers[1].1));
    }

    #[test]
    fn duplicate_headers_kept_in_order() {
        let (headers, _) = split_message(
            b"Received: one\nX: y\nreceived: two\n\nbody",
        )
        .unwrap();
        assert_eq!(
            vec!["one", "y", "two"],
            headers.iter().map(|(_, v)| v.as_str()).collect::<Vec<_>>()
        );
        assert_eq!(Some("one"), find_header(&headers, "RECEIVED"));
        assert_eq!(None, find_header(&headers, "Subject"));
    }

    #[test]
    fn malformed_messages() {
        assert_matches!(
            Err(Error::MalformedMessage(_)),
            split_message(b"Subject: no body separator\n")
        );
        assert_matches!(Err(Error::MalformedMessage(_)), split_message(b""));
        assert_matches!(
            Err(Error::MalformedMessage(_)),
            split_message(b"\nbody only")
        );
        assert_matches!(
            Err(Error::MalformedMessage(_)),
            split_message(b"From someone")
        );
    }

    #[test]
    fn non_utf8_header_bytes() {
        let (headers, _) =
            split_message(b"Subject: caf\xe9\n\n").unwrap();
        assert_eq!("caf\u{e9}", headers[0].1);
    }

    #[test]
    fn charset_parameter() {
        assert_eq!(
            Some("UTF-8".to_owned()),
            content_type_charset("text/plain; charset=UTF-8")
        );
        assert_eq!(
            Some("iso-8859-1".to_owned()),
            content_type_charset("text/plain;\n\tcharset=\"iso-8859-1\"; format=flowed")
        );
        assert_eq!(None, content_type_charset("text/plain; format=flowed"));
    }

    #[test]
    fn comments() {
        assert_eq!("<a@x> ", strip_comments("<a@x> (comment (nested))"));
        assert_eq!("<a(b)@x>", strip_comments("<a(b)@x>"));
        assert_eq!("\"(not)\" x", strip_comments("\"(not)\" x(yes\\))"));
        assert_eq!("Mon, 1 Jan 2024 ", strip_comments("Mon, 1 Jan 2024 (UTC)"));
    }
}
