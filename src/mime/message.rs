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

//! The structured view of one archived mail.

use std::fmt;

use chrono::prelude::*;
use log::debug;
use serde::Serialize;

use super::encoded_word::decode_header_value;
use super::header::{
    content_type_charset, find_header, split_message, strip_comments, unfold,
};
use super::threading;
use super::transfer_encoding::{decode_body, TransferEncoding};
use crate::support::error::Error;

/// The decoded form of one message from the archive.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MailRecord {
    /// The `Message-ID`, without angle brackets.
    pub message_id: Option<String>,
    pub from: Sender,
    pub to: AddressList,
    pub cc: AddressList,
    /// The unfolded, decoded subject.
    pub subject: String,
    pub date: Option<DateTime<FixedOffset>>,
    /// The body after transfer and charset decoding.
    pub body: String,
    /// Ancestor message ids, `In-Reply-To` first, then `References`.
    pub references: Vec<String>,
    /// Every header field in order, values decoded but still folded.
    pub headers: Vec<(String, String)>,
}

impl MailRecord {
    /// The first header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Sender {
    pub name: String,
    pub email: String,
}

impl Sender {
    fn parse(value: &str) -> Self {
        let value = unfold(value);
        let value = value.trim();

        if let (Some(lt), Some(gt)) = (value.rfind('<'), value.rfind('>')) {
            if lt < gt {
                let name = unquote(strip_comments(&value[..lt]).trim());
                return Sender {
                    name,
                    email: value[lt + 1..gt].trim().to_owned(),
                };
            }
        }

        // Old style `user@host (Full Name)`
        if let (Some(open), Some(close)) = (value.find('('), value.rfind(')'))
        {
            if open < close {
                return Sender {
                    name: value[open + 1..close].trim().to_owned(),
                    email: value[..open].trim().to_owned(),
                };
            }
        }

        Sender {
            name: String::new(),
            email: value.to_owned(),
        }
    }

    /// The name to show for this sender, falling back to the address.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "<{}>", self.email)
        } else {
            write!(f, "{} <{}>", self.name, self.email)
        }
    }
}

fn unquote(s: &str) -> String {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].replace("\\\"", "\"").replace("\\\\", "\\")
    } else {
        s.to_owned()
    }
}

/// A `To` or `Cc` value, kept exactly as folded in the original message so
/// that it can be copied into follow-up mails.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AddressList(pub String);

impl AddressList {
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The list with folding removed.
    pub fn plain(&self) -> String {
        unfold(&self.0)
    }

    /// The bare addresses in the list, in order.
    pub fn addresses(&self) -> Vec<String> {
        let plain = strip_comments(&self.plain());
        let mut addresses = Vec::new();

        for element in split_unquoted_commas(&plain) {
            let element = element.trim();
            if element.is_empty() {
                continue;
            }

            if let (Some(lt), Some(gt)) = (element.rfind('<'), element.rfind('>'))
            {
                if lt < gt {
                    addresses.push(element[lt + 1..gt].trim().to_owned());
                    continue;
                }
            }

            // Group syntax `name: a@x, b@y;` leaves a prefix on the first
            // element and a suffix on the last.
            let bare = element
                .rsplit(':')
                .next()
                .unwrap_or(element)
                .trim_end_matches(';')
                .trim();
            if bare.contains('@') {
                addresses.push(bare.to_owned());
            }
        }

        addresses
    }

    /// Whether `email` is one of the addresses, ignoring case.
    pub fn contains(&self, email: &str) -> bool {
        self.addresses()
            .iter()
            .any(|a| a.eq_ignore_ascii_case(email))
    }
}

fn split_unquoted_commas(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quote = false;
    let mut in_angle = false;
    let mut start = 0;

    for (ix, ch) in s.char_indices() {
        match ch {
            '"' => in_quote = !in_quote,
            '<' if !in_quote => in_angle = true,
            '>' if !in_quote => in_angle = false,
            ',' if !in_quote && !in_angle => {
                parts.push(&s[start..ix]);
                start = ix + 1;
            }
            _ => (),
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Parse one raw message.
///
/// Only an unusable header block is an error. Problems with the body (bad
/// base64, unknown charsets, unknown transfer encodings) degrade to the most
/// faithful text available.
pub fn parse_message(raw: &[u8]) -> Result<MailRecord, Error> {
    let (raw_headers, raw_body) = split_message(raw)?;

    let transfer_encoding = find_header(&raw_headers, "Content-Transfer-Encoding")
        .map(|v| TransferEncoding::parse(&unfold(v)))
        .unwrap_or_default();
    let charset =
        find_header(&raw_headers, "Content-Type").and_then(content_type_charset);
    let body = decode_body(&raw_body, transfer_encoding, charset.as_deref());

    let message_id = threading::message_id(&raw_headers);
    let references = threading::references(&raw_headers);

    let date = find_header(&raw_headers, "Date").and_then(|v| {
        let v = strip_comments(&unfold(v));
        match DateTime::parse_from_rfc2822(v.trim()) {
            Ok(date) => Some(date),
            Err(e) => {
                debug!("Ignoring unparsable date {:?}: {}", v, e);
                None
            }
        }
    });

    let headers: Vec<(String, String)> = raw_headers
        .into_iter()
        .map(|(name, value)| {
            let value = decode_header_value(&value).into_owned();
            (name, value)
        })
        .collect();

    let from = find_header(&headers, "From")
        .map(Sender::parse)
        .unwrap_or_default();
    let to = AddressList(find_header(&headers, "To").unwrap_or("").to_owned());
    let cc = AddressList(find_header(&headers, "Cc").unwrap_or("").to_owned());
    let subject = find_header(&headers, "Subject")
        .map(|s| unfold(s).trim().to_owned())
        .unwrap_or_default();

    Ok(MailRecord {
        message_id,
        from,
        to,
        cc,
        subject,
        date,
        body,
        references,
        headers,
    })
}
