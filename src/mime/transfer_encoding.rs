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

use encoding_rs::{DecoderResult, Encoding, UTF_8};
use log::debug;

use super::quoted_printable::qp_decode;

/// A `Content-Transfer-Encoding` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferEncoding {
    SevenBit,
    EightBit,
    Binary,
    QuotedPrintable,
    Base64,
    /// Anything else. The body is passed through untouched.
    Unknown,
}

impl Default for TransferEncoding {
    fn default() -> Self {
        TransferEncoding::SevenBit
    }
}

impl TransferEncoding {
    /// Interpret a `Content-Transfer-Encoding` header value. Matching is
    /// case-insensitive and ignores surrounding whitespace and comments.
    pub fn parse(value: &str) -> Self {
        let value = value.split('(').next().unwrap_or("").trim();
        if value.eq_ignore_ascii_case("7bit") {
            TransferEncoding::SevenBit
        } else if value.eq_ignore_ascii_case("8bit") {
            TransferEncoding::EightBit
        } else if value.eq_ignore_ascii_case("binary") {
            TransferEncoding::Binary
        } else if value.eq_ignore_ascii_case("quoted-printable") {
            TransferEncoding::QuotedPrintable
        } else if value.eq_ignore_ascii_case("base64") {
            TransferEncoding::Base64
        } else {
            TransferEncoding::Unknown
        }
    }
}

/// Look up the `encoding_rs` encoding for a MIME charset label.
pub fn charset_encoding(charset: &str) -> Option<&'static Encoding> {
    Encoding::for_label_no_replacement(charset.trim().as_bytes())
}

/// Decode `bytes` as text in `charset` (UTF-8 if absent or unknown).
///
/// Each byte of a sequence that is malformed in that charset is instead
/// mapped to the code point of the same value (i.e. ISO-8859-1). The
/// well-formed text around it is decoded normally.
pub fn decode_charset(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset.and_then(charset_encoding).unwrap_or(UTF_8);
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    let mut malformed = 0usize;

    loop {
        let needed = decoder
            .max_utf8_buffer_length_without_replacement(rest.len())
            .unwrap_or(rest.len());
        out.reserve(needed.max(4));

        let (result, read) =
            decoder.decode_to_string_without_replacement(rest, &mut out, true);
        match result {
            DecoderResult::InputEmpty => break,
            DecoderResult::OutputFull => (),
            DecoderResult::Malformed(bad_len, consumed_after) => {
                let end = read.saturating_sub(usize::from(consumed_after));
                let start = end.saturating_sub(usize::from(bad_len));
                out.extend(rest[start..end].iter().map(|&b| char::from(b)));
                malformed += 1;
            }
        }
        rest = &rest[read..];
    }

    if malformed > 0 {
        debug!(
            "{} malformed {} sequence(s) decoded as ISO-8859-1",
            malformed,
            encoding.name()
        );
    }
    out
}

/// Decode a message body according to its transfer encoding, then its
/// charset.
///
/// Body decoding never fails: malformed base64 and unknown transfer
/// encodings yield the raw body as text.
pub fn decode_body(
    body: &[u8],
    encoding: TransferEncoding,
    charset: Option<&str>,
) -> String {
    let bytes: Cow<[u8]> = match encoding {
        TransferEncoding::SevenBit
        | TransferEncoding::EightBit
        | TransferEncoding::Binary => Cow::Borrowed(body),
        TransferEncoding::QuotedPrintable => Cow::Owned(qp_decode(body)),
        TransferEncoding::Base64 => {
            let compact: Vec<u8> = body
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            match base64::decode(&compact) {
                Ok(decoded) => Cow::Owned(decoded),
                Err(e) => {
                    debug!("Undecodable base64 body ({}); keeping as is", e);
                    Cow::Borrowed(body)
                }
            }
        }
        TransferEncoding::Unknown => {
            return String::from_utf8_lossy(body).into_owned();
        }
    };

    decode_charset(&bytes, charset)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parse_transfer_encoding() {
        assert_eq!(TransferEncoding::SevenBit, TransferEncoding::parse("7BIT"));
        assert_eq!(TransferEncoding::EightBit, TransferEncoding::parse(" 8bit"));
        assert_eq!(TransferEncoding::Binary, TransferEncoding::parse("Binary"));
        assert_eq!(
            TransferEncoding::QuotedPrintable,
            TransferEncoding::parse("Quoted-Printable (because)")
        );
        assert_eq!(TransferEncoding::Base64, TransferEncoding::parse("BASE64"));
        assert_eq!(
            TransferEncoding::Unknown,
            TransferEncoding::parse("x-uuencode")
        );
    }

    #[test]
    fn decode_identity() {
        assert_eq!(
            "hello\n",
            decode_body(b"hello\n", TransferEncoding::SevenBit, None)
        );
        assert_eq!(
            "Grüße\n",
            decode_body(
                "Grüße\n".as_bytes(),
                TransferEncoding::EightBit,
                Some("utf-8")
            )
        );
        assert_eq!(
            "Grüße",
            decode_body(b"Gr\xfc\xdfe", TransferEncoding::EightBit, Some("iso-8859-1"))
        );
    }

    #[test]
    fn decode_qp_with_charset() {
        assert_eq!(
            "That is not dead which can eternal lie.\n\
             And with strange æons even death may die.",
            decode_body(
                b"That is not dead =\n\
                  which can eternal lie.=0A=\r\n\
                  And with strange =E6ons =\n\
                  even death may die.",
                TransferEncoding::QuotedPrintable,
                Some("ISO-8859-1")
            )
        );
    }

    #[test]
    fn invalid_utf8_falls_back_to_latin1() {
        assert_eq!(
            "caf\u{e9} \u{ff}",
            decode_body(b"caf=E9 =FF", TransferEncoding::QuotedPrintable, None)
        );
        assert_eq!(
            "caf\u{e9}",
            decode_body(b"caf\xe9", TransferEncoding::EightBit, Some("x-bogus"))
        );
    }

    #[test]
    fn malformed_sequences_fall_back_individually() {
        assert_eq!(
            "na\u{ef}ve caf\u{e9} \u{ff}",
            decode_body(
                b"na=C3=AFve caf=C3=A9 =FF",
                TransferEncoding::QuotedPrintable,
                Some("utf-8")
            )
        );
        assert_eq!(
            "\u{2014} \u{80}x \u{2014}",
            decode_charset(b"\xe2\x80\x94 \x80x \xe2\x80\x94", None)
        );
        // Truncated sequence at the very end
        assert_eq!("ok \u{e2}\u{80}", decode_charset(b"ok \xe2\x80", None));
    }

    #[test]
    fn decode_base64() {
        assert_eq!(
            "That is not dead which can eternal lie.",
            decode_body(
                b"VGhhdCBpcyBub3QgZGVhZCB3aGljaCBj\n\
                  YW4gZXRlcm5hbCBsaWUu\n",
                TransferEncoding::Base64,
                None
            )
        );
        assert_eq!(
            "一緒に一番許されないことをしよう",
            decode_body(
                b"iOqPj4LJiOqU1IuWgrOC6oLIgqKCsYLGgvCCtYLmgqQ=\r\n",
                TransferEncoding::Base64,
                Some("SHIFT-JIS")
            )
        );
        // Garbage is passed through rather than failing
        assert_eq!(
            "not base64!",
            decode_body(b"not base64!", TransferEncoding::Base64, None)
        );
    }

    #[test]
    fn unknown_encoding_passes_through() {
        assert_eq!(
            "begin 644 x\n=ab\n",
            decode_body(b"begin 644 x\n=ab\n", TransferEncoding::Unknown, None)
        );
    }

    proptest! {
        #[test]
        fn base64_round_trip(s in "\\PC*") {
            let encoded = base64::encode(s.as_bytes()).into_bytes();
            // Wrap like a mailer would
            let mut wrapped = Vec::new();
            for chunk in encoded.chunks(76) {
                wrapped.extend_from_slice(chunk);
                wrapped.push(b'\n');
            }
            prop_assert_eq!(
                s,
                decode_body(&wrapped, TransferEncoding::Base64, Some("utf-8"))
            );
        }

        #[test]
        fn decode_body_never_panics(
            s in prop::collection::vec(prop::num::u8::ANY, 0..64)
        ) {
            decode_body(&s, TransferEncoding::QuotedPrintable, Some("utf-8"));
            decode_body(&s, TransferEncoding::Base64, Some("koi8-r"));
        }
    }
}
