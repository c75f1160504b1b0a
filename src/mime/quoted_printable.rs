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

/// Decodes quoted-printable encoding, as described by RFC 2045.
///
/// `=XX` escapes (either hex case) become the byte they name and soft line
/// breaks (`=` at the end of a line, with either line ending) are discarded.
///
/// This never fails. Invalid or truncated escapes are passed through
/// untransformed, as are 8-bit bytes, since the archived input cannot be
/// corrected after the fact.
pub fn qp_decode(s: &[u8]) -> Vec<u8> {
    let mut decoded = Vec::with_capacity(s.len());
    let mut i = 0;

    while i < s.len() {
        let b = s[i];
        if b'=' != b {
            decoded.push(b);
            i += 1;
            continue;
        }

        let rest = &s[i + 1..];
        if rest.starts_with(b"\n") {
            i += 2;
        } else if rest.starts_with(b"\r\n") {
            i += 3;
        } else if let Some(byte) = rest.get(..2).and_then(hex_byte) {
            decoded.push(byte);
            i += 3;
        } else {
            decoded.push(b'=');
            i += 1;
        }
    }

    decoded
}

fn hex_byte(digits: &[u8]) -> Option<u8> {
    fn nybble(d: u8) -> Option<u8> {
        match d {
            b'0'..=b'9' => Some(d - b'0'),
            b'a'..=b'f' => Some(d - b'a' + 10),
            b'A'..=b'F' => Some(d - b'A' + 10),
            _ => None,
        }
    }

    Some(nybble(digits[0])? << 4 | nybble(digits[1])?)
}


#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::test_support::qp_encode;
    use super::*;

    fn assert_qp(expected: &[u8], input: &[u8]) {
        assert_eq!(
            expected,
            &qp_decode(input)[..],
            "Unexpected result: {:?}",
            String::from_utf8_lossy(&qp_decode(input))
        );
    }

    #[test]
    fn test_qp_decode() {
        assert_qp(b"hello world", b"hello world");
        assert_qp(b"\xabfoo", b"=ABfoo");
        assert_qp(b"fo\xabo", b"fo=abo");
        assert_qp(b"foo\xab", b"foo=AB");
        assert_qp(b"foo\xab\xcdbar", b"foo=AB=CDbar");

        assert_qp(b"foo", b"foo=\n");
        assert_qp(b"foobar", b"foo=\nbar");
        assert_qp(b"foo", b"foo=\r\n");
        assert_qp(b"foobar", b"foo=\r\nbar");
        assert_qp(b"foo\nbar", b"foo\nbar");

        assert_qp(b"foo=()bar", b"foo=()bar");
        assert_qp(b"foo=\xabbar", b"foo==ABbar");
        assert_qp(b"foo=A\xabbar", b"foo=A=ABbar");
        assert_qp("foo=ゑbar".as_bytes(), "foo=ゑbar".as_bytes());
        assert_qp(b"foo=", b"foo=");
        assert_qp(b"foo=A", b"foo=A");
        assert_qp(b"foo=\r", b"foo=\r");
    }

    #[test]
    fn multibyte_utf8() {
        // One sequence of each length
        for s in &["A", "é", "€", "😀"] {
            let encoded = qp_encode(s.as_bytes());
            assert_eq!(s.as_bytes(), &qp_decode(&encoded)[..]);
        }
        assert_qp("€".as_bytes(), b"=E2=82=AC");
        assert_qp("😀".as_bytes(), b"=F0=9F=98=80");
    }

    proptest! {
        #[test]
        fn qp_decode_never_fails_for_bytes(
            s in prop::collection::vec(prop::num::u8::ANY, 0..40)
        ) {
            qp_decode(&s);
        }

        #[test]
        fn qp_round_trip(s in "\\PC*") {
            let decoded = qp_decode(&qp_encode(s.as_bytes()));
            prop_assert_eq!(s.as_bytes(), &decoded[..]);
        }
    }
}
