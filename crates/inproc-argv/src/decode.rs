//! Manual UTF-8 decoding into wide units
//!
//! These decoders need no platform facility, which makes them the portable
//! ends of every conversion chain: [`decode_strict`] rejects malformed input,
//! [`decode_lenient`] skips a malformed byte and resynchronises on the next.

use std::collections::TryReserveError;

/// A wide code unit the decoders can emit.
pub trait WideUnit: Copy + Default + PartialEq {
    /// Push the encoding of `c`: one unit, or a surrogate pair for 16-bit
    /// units and a code point outside the Basic Multilingual Plane.
    fn push_char(out: &mut Vec<Self>, c: char);
}

impl WideUnit for u16 {
    fn push_char(out: &mut Vec<Self>, c: char) {
        let mut pair = [0u16; 2];
        out.extend_from_slice(c.encode_utf16(&mut pair));
    }
}

impl WideUnit for u32 {
    fn push_char(out: &mut Vec<Self>, c: char) {
        out.push(u32::from(c));
    }
}

/// Outcome of decoding one sequence at the start of a byte slice
enum Step {
    Char(char, usize),
    Malformed,
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

fn decode_one(input: &[u8]) -> Step {
    let lead = input[0];
    let (width, initial, min) = match lead {
        0x00..=0x7F => return Step::Char(char::from(lead), 1),
        0xC2..=0xDF => (2, u32::from(lead & 0x1F), 0x80),
        0xE0..=0xEF => (3, u32::from(lead & 0x0F), 0x800),
        0xF0..=0xF4 => (4, u32::from(lead & 0x07), 0x1_0000),
        _ => return Step::Malformed,
    };

    let Some(tail) = input.get(1..width) else {
        return Step::Malformed;
    };
    if !tail.iter().copied().all(is_continuation) {
        return Step::Malformed;
    }

    let code = tail
        .iter()
        .fold(initial, |acc, &b| (acc << 6) | u32::from(b & 0x3F));
    if code < min {
        return Step::Malformed;
    }
    // Rejects surrogates and anything past U+10FFFF.
    match char::from_u32(code) {
        Some(c) => Step::Char(c, width),
        None => Step::Malformed,
    }
}

fn reserve<U>(input: &[u8]) -> Result<Vec<U>, TryReserveError> {
    // Never more units than input bytes; the extra slot is for the NUL.
    let mut out = Vec::new();
    out.try_reserve_exact(input.len().saturating_add(1))?;
    Ok(out)
}

/// Decode `input`, skipping each byte that does not start a well-formed
/// sequence (truncated tails, stray continuation bytes, invalid leads,
/// overlong forms, encoded surrogates) and resuming at the next byte.
///
/// No terminator is appended.
pub fn decode_lenient<U: WideUnit>(input: &[u8]) -> Result<Vec<U>, TryReserveError> {
    let mut out = reserve(input)?;
    let mut pos = 0;
    while pos < input.len() {
        match decode_one(&input[pos..]) {
            Step::Char(c, width) => {
                U::push_char(&mut out, c);
                pos += width;
            }
            Step::Malformed => pos += 1,
        }
    }
    Ok(out)
}

/// Decode `input`, returning `Ok(None)` at the first malformed sequence.
pub fn decode_strict<U: WideUnit>(input: &[u8]) -> Result<Option<Vec<U>>, TryReserveError> {
    let mut out = reserve(input)?;
    let mut pos = 0;
    while pos < input.len() {
        match decode_one(&input[pos..]) {
            Step::Char(c, width) => {
                U::push_char(&mut out, c);
                pos += width;
            }
            Step::Malformed => return Ok(None),
        }
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn utf32(text: &str) -> Vec<u32> {
        text.chars().map(u32::from).collect()
    }

    #[test]
    fn test_ascii_and_multibyte() {
        let out: Vec<u32> = decode_lenient("a é € 😀".as_bytes()).unwrap();
        assert_eq!(out, utf32("a é € 😀"));

        let out: Vec<u16> = decode_lenient("a é €".as_bytes()).unwrap();
        assert_eq!(out, "a é €".encode_utf16().collect::<Vec<_>>());
    }

    #[test]
    fn test_astral_code_point_becomes_surrogate_pair() {
        let out: Vec<u16> = decode_lenient("😀".as_bytes()).unwrap();
        assert_eq!(out.len(), 2);
        assert!((0xD800..0xDC00).contains(&out[0]));
        assert!((0xDC00..0xE000).contains(&out[1]));
        assert_eq!(out, vec![0xD83D, 0xDE00]);

        let out: Vec<u32> = decode_lenient("😀".as_bytes()).unwrap();
        assert_eq!(out, vec![0x1F600]);
    }

    #[test]
    fn test_truncated_trailing_sequence_is_skipped() {
        let mut input = b"abc".to_vec();
        input.extend_from_slice(&"é".as_bytes()[..1]);
        let out: Vec<u32> = decode_lenient(&input).unwrap();
        assert_eq!(out, utf32("abc"));

        let mut input = b"x".to_vec();
        input.extend_from_slice(&"😀".as_bytes()[..3]);
        let out: Vec<u32> = decode_lenient(&input).unwrap();
        // Lead and both continuation bytes are skipped one at a time.
        assert_eq!(out, utf32("x"));
    }

    #[test]
    fn test_resynchronises_after_invalid_lead() {
        let out: Vec<u32> = decode_lenient(b"a\xFFb\x80c").unwrap();
        assert_eq!(out, utf32("abc"));

        // A truncated lead followed by a valid ASCII byte keeps the ASCII byte.
        let out: Vec<u32> = decode_lenient(b"\xE2\x82z").unwrap();
        assert_eq!(out, utf32("z"));
    }

    #[test]
    fn test_rejects_overlong_and_surrogate_encodings() {
        // Overlong '/' and an encoded U+D800.
        assert_eq!(decode_lenient::<u32>(b"\xC0\xAF").unwrap(), Vec::<u32>::new());
        assert_eq!(decode_lenient::<u32>(b"\xE0\x80\xAF").unwrap(), Vec::<u32>::new());
        assert_eq!(decode_lenient::<u32>(b"\xED\xA0\x80").unwrap(), Vec::<u32>::new());
        // Past U+10FFFF.
        assert_eq!(decode_lenient::<u32>(b"\xF4\x90\x80\x80").unwrap(), Vec::<u32>::new());
    }

    #[test]
    fn test_strict_rejects_what_lenient_skips() {
        assert_eq!(decode_strict::<u32>(b"ok").unwrap(), Some(utf32("ok")));
        assert_eq!(decode_strict::<u32>(b"bad\xFF").unwrap(), None);
        assert_eq!(decode_strict::<u16>(b"").unwrap(), Some(Vec::new()));
    }

    proptest! {
        #[test]
        fn prop_valid_utf8_matches_std(text in "\\PC{0,40}") {
            let wide: Vec<u16> = decode_lenient(text.as_bytes()).unwrap();
            prop_assert_eq!(wide, text.encode_utf16().collect::<Vec<_>>());

            let wide: Vec<u32> = decode_strict(text.as_bytes()).unwrap().unwrap();
            prop_assert_eq!(wide, utf32(&text));
        }

        #[test]
        fn prop_lenient_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let wide: Vec<u32> = decode_lenient(&bytes).unwrap();
            prop_assert!(wide.len() <= bytes.len());
            prop_assert!(wide.iter().all(|&u| char::from_u32(u).is_some()));
        }
    }
}
