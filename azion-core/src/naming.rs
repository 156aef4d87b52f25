//! Function name ⇄ directory name codec.
//!
//! Remote names may contain `/`, which cannot appear in a path segment. The
//! slash is swapped for its look-alike U+2215 (`∕`) so the directory still
//! reads naturally, and every character that would be ambiguous or illegal in
//! a path segment is percent-escaped as UTF-8 bytes:
//!
//! ```text
//! "api/v1"      → "api∕v1"
//! "a∕b"         → "a%E2%88%95b"   (literal look-alike)
//! "50%: off"    → "50%25%3A off"
//! ".."          → "%2E%2E"
//! ```
//!
//! Decoding only accepts canonical encodings, so the codec is a bijection
//! between non-empty names and the directory names it produces.

use percent_encoding::{percent_decode_str, percent_encode_byte};

use crate::error::CoreError;

/// Stand-in for `/` inside directory names.
pub const SLASH_LOOKALIKE: char = '\u{2215}';

/// Encode a function name into a single filesystem-safe path segment.
pub fn encode_name(name: &str) -> Result<String, CoreError> {
    if name.is_empty() {
        return Err(CoreError::InvalidName {
            name: name.to_owned(),
            reason: "name is empty".to_owned(),
        });
    }

    let only_dots = name.chars().all(|c| c == '.');
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c == '/' {
            out.push(SLASH_LOOKALIKE);
        } else if only_dots || needs_escape(c) {
            push_escaped(&mut out, c);
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Reverse of [`encode_name`].
pub fn decode_name(encoded: &str) -> Result<String, CoreError> {
    let invalid = |reason: &str| CoreError::InvalidEncoding {
        encoded: encoded.to_owned(),
        reason: reason.to_owned(),
    };

    if encoded.is_empty() {
        return Err(invalid("directory name is empty"));
    }
    if encoded.contains('/') {
        return Err(invalid("raw '/' is not a valid path segment"));
    }
    check_escapes(encoded).map_err(|reason| invalid(&reason))?;

    // The look-alike must be swapped before percent-decoding: an escaped
    // literal look-alike decodes to itself, not to '/'.
    let swapped = encoded.replace(SLASH_LOOKALIKE, "/");
    let decoded = percent_decode_str(&swapped)
        .decode_utf8()
        .map_err(|_| invalid("escaped bytes are not valid UTF-8"))?
        .into_owned();

    if encode_name(&decoded)? != encoded {
        return Err(invalid("not a canonical encoding"));
    }
    Ok(decoded)
}

fn needs_escape(c: char) -> bool {
    c == '%'
        || c == SLASH_LOOKALIKE
        || c.is_control()
        || matches!(c, '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
}

fn push_escaped(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    for byte in c.encode_utf8(&mut buf).bytes() {
        out.push_str(percent_encode_byte(byte));
    }
}

fn check_escapes(encoded: &str) -> Result<(), String> {
    let bytes = encoded.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(format!("truncated or non-hex escape at byte {i}"));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}
