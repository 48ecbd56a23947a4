//! Backslash escaping of arbitrary bytes into printable ASCII.
//!
//! ## Escape Rules
//!
//! | byte                          | escaped as                    |
//! |-------------------------------|-------------------------------|
//! | `0x07 0x08 0x0C 0x0D 0x09 0x0B` | `\a \b \f \r \t \v`         |
//! | `0x0A`                        | `\n` (Full) or `\` + newline (Human) |
//! | `0x5C`                        | `\\`                          |
//! | other bytes outside `0x20..=0x7E` | `\xHH`, uppercase hex     |
//! | everything else               | itself                        |
//!
//! Decoding accepts the same sequences. An unknown escape letter drops the
//! backslash and keeps the letter, which existing dump files depend on.

use crate::error::{Error, Result};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// How newline bytes are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EscapeMode {
    /// Newlines become `\n`; output is always a single line
    #[default]
    Full,
    /// Newlines become a backslash followed by a real line break
    Human,
}

/// Output of a (possibly bounded) escape operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escaped {
    /// The escaped text
    pub text: String,
    /// Number of input bytes represented in `text`
    pub consumed: usize,
}

impl Escaped {
    /// True if any input byte was written as something other than itself
    pub fn needed_escaping(&self) -> bool {
        self.text.len() != self.consumed
    }

    /// True if fewer than `input_len` bytes made it into the output
    pub fn is_truncated(&self, input_len: usize) -> bool {
        self.consumed < input_len
    }
}

/// Escape `bytes` without an output limit.
pub fn encode(mode: EscapeMode, bytes: &[u8]) -> String {
    encode_bounded(mode, bytes, None).text
}

/// Escape `bytes`, stopping before any escape sequence that would push the
/// output past `limit` bytes.
///
/// Sequences are never split, so a truncated result still decodes cleanly.
pub fn encode_bounded(mode: EscapeMode, bytes: &[u8], limit: Option<usize>) -> Escaped {
    encode_with(mode, false, bytes, limit)
}

/// Escape a record name: Full mode, with `=` written as `\x3D`.
///
/// The text format splits a line at its first unescaped `=`, so a literal
/// `=` inside a name would move the split.
pub fn encode_name(bytes: &[u8], limit: Option<usize>) -> Escaped {
    encode_with(EscapeMode::Full, true, bytes, limit)
}

fn encode_with(mode: EscapeMode, hex_equals: bool, bytes: &[u8], limit: Option<usize>) -> Escaped {
    let mut text = String::with_capacity(bytes.len());
    let mut consumed = 0;
    let mut seq = [0u8; 4];

    for &byte in bytes {
        let len = escape_byte(mode, hex_equals, byte, &mut seq);
        if limit.is_some_and(|max| text.len() + len > max) {
            break;
        }
        // Every sequence is ASCII.
        text.extend(seq[..len].iter().map(|&b| b as char));
        consumed += 1;
    }

    Escaped { text, consumed }
}

/// Write the escape sequence for `byte` into `out`, returning its length
fn escape_byte(mode: EscapeMode, hex_equals: bool, byte: u8, out: &mut [u8; 4]) -> usize {
    let letter = match byte {
        b'\n' => match mode {
            EscapeMode::Full => Some(b'n'),
            EscapeMode::Human => Some(b'\n'),
        },
        0x07 => Some(b'a'),
        0x08 => Some(b'b'),
        0x0C => Some(b'f'),
        b'\r' => Some(b'r'),
        b'\t' => Some(b't'),
        0x0B => Some(b'v'),
        b'\\' => Some(b'\\'),
        _ => None,
    };

    if let Some(letter) = letter {
        out[0] = b'\\';
        out[1] = letter;
        return 2;
    }

    if (0x20..=0x7E).contains(&byte) && !(hex_equals && byte == b'=') {
        out[0] = byte;
        1
    } else {
        out[0] = b'\\';
        out[1] = b'x';
        out[2] = HEX_DIGITS[(byte >> 4) as usize];
        out[3] = HEX_DIGITS[(byte & 0x0F) as usize];
        4
    }
}

/// Reverse [`encode`] in Full mode.
///
/// Human-mode continuations must already have been turned into `\n` escapes;
/// the text layer does that while splitting lines. A backslash that ends the
/// input is kept as a literal backslash.
pub fn decode(text: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    let mut i = 0;

    while i < text.len() {
        let byte = text[i];
        if byte != b'\\' {
            out.push(byte);
            i += 1;
            continue;
        }

        let Some(&letter) = text.get(i + 1) else {
            out.push(b'\\');
            break;
        };

        let decoded = match letter {
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0C,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'v' => 0x0B,
            b'\\' => b'\\',
            b'x' => {
                let value = text
                    .get(i + 2..i + 4)
                    .and_then(parse_hex_pair)
                    .ok_or_else(|| {
                        Error::invalid_escape(i, "\\x must be followed by two hex digits")
                    })?;
                out.push(value);
                i += 4;
                continue;
            }
            other => other,
        };

        out.push(decoded);
        i += 2;
    }

    Ok(out)
}

fn parse_hex_pair(digits: &[u8]) -> Option<u8> {
    let hi = (digits[0] as char).to_digit(16)?;
    let lo = (digits[1] as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}
