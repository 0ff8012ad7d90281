//! Escape decoding and `${name}` substitution for raw value text.
//!
//! | Input        | Output |
//! |--------------|--------|
//! | `\n` `\t` `\r` | newline, tab, carriage return |
//! | `\X` (any other X) | `X` |
//! | `\` at end of text | `\` |
//! | `\uHHHH` | code point from 1 to 4 hex digits, read greedily |
//! | `\u{H..}` | code point from 1 to 6 hex digits |
//! | `${name}` | value of property `name`, else env var `name` if enabled |
//! | `$` not followed by `{` | `$` |

use crate::env::EnvSource;
use crate::error::FormatError;
use crate::map::PropertyMap;
use crate::property::is_legal_name;

const MAX_SHORT_HEX_DIGITS: usize = 4;
const MAX_BRACED_HEX_DIGITS: usize = 6;

/// Decodes one raw value against the properties parsed so far.
pub struct ValueProcessor<'a> {
    properties: &'a PropertyMap,
    env: &'a EnvSource,
}

impl<'a> ValueProcessor<'a> {
    pub fn new(properties: &'a PropertyMap, env: &'a EnvSource) -> Self {
        Self { properties, env }
    }

    pub fn process(&self, raw: &str) -> Result<String, FormatError> {
        // Fast path: nothing to decode.
        if !raw.contains(['\\', '$']) {
            return Ok(raw.to_string());
        }

        let chars: Vec<char> = raw.chars().collect();
        let mut out = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '\\' => i = self.escape(&chars, i + 1, &mut out)?,
                '$' if chars.get(i + 1) == Some(&'{') => {
                    i = self.substitute(&chars, i + 2, &mut out)?;
                }
                c => {
                    push_char(c, &mut out);
                    i += 1;
                }
            }
        }

        String::from_utf8(out).map_err(|_| {
            FormatError::new("Value contains a Unicode escape that is not a valid character")
        })
    }

    /// Decode the escape whose body starts at `i`; returns the index after it.
    fn escape(&self, chars: &[char], i: usize, out: &mut Vec<u8>) -> Result<usize, FormatError> {
        let Some(&c) = chars.get(i) else {
            out.push(b'\\');
            return Ok(i);
        };
        match c {
            'n' => out.push(b'\n'),
            't' => out.push(b'\t'),
            'r' => out.push(b'\r'),
            'u' => return unicode_escape(chars, i + 1, out),
            other => push_char(other, out),
        }
        Ok(i + 1)
    }

    /// Resolve `${name}` where `start` is just past the `{`.
    fn substitute(
        &self,
        chars: &[char],
        start: usize,
        out: &mut Vec<u8>,
    ) -> Result<usize, FormatError> {
        let Some(len) = chars[start..].iter().position(|&c| c == '}') else {
            let partial: String = chars[start..].iter().collect();
            return Err(FormatError::new(format!(
                "Incomplete property reference \"${{{partial}\""
            )));
        };
        if len == 0 {
            return Err(FormatError::new("Invalid property reference \"${}\""));
        }

        let name: String = chars[start..start + len].iter().collect();
        if !is_legal_name(&name) {
            return Err(FormatError::new(format!(
                "\"${{{name}}}\" does not contain a legal property name"
            )));
        }
        let value = self.resolve(&name)?;
        out.extend_from_slice(value.as_bytes());
        Ok(start + len + 1)
    }

    fn resolve(&self, name: &str) -> Result<String, FormatError> {
        if let Some(p) = self.properties.find(name) {
            return Ok(p.value.clone());
        }
        self.env.lookup(name).ok_or_else(|| {
            FormatError::new(format!("Cannot resolve referenced property \"${{{name}}}\""))
        })
    }
}

/// Decode `\u...` where `i` is just past the `u`.
fn unicode_escape(chars: &[char], i: usize, out: &mut Vec<u8>) -> Result<usize, FormatError> {
    match chars.get(i) {
        None => Err(FormatError::new(
            "Incomplete escape sequence \"\\u\" at end of value",
        )),
        Some('{') => braced_unicode_escape(chars, i + 1, out),
        Some(c) if c.is_ascii_hexdigit() => {
            let mut code_point = 0;
            let mut j = i;
            while j < chars.len() && j - i < MAX_SHORT_HEX_DIGITS {
                let Some(d) = chars[j].to_digit(16) else {
                    break;
                };
                code_point = (code_point << 4) | d;
                j += 1;
            }
            encode_utf8(code_point, out);
            Ok(j)
        }
        Some(c) => Err(FormatError::new(format!(
            "Invalid escape sequence \"\\u{c}\""
        ))),
    }
}

/// Decode `\u{...}` where `start` is just past the `{`.
fn braced_unicode_escape(
    chars: &[char],
    start: usize,
    out: &mut Vec<u8>,
) -> Result<usize, FormatError> {
    let mut code_point = 0;
    let mut j = start;
    loop {
        match chars.get(j) {
            None => {
                return Err(FormatError::new(
                    "Incomplete \\u{} escape sequence at end of value",
                ));
            }
            Some('}') if j == start => {
                return Err(FormatError::new("Invalid escape sequence \"\\u{}\""));
            }
            Some('}') => break,
            Some(c) => {
                let Some(d) = c.to_digit(16) else {
                    return Err(FormatError::new(format!(
                        "Invalid hex digit '{c}' in \\u{{}} escape sequence"
                    )));
                };
                if j - start == MAX_BRACED_HEX_DIGITS {
                    return Err(FormatError::new(
                        "Too many hex digits in \\u{} escape sequence",
                    ));
                }
                code_point = (code_point << 4) | d;
                j += 1;
            }
        }
    }
    encode_utf8(code_point, out);
    Ok(j + 1)
}

fn push_char(c: char, out: &mut Vec<u8>) {
    let mut buf = [0; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

/// Append the UTF-8 encoding of `code_point` to `out`.
///
/// Uses the RFC 2279 variable-length scheme, so code points above U+10FFFF
/// (up to 0x7FFFFFFF) produce 5- and 6-byte sequences. Surrogates are
/// encoded as-is. Neither is valid in a Rust `String`.
pub fn encode_utf8(code_point: u32, out: &mut Vec<u8>) {
    let c = code_point;
    let cont = |shift: u32| 0x80 | ((c >> shift) & 0x3F) as u8;
    match c {
        0..=0x7F => out.push(c as u8),
        0x80..=0x7FF => out.extend_from_slice(&[0xC0 | (c >> 6) as u8, cont(0)]),
        0x800..=0xFFFF => out.extend_from_slice(&[0xE0 | (c >> 12) as u8, cont(6), cont(0)]),
        0x1_0000..=0x1F_FFFF => {
            out.extend_from_slice(&[0xF0 | (c >> 18) as u8, cont(12), cont(6), cont(0)]);
        }
        0x20_0000..=0x3FF_FFFF => out.extend_from_slice(&[
            0xF8 | (c >> 24) as u8,
            cont(18),
            cont(12),
            cont(6),
            cont(0),
        ]),
        _ => out.extend_from_slice(&[
            0xFC | ((c >> 30) & 0x01) as u8,
            cont(24),
            cont(18),
            cont(12),
            cont(6),
            cont(0),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;

    fn props() -> PropertyMap {
        [
            Property::new("host", "example.com", "t", 1),
            Property::new("db.port", "5432", "t", 2),
        ]
        .into_iter()
        .collect()
    }

    fn process(raw: &str) -> Result<String, FormatError> {
        let map = props();
        ValueProcessor::new(&map, &EnvSource::Disabled).process(raw)
    }

    fn error(raw: &str) -> String {
        process(raw).unwrap_err().description
    }

    #[test]
    fn plain_text_is_unchanged() {
        for raw in ["", "hello world", "a = b # c", "100%", "ünïcödé"] {
            assert_eq!(process(raw).unwrap(), raw);
        }
    }

    #[test]
    fn simple_escapes() {
        assert_eq!(process(r"a\nb\tc\rd").unwrap(), "a\nb\tc\rd");
        assert_eq!(process(r"\\ \$ \{ \q").unwrap(), r"\ $ { q");
    }

    #[test]
    fn trailing_backslash_is_literal() {
        assert_eq!(process("abc\\").unwrap(), "abc\\");
    }

    #[test]
    fn dollar_without_brace_is_literal() {
        assert_eq!(process("$5 and $").unwrap(), "$5 and $");
    }

    #[test]
    fn short_unicode_escapes() {
        assert_eq!(process(r"\u41").unwrap(), "A");
        assert_eq!(process(r"\u00e9t\u00E9").unwrap(), "été");
        // greedy up to four digits, then literal text resumes
        assert_eq!(process(r"\u00411").unwrap(), "A1");
        assert_eq!(process(r"\u4x").unwrap(), "\u{4}x");
        assert_eq!(process(r"\u20AC").unwrap(), "€");
    }

    #[test]
    fn braced_unicode_escapes() {
        assert_eq!(process(r"\u{1F600}!").unwrap(), "😀!");
        assert_eq!(process(r"\u{41}\u{000041}").unwrap(), "AA");
    }

    #[test]
    fn unicode_escape_errors_are_distinct() {
        assert!(error(r"\u").contains("Incomplete escape sequence"));
        assert!(error(r"\uxyz").contains("Invalid escape sequence \"\\ux\""));
        assert!(error(r"\u{41").contains("Incomplete \\u{}"));
        assert!(error(r"\u{}").contains("Invalid escape sequence \"\\u{}\""));
        assert!(error(r"\u{4g}").contains("Invalid hex digit 'g'"));
        assert!(error(r"\u{1234567}").contains("Too many hex digits"));
    }

    #[test]
    fn code_point_outside_char_range_fails() {
        assert!(error(r"\uD800").contains("not a valid character"));
        assert!(error(r"\u{110000}").contains("not a valid character"));
    }

    #[test]
    fn substitution_from_properties() {
        assert_eq!(
            process("http://${host}:${db.port}/").unwrap(),
            "http://example.com:5432/"
        );
    }

    #[test]
    fn substituted_values_are_not_reprocessed() {
        let map: PropertyMap = [Property::new("raw", r"\n${x}", "t", 1)].into_iter().collect();
        let out = ValueProcessor::new(&map, &EnvSource::Disabled)
            .process("${raw}")
            .unwrap();
        assert_eq!(out, r"\n${x}");
    }

    #[test]
    fn substitution_errors() {
        assert!(error("${}").contains("Invalid property reference"));
        assert!(error("${host").contains("Incomplete property reference \"${host\""));
        assert!(error("${1abc}").contains("does not contain a legal property name"));
        assert!(error("${a..b}").contains("does not contain a legal property name"));
        assert!(error("${missing}").contains("Cannot resolve referenced property \"${missing}\""));
    }

    #[test]
    fn environment_fallback() {
        let map = props();
        let env = EnvSource::fixed([("HOME_DIR".to_string(), "/home/me".to_string())]);
        let vp = ValueProcessor::new(&map, &env);
        assert_eq!(vp.process("${HOME_DIR}/x").unwrap(), "/home/me/x");
        assert!(vp.process("${NOPE}").is_err());
    }

    #[test]
    fn properties_shadow_environment() {
        let map = props();
        let env = EnvSource::fixed([("host".to_string(), "from-env".to_string())]);
        let out = ValueProcessor::new(&map, &env).process("${host}").unwrap();
        assert_eq!(out, "example.com");
    }

    #[test]
    fn disabled_environment_does_not_resolve() {
        let map = PropertyMap::new();
        let name = "BLOCKCONF_VALUE_RS_TEST_VAR";
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var(name, "x") };
        let raw = format!("${{{name}}}");
        assert!(ValueProcessor::new(&map, &EnvSource::Disabled).process(&raw).is_err());
        assert_eq!(
            ValueProcessor::new(&map, &EnvSource::Process).process(&raw).unwrap(),
            "x"
        );
        unsafe { std::env::remove_var(name) };
    }

    #[test]
    fn encode_utf8_matches_std_for_valid_chars() {
        for c in ['\0', 'A', '\u{7F}', '\u{80}', 'é', '\u{7FF}', '\u{800}', '€', '\u{FFFF}', '\u{10000}', '😀', '\u{10FFFF}'] {
            let mut out = Vec::new();
            encode_utf8(c as u32, &mut out);
            assert_eq!(std::str::from_utf8(&out).unwrap().chars().next(), Some(c));
            assert_eq!(out.len(), c.len_utf8());
        }
    }

    /// Decode one legacy (up to 6 byte) UTF-8 sequence.
    fn decode_legacy(bytes: &[u8]) -> u32 {
        let lead = bytes[0];
        let (len, mut cp) = match lead {
            0x00..=0x7F => return lead as u32,
            0xC0..=0xDF => (2, (lead & 0x1F) as u32),
            0xE0..=0xEF => (3, (lead & 0x0F) as u32),
            0xF0..=0xF7 => (4, (lead & 0x07) as u32),
            0xF8..=0xFB => (5, (lead & 0x03) as u32),
            _ => (6, (lead & 0x01) as u32),
        };
        assert_eq!(bytes.len(), len);
        for b in &bytes[1..] {
            assert_eq!(b & 0xC0, 0x80);
            cp = (cp << 6) | (b & 0x3F) as u32;
        }
        cp
    }

    #[test]
    fn encode_utf8_covers_legacy_range() {
        let cases = [
            (0x7F, 1),
            (0x7FF, 2),
            (0xFFFF, 3),
            (0x1F_FFFF, 4),
            (0x20_0000, 5),
            (0x3FF_FFFF, 5),
            (0x400_0000, 6),
            (0x7FFF_FFFF, 6),
        ];
        for (cp, len) in cases {
            let mut out = Vec::new();
            encode_utf8(cp, &mut out);
            assert_eq!(out.len(), len, "length for {cp:#x}");
            assert_eq!(decode_legacy(&out), cp);
        }
    }
}
