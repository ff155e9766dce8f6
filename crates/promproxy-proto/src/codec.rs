//! Wire codec for the value grammar.
//!
//! The grammar is RESP-style: every value starts with a one-byte type tag
//! and ends with CRLF, except bulk strings, which are length-prefixed and
//! may carry arbitrary bytes (including embedded CRLFs) before their
//! terminator.
//!
//! Decoding is incremental: [`decode`] returns `Ok(None)` when the buffer
//! holds only a prefix of a value, so callers can read more bytes and try
//! again. A decode error means the stream is corrupt and the connection
//! must be dropped; no resynchronization is attempted.

use crate::error::Error;
use crate::value::Value;

/// Maximum declared bulk-string or array size (4 MB).
/// Large declared lengths could be used for DoS attacks.
pub const MAX_VALUE_SIZE: usize = 4 * 1024 * 1024;

/// Decode one value from the front of `buf` with the default size limit.
///
/// Returns the value and the number of bytes consumed, or `Ok(None)` when
/// more input is needed.
pub fn decode(buf: &[u8]) -> Result<Option<(Value, usize)>, Error> {
    decode_with_limit(buf, MAX_VALUE_SIZE)
}

/// Decode one value from the front of `buf`, bounding declared lengths
/// and element counts by `limit`.
pub fn decode_with_limit(buf: &[u8], limit: usize) -> Result<Option<(Value, usize)>, Error> {
    decode_at(buf, 0, limit)
}

/// Encode a value onto the end of `out`.
pub fn encode(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Simple(s) => {
            out.push(b'+');
            out.extend_from_slice(s.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Value::Error(msg) => {
            out.push(b'-');
            out.extend_from_slice(msg.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Value::Int(i) => {
            out.push(b':');
            out.extend_from_slice(i.to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Value::Bulk(bytes) => {
            out.push(b'$');
            out.extend_from_slice(bytes.len().to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(bytes);
            out.extend_from_slice(b"\r\n");
        }
        Value::Null => {
            out.extend_from_slice(b"$-1\r\n");
        }
        Value::Array(items) => {
            out.push(b'*');
            out.extend_from_slice(items.len().to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            for item in items {
                encode(item, out);
            }
        }
    }
}

/// Encode a value into a fresh buffer.
pub fn encode_to_vec(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode(value, &mut out);
    out
}

/// Decode the value starting at `pos`. Returns the value and the position
/// just past its terminator, or `None` when the buffer ends mid-value.
fn decode_at(buf: &[u8], pos: usize, limit: usize) -> Result<Option<(Value, usize)>, Error> {
    let Some(&tag) = buf.get(pos) else {
        return Ok(None);
    };

    match tag {
        b'+' => Ok(read_line(buf, pos + 1)?
            .map(|(line, end)| (Value::Simple(lossless_text(line)), end))),
        b'-' => Ok(read_line(buf, pos + 1)?
            .map(|(line, end)| (Value::Error(lossless_text(line)), end))),
        b':' => match read_line(buf, pos + 1)? {
            Some((line, end)) => Ok(Some((Value::Int(parse_int(line)?), end))),
            None => Ok(None),
        },
        b'$' => decode_bulk(buf, pos + 1, limit),
        b'*' => decode_array(buf, pos + 1, limit),
        other => Err(Error::UnknownTag(other)),
    }
}

fn decode_bulk(buf: &[u8], pos: usize, limit: usize) -> Result<Option<(Value, usize)>, Error> {
    let Some((line, after_len)) = read_line(buf, pos)? else {
        return Ok(None);
    };
    let len = parse_length(line, limit)?;
    let Some(len) = len else {
        return Ok(Some((Value::Null, after_len)));
    };

    let end = after_len + len + 2;
    if buf.len() < end {
        return Ok(None);
    }
    if &buf[after_len + len..end] != b"\r\n" {
        return Err(Error::Malformed("bulk string missing CRLF terminator".into()));
    }

    let bytes = buf[after_len..after_len + len].to_vec();
    Ok(Some((Value::Bulk(bytes), end)))
}

fn decode_array(buf: &[u8], pos: usize, limit: usize) -> Result<Option<(Value, usize)>, Error> {
    let Some((line, mut cursor)) = read_line(buf, pos)? else {
        return Ok(None);
    };
    let count = parse_length(line, limit)?;
    let Some(count) = count else {
        return Ok(Some((Value::Null, cursor)));
    };

    let mut items = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        match decode_at(buf, cursor, limit)? {
            Some((value, next)) => {
                items.push(value);
                cursor = next;
            }
            None => return Ok(None),
        }
    }
    Ok(Some((Value::Array(items), cursor)))
}

/// Scan a CRLF-terminated line starting at `start`. Returns the line bytes
/// (without CRLF) and the position just past the CRLF, or `None` when the
/// terminator has not arrived yet.
fn read_line(buf: &[u8], start: usize) -> Result<Option<(&[u8], usize)>, Error> {
    let mut i = start;
    while i < buf.len() {
        match buf[i] {
            b'\r' => {
                return match buf.get(i + 1) {
                    Some(b'\n') => Ok(Some((&buf[start..i], i + 2))),
                    Some(_) => Err(Error::Malformed("CR not followed by LF".into())),
                    None => Ok(None),
                };
            }
            b'\n' => return Err(Error::Malformed("bare LF in value header".into())),
            _ => i += 1,
        }
    }
    Ok(None)
}

fn lossless_text(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

fn parse_int(line: &[u8]) -> Result<i64, Error> {
    let text = std::str::from_utf8(line)
        .map_err(|_| Error::InvalidInteger(String::from_utf8_lossy(line).into_owned()))?;
    text.parse()
        .map_err(|_| Error::InvalidInteger(text.to_string()))
}

/// Parse a length header: `None` for the -1 null sentinel, `Some(n)` for a
/// non-negative length within the limit.
fn parse_length(line: &[u8], limit: usize) -> Result<Option<usize>, Error> {
    let len = parse_int(line)?;
    if len == -1 {
        return Ok(None);
    }
    if len < 0 {
        return Err(Error::InvalidLength(len));
    }
    let len = len as usize;
    if len > limit {
        return Err(Error::TooLarge { size: len, max: limit });
    }
    Ok(Some(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: &Value) {
        let encoded = encode_to_vec(value);
        let (decoded, consumed) = decode(&encoded).unwrap().unwrap();
        assert_eq!(&decoded, value);
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn test_simple_string() {
        let (value, consumed) = decode(b"+ok\r\n").unwrap().unwrap();
        assert_eq!(value, Value::simple("ok"));
        assert_eq!(consumed, 5);
        assert_eq!(encode_to_vec(&value), b"+ok\r\n");
    }

    #[test]
    fn test_error_value() {
        let (value, _) = decode(b"-unregistered metric: x\r\n").unwrap().unwrap();
        assert_eq!(value, Value::error("unregistered metric: x"));
    }

    #[test]
    fn test_integer() {
        let (value, _) = decode(b":-42\r\n").unwrap().unwrap();
        assert_eq!(value, Value::Int(-42));
        assert_eq!(encode_to_vec(&Value::Int(1000)), b":1000\r\n");
    }

    #[test]
    fn test_bulk_string() {
        let (value, consumed) = decode(b"$5\r\nhello\r\n").unwrap().unwrap();
        assert_eq!(value, Value::bulk(b"hello".to_vec()));
        assert_eq!(consumed, 11);
    }

    #[test]
    fn test_bulk_string_embedded_crlf() {
        let (value, consumed) = decode(b"$7\r\na\r\nb\r\nc\r\n").unwrap().unwrap();
        assert_eq!(value, Value::bulk(b"a\r\nb\r\nc".to_vec()));
        assert_eq!(consumed, 13);
        roundtrip(&value);
    }

    #[test]
    fn test_empty_bulk_string() {
        let (value, consumed) = decode(b"$0\r\n\r\n").unwrap().unwrap();
        assert_eq!(value, Value::bulk(Vec::new()));
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_null_forms() {
        let (value, consumed) = decode(b"$-1\r\n").unwrap().unwrap();
        assert_eq!(value, Value::Null);
        assert_eq!(consumed, 5);

        let (value, consumed) = decode(b"*-1\r\n").unwrap().unwrap();
        assert_eq!(value, Value::Null);
        assert_eq!(consumed, 5);

        // Null encodes to the bulk form.
        assert_eq!(encode_to_vec(&Value::Null), b"$-1\r\n");
    }

    #[test]
    fn test_array() {
        let input = b"*3\r\n+a\r\n:1\r\n$2\r\nbc\r\n";
        let (value, consumed) = decode(input).unwrap().unwrap();
        assert_eq!(
            value,
            Value::array(vec![
                Value::simple("a"),
                Value::Int(1),
                Value::bulk(b"bc".to_vec()),
            ])
        );
        assert_eq!(consumed, input.len());
        roundtrip(&value);
    }

    #[test]
    fn test_nested_array() {
        let value = Value::array(vec![
            Value::array(vec![Value::bulk(b"0.5".to_vec()), Value::bulk(b"0.05".to_vec())]),
            Value::array(vec![Value::bulk(b"0.9".to_vec()), Value::bulk(b"0.01".to_vec())]),
        ]);
        roundtrip(&value);
    }

    #[test]
    fn test_empty_array() {
        let (value, consumed) = decode(b"*0\r\n").unwrap().unwrap();
        assert_eq!(value, Value::Array(Vec::new()));
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_incomplete_input_needs_more() {
        // Truncated at every prefix length: never an error, never a value.
        let full = b"*2\r\n$5\r\nhello\r\n:42\r\n";
        for cut in 0..full.len() {
            assert!(
                decode(&full[..cut]).unwrap().is_none(),
                "prefix of {cut} bytes should be incomplete"
            );
        }
        assert!(decode(full).unwrap().is_some());
    }

    #[test]
    fn test_trailing_bytes_left_in_buffer() {
        let (value, consumed) = decode(b"+ok\r\n+next\r\n").unwrap().unwrap();
        assert_eq!(value, Value::simple("ok"));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_unknown_tag() {
        assert!(matches!(decode(b"?oops\r\n"), Err(Error::UnknownTag(b'?'))));
    }

    #[test]
    fn test_non_numeric_length() {
        assert!(matches!(
            decode(b"$abc\r\n"),
            Err(Error::InvalidInteger(_))
        ));
        assert!(matches!(decode(b":1.5\r\n"), Err(Error::InvalidInteger(_))));
    }

    #[test]
    fn test_negative_length_other_than_null() {
        assert!(matches!(decode(b"$-2\r\n"), Err(Error::InvalidLength(-2))));
        assert!(matches!(decode(b"*-5\r\n"), Err(Error::InvalidLength(-5))));
    }

    #[test]
    fn test_bulk_missing_terminator() {
        assert!(matches!(
            decode(b"$3\r\nabcXY"),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn test_bare_lf_rejected() {
        assert!(matches!(decode(b"+ok\n"), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_length_limit() {
        let result = decode_with_limit(b"$1048576\r\n", 1024);
        assert!(matches!(result, Err(Error::TooLarge { size: 1048576, max: 1024 })));
    }
}
