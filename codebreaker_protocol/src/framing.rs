// Line-oriented framing over TCP.
//
// The Code Breaker wire format is plain UTF-8 text, one message per
// newline-terminated line. Both helpers operate on generic `Read`/`Write`
// streams so session code and tests can run them over `TcpStream`,
// `Cursor`, or anything else.
//
// A `MAX_LINE_BYTES` guard protects against unbounded buffering from a
// client that never sends a newline. Guesses and restart answers are a
// handful of bytes; 512 is generous headroom.

use std::io::{self, BufRead, Read, Write};

/// Maximum accepted inbound line length, including the newline. A client
/// exceeding this is treated as misbehaving and its read fails.
pub const MAX_LINE_BYTES: usize = 512;

/// Write one message line: the payload followed by `\n`, then flush.
///
/// The payload must not itself contain a newline — that would be two
/// frames on the wire.
pub fn write_line<W: Write>(writer: &mut W, text: &str) -> io::Result<()> {
    debug_assert!(!text.contains('\n'), "payload must be a single line");
    writer.write_all(text.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Read one line, trimmed of the trailing newline and any surrounding
/// whitespace. Returns `Ok(None)` on a clean EOF before any bytes arrive.
///
/// Returns `InvalidData` if `MAX_LINE_BYTES` arrive without a newline.
pub fn read_trimmed_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = String::new();
    let n = reader
        .by_ref()
        .take(MAX_LINE_BYTES as u64)
        .read_line(&mut buf)?;
    if n == 0 {
        return Ok(None);
    }
    if !buf.ends_with('\n') && n == MAX_LINE_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line exceeds {MAX_LINE_BYTES} bytes"),
        ));
    }
    Ok(Some(buf.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_single_line() {
        let mut wire = Vec::new();
        write_line(&mut wire, "It's your turn. Enter your guess:").unwrap();

        let mut cursor = Cursor::new(&wire);
        let line = read_trimmed_line(&mut cursor).unwrap();
        assert_eq!(line.as_deref(), Some("It's your turn. Enter your guess:"));
    }

    #[test]
    fn trims_carriage_return_and_spaces() {
        let mut cursor = Cursor::new(b"  1234 \r\n".to_vec());
        let line = read_trimmed_line(&mut cursor).unwrap();
        assert_eq!(line.as_deref(), Some("1234"));
    }

    #[test]
    fn eof_returns_none() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(read_trimmed_line(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn multiple_lines_in_sequence() {
        let mut wire = Vec::new();
        for msg in ["first", "second", "third"] {
            write_line(&mut wire, msg).unwrap();
        }
        let mut cursor = Cursor::new(&wire);
        for expected in ["first", "second", "third"] {
            assert_eq!(
                read_trimmed_line(&mut cursor).unwrap().as_deref(),
                Some(expected)
            );
        }
    }

    #[test]
    fn rejects_unterminated_oversized_line() {
        let big = vec![b'9'; MAX_LINE_BYTES + 10];
        let mut cursor = Cursor::new(big);
        let err = read_trimmed_line(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn empty_line_is_empty_string_not_eof() {
        let mut cursor = Cursor::new(b"\n1234\n".to_vec());
        assert_eq!(read_trimmed_line(&mut cursor).unwrap().as_deref(), Some(""));
        assert_eq!(
            read_trimmed_line(&mut cursor).unwrap().as_deref(),
            Some("1234")
        );
    }
}
