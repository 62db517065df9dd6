//! `aws-chunked` streaming payload decoding.
//!
//! The wire format is a sequence of chunks:
//! `<hex_size>;chunk-signature=<hex64>\r\n<hex_size bytes>\r\n`, ending in a
//! zero-size chunk optionally followed by trailer headers. Signature
//! verification happens one layer up in [`crate::sigv4`]; this module only
//! knows how to find chunk boundaries and hand each one back for the caller
//! to verify and concatenate.

use crate::error::AuthError;

/// One decoded chunk: its declared hex signature and its raw data bytes.
/// The zero-size terminal chunk is represented with an empty `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedChunk {
    pub signature_hex: String,
    pub data: Vec<u8>,
}

/// Split an `aws-chunked` body into its constituent chunks, in order,
/// including the terminal zero-size chunk. Trailer headers after the
/// terminal chunk are discarded.
///
/// # Errors
///
/// - [`AuthError::InvalidChunkSize`] if a size header isn't valid hex.
/// - [`AuthError::IncompleteData`] if the buffer ends mid-chunk.
/// - [`AuthError::DecodingFailed`] for any other structural violation
///   (missing `chunk-signature=`, missing trailing newline after data).
pub fn decode_chunks(body: &[u8]) -> Result<Vec<DecodedChunk>, AuthError> {
    let mut chunks = Vec::new();
    let mut cursor = 0usize;

    loop {
        let (header_line, header_end) = read_line(body, cursor)?;
        let (size_part, sig_part) = header_line
            .split_once(';')
            .ok_or_else(|| AuthError::DecodingFailed("missing chunk-signature".to_owned()))?;

        let size = usize::from_str_radix(size_part.trim(), 16)
            .map_err(|_| AuthError::InvalidChunkSize)?;

        let signature_hex = sig_part
            .trim()
            .strip_prefix("chunk-signature=")
            .ok_or_else(|| AuthError::DecodingFailed("missing chunk-signature".to_owned()))?
            .to_owned();

        cursor = header_end;

        if cursor + size > body.len() {
            return Err(AuthError::IncompleteData);
        }
        let data = body[cursor..cursor + size].to_vec();
        cursor += size;

        let (trailing, trailing_end) = read_line(body, cursor)?;
        if !trailing.is_empty() {
            return Err(AuthError::DecodingFailed(
                "expected empty line after chunk data".to_owned(),
            ));
        }
        cursor = trailing_end;

        let is_terminal = size == 0;
        chunks.push(DecodedChunk { signature_hex, data });
        if is_terminal {
            break;
        }
    }

    Ok(chunks)
}

/// Concatenate the data of every non-terminal chunk into the decoded
/// payload.
#[must_use]
pub fn concatenate_payload(chunks: &[DecodedChunk]) -> Vec<u8> {
    chunks.iter().flat_map(|c| c.data.clone()).collect()
}

/// Read one line starting at `start`, tolerating either `\r\n` or a bare
/// `\n` terminator. Returns the line content (without terminator) and the
/// offset immediately following the terminator.
fn read_line(body: &[u8], start: usize) -> Result<(&str, usize), AuthError> {
    if start > body.len() {
        return Err(AuthError::IncompleteData);
    }
    let rest = &body[start..];
    let newline_pos = rest
        .iter()
        .position(|&b| b == b'\n')
        .ok_or(AuthError::IncompleteData)?;

    let mut line_end = newline_pos;
    if line_end > 0 && rest[line_end - 1] == b'\r' {
        line_end -= 1;
    }

    let line = std::str::from_utf8(&rest[..line_end])
        .map_err(|_| AuthError::DecodingFailed("non-UTF-8 chunk header".to_owned()))?;

    Ok((line, start + newline_pos + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_bytes(size_hex: &str, sig: &str, data: &[u8], crlf: bool) -> Vec<u8> {
        let nl: &[u8] = if crlf { b"\r\n" } else { b"\n" };
        let mut out = Vec::new();
        out.extend_from_slice(format!("{size_hex};chunk-signature={sig}").as_bytes());
        out.extend_from_slice(nl);
        out.extend_from_slice(data);
        out.extend_from_slice(nl);
        out
    }

    #[test]
    fn test_should_decode_single_data_chunk_and_terminal_chunk() {
        let mut body = chunk_bytes("4", "aaaa", b"wxyz", true);
        body.extend_from_slice(&chunk_bytes("0", "bbbb", b"", true));

        let chunks = decode_chunks(&body).expect("decodes");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].signature_hex, "aaaa");
        assert_eq!(chunks[0].data, b"wxyz");
        assert_eq!(chunks[1].data, Vec::<u8>::new());
        assert_eq!(concatenate_payload(&chunks), b"wxyz");
    }

    #[test]
    fn test_should_tolerate_lf_only_line_endings() {
        let mut body = chunk_bytes("3", "aaaa", b"abc", false);
        body.extend_from_slice(&chunk_bytes("0", "bbbb", b"", false));

        let chunks = decode_chunks(&body).expect("decodes");
        assert_eq!(concatenate_payload(&chunks), b"abc");
    }

    #[test]
    fn test_should_discard_trailer_headers_after_terminal_chunk() {
        let mut body = chunk_bytes("0", "bbbb", b"", true);
        body.extend_from_slice(b"x-amz-checksum-crc32:deadbeef\r\n\r\n");

        let chunks = decode_chunks(&body).expect("decodes");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_should_reject_invalid_hex_chunk_size() {
        let body = chunk_bytes("zz", "aaaa", b"", true);
        assert_eq!(decode_chunks(&body), Err(AuthError::InvalidChunkSize));
    }

    #[test]
    fn test_should_reject_truncated_chunk_data() {
        let header = b"10;chunk-signature=aaaa\r\nshort\r\n".to_vec();
        assert_eq!(decode_chunks(&header), Err(AuthError::IncompleteData));
    }

    #[test]
    fn test_should_reject_missing_chunk_signature_marker() {
        let body = b"4\r\nwxyz\r\n".to_vec();
        assert!(matches!(decode_chunks(&body), Err(AuthError::DecodingFailed(_))));
    }

    #[test]
    fn test_should_reject_missing_blank_line_after_chunk_data() {
        let body = b"4;chunk-signature=aaaa\r\nwxyz".to_vec();
        assert_eq!(decode_chunks(&body), Err(AuthError::IncompleteData));
    }

    #[test]
    fn test_should_reject_chunk_data_not_followed_by_blank_line() {
        let mut body = b"4;chunk-signature=aaaa\r\nwxyz".to_vec();
        body.extend_from_slice(&chunk_bytes("0", "bbbb", b"", true));
        assert!(matches!(decode_chunks(&body), Err(AuthError::DecodingFailed(_))));
    }
}
