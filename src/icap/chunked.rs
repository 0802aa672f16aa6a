//! Chunked transfer coding of encapsulated bodies.
//!
//! ICAP always chunks bodies. A preview ends with a zero chunk, and the
//! `ieof` extension on that chunk marks the body as complete.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::IcapError;

/// Longest chunk-size or trailer line accepted.
const MAX_LINE: usize = 1024;

/// Read chunks into `data` until the terminating zero chunk.
///
/// Returns whether the zero chunk carried `ieof`.
pub async fn read_chunked<R>(reader: &mut R, data: &mut Vec<u8>, limit: usize) -> Result<bool, IcapError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let line = read_line(reader).await?;
        let line = std::str::from_utf8(&line)
            .map_err(|_| IcapError::MalformedChunk("size line is not UTF-8".into()))?;

        let mut fields = line.split(';');
        let size_field = fields.next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_field, 16)
            .map_err(|_| IcapError::MalformedChunk(format!("bad chunk size '{size_field}'")))?;
        let ieof = fields.any(|ext| ext.trim() == "ieof");

        if size == 0 {
            // Trailer section, ended by an empty line.
            while !read_line(reader).await?.is_empty() {}
            return Ok(ieof);
        }

        if data.len().saturating_add(size) > limit {
            return Err(IcapError::TooLarge {
                what: "encapsulated body",
                limit,
            });
        }

        let start = data.len();
        data.resize(start + size, 0);
        reader
            .read_exact(&mut data[start..])
            .await
            .map_err(eof_or_io)?;

        if !read_line(reader).await?.is_empty() {
            return Err(IcapError::MalformedChunk("chunk data not followed by CRLF".into()));
        }
    }
}

/// One line without its terminator.
async fn read_line<R>(reader: &mut R) -> Result<Vec<u8>, IcapError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    (&mut *reader)
        .take(MAX_LINE as u64)
        .read_until(b'\n', &mut line)
        .await?;

    match line.last() {
        Some(b'\n') => {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            Ok(line)
        }
        _ if line.len() == MAX_LINE => Err(IcapError::MalformedChunk("line too long".into())),
        _ => Err(IcapError::UnexpectedEof),
    }
}

fn eof_or_io(e: std::io::Error) -> IcapError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        IcapError::UnexpectedEof
    } else {
        IcapError::Io(e)
    }
}

/// Append `data` as a single chunk followed by the zero chunk.
pub fn encode_chunked(data: &[u8], out: &mut Vec<u8>) {
    if !data.is_empty() {
        out.extend_from_slice(format!("{:x}\r\n", data.len()).as_bytes());
        out.extend_from_slice(data);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"0\r\n\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn read(input: &[u8], limit: usize) -> Result<(Vec<u8>, bool), IcapError> {
        let mut reader = BufReader::new(input);
        let mut data = Vec::new();
        let ieof = read_chunked(&mut reader, &mut data, limit).await?;
        Ok((data, ieof))
    }

    #[tokio::test]
    async fn reads_multiple_chunks() {
        let (data, ieof) = read(b"5\r\nhello\r\n6;name=v\r\n world\r\n0\r\n\r\n", 64).await.unwrap();
        assert_eq!(data, b"hello world");
        assert!(!ieof);
    }

    #[tokio::test]
    async fn ieof_on_zero_chunk() {
        let (data, ieof) = read(b"0; ieof\r\n\r\n", 64).await.unwrap();
        assert!(data.is_empty());
        assert!(ieof);
    }

    #[tokio::test]
    async fn preview_then_remainder_accumulate() {
        let mut reader = BufReader::new(&b"3\r\nabc\r\n0\r\n\r\n3\r\ndef\r\n0\r\n\r\n"[..]);
        let mut data = Vec::new();
        assert!(!read_chunked(&mut reader, &mut data, 64).await.unwrap());
        assert!(!read_chunked(&mut reader, &mut data, 64).await.unwrap());
        assert_eq!(data, b"abcdef");
    }

    #[tokio::test]
    async fn limit_and_framing_errors() {
        assert!(matches!(
            read(b"10\r\n0123456789abcdef\r\n0\r\n\r\n", 8).await,
            Err(IcapError::TooLarge { .. })
        ));
        assert!(matches!(read(b"zz\r\n", 8).await, Err(IcapError::MalformedChunk(_))));
        assert!(matches!(read(b"3\r\nabcX\r\n", 8).await, Err(IcapError::MalformedChunk(_))));
        assert!(matches!(read(b"5\r\nab", 8).await, Err(IcapError::UnexpectedEof)));
    }

    #[test]
    fn encodes_single_chunk() {
        let mut out = Vec::new();
        encode_chunked(b"0123456789abcdefX", &mut out);
        assert_eq!(out, b"11\r\n0123456789abcdefX\r\n0\r\n\r\n");

        let mut empty = Vec::new();
        encode_chunked(b"", &mut empty);
        assert_eq!(empty, b"0\r\n\r\n");
    }
}
