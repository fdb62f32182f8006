//! Wire codec
//!
//! Converts between socket bytes and text for both directions. Under
//! `Framing::Raw` each read of up to `chunk_size` bytes is one message, so a
//! logical message may arrive split or coalesced and callers must buffer if
//! they care. `Framing::Lines` restores message boundaries with `\n`.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use crate::config::{Framing, TextEncoding, WireConfig};
use crate::error::CodecError;

impl TextEncoding {
    /// Decode inbound bytes into text
    pub fn decode(self, bytes: &[u8]) -> Result<String, CodecError> {
        if self == TextEncoding::Ascii {
            ensure_ascii(bytes)?;
        }
        Ok(std::str::from_utf8(bytes)?.to_owned())
    }

    /// Check that outbound text is representable in this encoding
    pub fn check(self, text: &str) -> Result<(), CodecError> {
        match self {
            TextEncoding::Ascii => ensure_ascii(text.as_bytes()),
            TextEncoding::Utf8 => Ok(()),
        }
    }
}

fn ensure_ascii(bytes: &[u8]) -> Result<(), CodecError> {
    match bytes.iter().position(|b| !b.is_ascii()) {
        Some(offset) => Err(CodecError::NonAscii {
            byte: bytes[offset],
            offset,
        }),
        None => Ok(()),
    }
}

impl WireConfig {
    /// Encode and frame outbound text
    ///
    /// The result is shared by every recipient of a broadcast.
    pub fn encode(&self, text: &str) -> Result<Arc<[u8]>, CodecError> {
        self.encoding.check(text)?;
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        if self.framing == Framing::Lines {
            bytes.push(b'\n');
        }
        Ok(bytes.into())
    }
}

/// Reads decoded messages off one half of a connection
pub struct MessageReader<R> {
    inner: Inner<R>,
    encoding: TextEncoding,
}

enum Inner<R> {
    Raw { reader: R, buf: Vec<u8> },
    Lines { frames: FramedRead<R, LinesCodec>, max: usize },
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R, wire: &WireConfig) -> Self {
        let chunk_size = wire.chunk_size.max(1);
        let inner = match wire.framing {
            Framing::Raw => Inner::Raw {
                reader,
                buf: vec![0; chunk_size],
            },
            Framing::Lines => Inner::Lines {
                frames: FramedRead::new(reader, LinesCodec::new_with_max_length(chunk_size)),
                max: chunk_size,
            },
        };
        Self {
            inner,
            encoding: wire.encoding,
        }
    }

    /// Next decoded message
    ///
    /// Returns `Ok(None)` once the peer has closed its write side. Cancel-safe,
    /// so it can sit in a `tokio::select!` next to a shutdown signal.
    pub async fn next_message(&mut self) -> Result<Option<String>, CodecError> {
        match &mut self.inner {
            Inner::Raw { reader, buf } => {
                let n = reader.read(buf).await?;
                if n == 0 {
                    return Ok(None);
                }
                self.encoding.decode(&buf[..n]).map(Some)
            }
            Inner::Lines { frames, max } => loop {
                match frames.next().await {
                    None => return Ok(None),
                    // Blank lines carry nothing to relay
                    Some(Ok(line)) if line.is_empty() => continue,
                    Some(Ok(line)) => {
                        self.encoding.check(&line)?;
                        return Ok(Some(line));
                    }
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        return Err(CodecError::LineTooLong(*max));
                    }
                    Some(Err(LinesCodecError::Io(e))) => return Err(e.into()),
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(framing: Framing, chunk_size: usize) -> WireConfig {
        WireConfig {
            chunk_size,
            framing,
            encoding: TextEncoding::Ascii,
        }
    }

    #[test]
    fn test_ascii_rejects_high_bytes() {
        let err = TextEncoding::Ascii.decode(b"ok\xc3\xa9").unwrap_err();
        match err {
            CodecError::NonAscii { byte, offset } => {
                assert_eq!(byte, 0xc3);
                assert_eq!(offset, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_utf8_accepts_multibyte_but_not_split_sequences() {
        assert_eq!(TextEncoding::Utf8.decode("héllo".as_bytes()).unwrap(), "héllo");
        assert!(matches!(
            TextEncoding::Utf8.decode(b"h\xc3"),
            Err(CodecError::Utf8(_))
        ));
    }

    #[test]
    fn test_encode_frames_lines_only() {
        let raw = wire(Framing::Raw, 1024).encode("hi").unwrap();
        assert_eq!(&raw[..], b"hi");

        let lines = wire(Framing::Lines, 1024).encode("hi").unwrap();
        assert_eq!(&lines[..], b"hi\n");

        assert!(wire(Framing::Raw, 1024).encode("naïve").is_err());
    }

    #[tokio::test]
    async fn test_raw_reader_respects_chunk_size() {
        let input: &[u8] = b"abcdefghij";
        let mut reader = MessageReader::new(input, &wire(Framing::Raw, 4));

        assert_eq!(reader.next_message().await.unwrap().as_deref(), Some("abcd"));
        assert_eq!(reader.next_message().await.unwrap().as_deref(), Some("efgh"));
        assert_eq!(reader.next_message().await.unwrap().as_deref(), Some("ij"));
        assert_eq!(reader.next_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_line_reader_splits_and_skips_blank_lines() {
        let input: &[u8] = b"hi\n\nthere\r\ntail";
        let mut reader = MessageReader::new(input, &wire(Framing::Lines, 64));

        assert_eq!(reader.next_message().await.unwrap().as_deref(), Some("hi"));
        assert_eq!(reader.next_message().await.unwrap().as_deref(), Some("there"));
        assert_eq!(reader.next_message().await.unwrap().as_deref(), Some("tail"));
        assert_eq!(reader.next_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_line_reader_rejects_overlong_lines() {
        let input: &[u8] = b"0123456789\n";
        let mut reader = MessageReader::new(input, &wire(Framing::Lines, 4));

        assert!(matches!(
            reader.next_message().await,
            Err(CodecError::LineTooLong(4))
        ));
    }
}
