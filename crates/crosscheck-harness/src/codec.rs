//! Record framing for the invoker's input and output streams.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::WireCodec;
use crate::error::InvokeError;

/// Upper bound on one length-prefixed frame.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Reads one record at a time from a byte stream.
pub struct RecordDecoder<R> {
    reader: R,
    codec: WireCodec,
    line: String,
}

impl<R: AsyncBufRead + Unpin> RecordDecoder<R> {
    pub fn new(reader: R, codec: WireCodec) -> Self {
        Self {
            reader,
            codec,
            line: String::new(),
        }
    }

    /// Next record, or `None` at a clean end of stream.
    pub async fn decode_next<T: DeserializeOwned>(&mut self) -> Result<Option<T>, InvokeError> {
        match self.codec {
            WireCodec::Json => self.next_line().await,
            WireCodec::LengthPrefixed => self.next_frame().await,
        }
    }

    async fn next_line<T: DeserializeOwned>(&mut self) -> Result<Option<T>, InvokeError> {
        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::InvalidData {
                    InvokeError::StreamTermination {
                        reason: format!("invalid record: {e}"),
                    }
                } else {
                    e.into()
                }
            })?;
            if read == 0 {
                return Ok(None);
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|e| InvokeError::StreamTermination {
                    reason: format!("invalid record: {e}"),
                });
        }
    }

    async fn next_frame<T: DeserializeOwned>(&mut self) -> Result<Option<T>, InvokeError> {
        let mut header = [0u8; 4];
        let mut filled = 0;
        while filled < header.len() {
            let n = self.reader.read(&mut header[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(InvokeError::StreamTermination {
                    reason: format!("truncated frame header ({filled} of 4 bytes)"),
                });
            }
            filled += n;
        }
        let len = u32::from_be_bytes(header);
        if len > MAX_FRAME_LEN {
            return Err(InvokeError::StreamTermination {
                reason: format!("frame of {len} bytes exceeds limit of {MAX_FRAME_LEN}"),
            });
        }
        let mut body = vec![0u8; len as usize];
        self.reader.read_exact(&mut body).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                InvokeError::StreamTermination {
                    reason: format!("truncated frame body (expected {len} bytes)"),
                }
            } else {
                e.into()
            }
        })?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| InvokeError::StreamTermination {
                reason: format!("invalid record: {e}"),
            })
    }
}

/// Writes records to a byte stream, one whole frame per write.
pub struct RecordEncoder<W> {
    writer: W,
    codec: WireCodec,
}

impl<W: AsyncWrite + Unpin> RecordEncoder<W> {
    pub fn new(writer: W, codec: WireCodec) -> Self {
        Self { writer, codec }
    }

    pub async fn encode<T: Serialize>(&mut self, record: &T) -> Result<(), InvokeError> {
        let body = serde_json::to_vec(record).map_err(|e| InvokeError::Encode(e.to_string()))?;
        let frame = match self.codec {
            WireCodec::Json => {
                let mut frame = body;
                frame.push(b'\n');
                frame
            }
            WireCodec::LengthPrefixed => {
                let len = u32::try_from(body.len())
                    .map_err(|_| InvokeError::Encode(format!("record of {} bytes", body.len())))?;
                let mut frame = Vec::with_capacity(body.len() + 4);
                frame.extend_from_slice(&len.to_be_bytes());
                frame.extend_from_slice(&body);
                frame
            }
        };
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Encode `records` into an in-memory buffer.
pub async fn encode_all<T: Serialize>(
    records: &[T],
    codec: WireCodec,
) -> Result<Vec<u8>, InvokeError> {
    let mut encoder = RecordEncoder::new(Vec::new(), codec);
    for record in records {
        encoder.encode(record).await?;
    }
    Ok(encoder.into_inner())
}

/// Decode every record of an in-memory buffer.
pub async fn decode_all<T: DeserializeOwned>(
    bytes: &[u8],
    codec: WireCodec,
) -> Result<Vec<T>, InvokeError> {
    let mut decoder = RecordDecoder::new(bytes, codec);
    let mut out = Vec::new();
    while let Some(record) = decoder.decode_next().await? {
        out.push(record);
    }
    Ok(out)
}
