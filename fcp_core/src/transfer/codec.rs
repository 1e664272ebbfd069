//! Batch framing for export files.
//!
//! Binary files are a plain concatenation of frames:
//!
//! ```text
//! [u32 little-endian payload length L][L bytes of bincode(Batch)]
//! ```
//!
//! EOF is only valid on a frame boundary. No frame refers to another, so
//! appending frames to an existing file yields a valid file.
//!
//! The JSON format writes one batch per line instead and is meant for
//! inspection; binary is what transfers default to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::constants::FRAME_HEADER_LEN;
use crate::record::Batch;

#[derive(Debug, Error)]
pub enum CodecError {
    /// Clean end of input at a frame boundary
    #[error("end of stream")]
    EndOfStream,
    #[error("truncated frame: expected {expected} bytes, found {actual}")]
    TruncatedFrame { expected: usize, actual: usize },
    #[error("failed to decode batch: {0}")]
    Decoding(String),
    #[error("failed to encode batch: {0}")]
    Encoding(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Binary,
    Json,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Binary => f.write_str("binary"),
            Format::Json => f.write_str("json"),
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" | "bin" => Ok(Format::Binary),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown format: {}", other)),
        }
    }
}

/// Length prefix for a payload, rejecting payloads a u32 cannot describe
pub fn frame_len(payload_len: usize) -> Result<u32, CodecError> {
    u32::try_from(payload_len).map_err(|_| {
        CodecError::Encoding(format!(
            "payload of {} bytes exceeds the maximum frame size of {} bytes",
            payload_len,
            u32::MAX
        ))
    })
}

/// Encode a batch into one length-prefixed binary frame
pub fn encode(batch: &Batch) -> Result<Vec<u8>, CodecError> {
    let payload = bincode::serialize(batch).map_err(|e| CodecError::Encoding(e.to_string()))?;
    let len = frame_len(payload.len())?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Encode a batch as one JSON line
pub fn encode_json(batch: &Batch) -> Result<Vec<u8>, CodecError> {
    let mut line = serde_json::to_vec(batch).map_err(|e| CodecError::Encoding(e.to_string()))?;
    line.push(b'\n');
    Ok(line)
}

/// Decode the next binary frame from `reader`.
///
/// Returns [`CodecError::EndOfStream`] when the reader is exhausted exactly at
/// a frame boundary and [`CodecError::TruncatedFrame`] when it runs out
/// anywhere inside a frame.
pub async fn decode<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Batch, CodecError> {
    // 1. Length prefix. A partial prefix is as corrupt as a partial payload.
    let mut len_buf = [0u8; FRAME_HEADER_LEN];
    let mut filled = 0;
    while filled < FRAME_HEADER_LEN {
        let n = reader.read(&mut len_buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    if filled == 0 {
        return Err(CodecError::EndOfStream);
    }
    if filled < FRAME_HEADER_LEN {
        return Err(CodecError::TruncatedFrame {
            expected: FRAME_HEADER_LEN,
            actual: filled,
        });
    }
    let len = u32::from_le_bytes(len_buf) as usize;

    // 2. Payload. Read through `take` so a corrupt length cannot force a huge
    // allocation up front.
    let mut payload = Vec::new();
    (&mut *reader).take(len as u64).read_to_end(&mut payload).await?;
    if payload.len() < len {
        return Err(CodecError::TruncatedFrame {
            expected: len,
            actual: payload.len(),
        });
    }

    bincode::deserialize(&payload).map_err(|e| CodecError::Decoding(e.to_string()))
}

/// Decode the next JSON line from `reader`
pub async fn decode_json<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<Batch, CodecError> {
    let mut line = Vec::new();
    let n = reader.read_until(b'\n', &mut line).await?;
    if n == 0 {
        return Err(CodecError::EndOfStream);
    }
    if line.last() != Some(&b'\n') {
        return Err(CodecError::TruncatedFrame {
            expected: line.len() + 1,
            actual: line.len(),
        });
    }
    serde_json::from_slice(&line).map_err(|e| CodecError::Decoding(e.to_string()))
}

/// Sequential frame reader over any async source
pub struct FrameReader<R> {
    inner: BufReader<R>,
    format: Format,
    frames: u64,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, format: Format) -> Self {
        Self {
            inner: BufReader::new(reader),
            format,
            frames: 0,
        }
    }

    /// Read the next batch; [`CodecError::EndOfStream`] ends the sequence.
    pub async fn read_batch(&mut self) -> Result<Batch, CodecError> {
        let batch = match self.format {
            Format::Binary => decode(&mut self.inner).await?,
            Format::Json => decode_json(&mut self.inner).await?,
        };
        self.frames += 1;
        Ok(batch)
    }

    /// Number of frames decoded so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Appends frames to any async sink.
///
/// Each frame is written with a single `write_all`, so cancelling between
/// frames never leaves a partial frame behind.
pub struct FrameWriter<W> {
    inner: W,
    format: Format,
    frames: u64,
    bytes: u64,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W, format: Format) -> Self {
        Self {
            inner: writer,
            format,
            frames: 0,
            bytes: 0,
        }
    }

    pub async fn write_batch(&mut self, batch: &Batch) -> Result<(), CodecError> {
        let frame = match self.format {
            Format::Binary => encode(batch)?,
            Format::Json => encode_json(batch)?,
        };
        self.inner.write_all(&frame).await?;
        self.frames += 1;
        self.bytes += frame.len() as u64;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), CodecError> {
        self.inner.flush().await?;
        Ok(())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
