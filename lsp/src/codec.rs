//! `Content-Length` framing for JSON-RPC over stdio.
//!
//! Each message is `Content-Length: N\r\n\r\n` followed by `N` bytes of JSON.
//! A body that is not valid JSON is reported as [`Frame::Malformed`]; the
//! stream stays in sync because the body was consumed in full. Header and
//! length problems are fatal.

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Frames larger than this (4 MiB) are refused before allocation.
const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

const CONTENT_LENGTH: &str = "Content-Length";

#[derive(Debug, PartialEq)]
pub enum Frame {
    Message(Value),
    /// The body was read but did not parse; carries the parser error.
    Malformed(String),
}

pub struct FrameReader<R> {
    reader: BufReader<R>,
    line: String,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line: String::new(),
        }
    }

    /// Next frame, or `None` when the peer closed the stream between frames.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        let Some(length) = self.read_content_length().await? else {
            return Ok(None);
        };
        if length > MAX_FRAME_BYTES {
            bail!("{CONTENT_LENGTH} {length} exceeds maximum {MAX_FRAME_BYTES}");
        }

        let mut body = vec![0u8; length];
        self.reader
            .read_exact(&mut body)
            .await
            .with_context(|| format!("reading {length}-byte frame body"))?;

        Ok(Some(match serde_json::from_slice(&body) {
            Ok(value) => Frame::Message(value),
            Err(e) => Frame::Malformed(e.to_string()),
        }))
    }

    /// Consume one header block and return its `Content-Length`.
    async fn read_content_length(&mut self) -> Result<Option<usize>> {
        let mut length = None;
        let mut started = false;
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .await
                .context("reading header line")?;
            if read == 0 {
                if started {
                    bail!("stream ended inside a header block");
                }
                return Ok(None);
            }
            started = true;

            let header = self.line.trim();
            if header.is_empty() {
                break;
            }
            if let Some(value) = header_value(header, CONTENT_LENGTH) {
                length = Some(
                    value
                        .parse::<usize>()
                        .with_context(|| format!("invalid {CONTENT_LENGTH} {value:?}"))?,
                );
            }
        }
        length
            .map(Some)
            .with_context(|| format!("header block without {CONTENT_LENGTH}"))
    }
}

/// Value of `header` if its name is `name` (case-insensitive).
fn header_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = header.split_once(':')?;
    key.trim()
        .eq_ignore_ascii_case(name)
        .then(|| value.trim())
}

pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_frame(&mut self, message: &Value) -> Result<()> {
        let body = serde_json::to_vec(message).context("serializing JSON-RPC message")?;
        let mut frame = format!("{CONTENT_LENGTH}: {}\r\n\r\n", body.len()).into_bytes();
        frame.extend_from_slice(&body);

        self.writer
            .write_all(&frame)
            .await
            .context("writing frame")?;
        self.writer.flush().await.context("flushing frame")
    }
}
