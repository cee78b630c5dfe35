//! Framing codec for the Discord local IPC socket.
//!
//! Every message is `opcode: u32 LE | length: u32 LE | JSON body`. This module
//! provides [`IpcChannel`] for async sending and receiving of framed messages
//! over a single bidirectional stream.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::PresenceError;

/// Maximum frame size (64 KiB); Discord replies are small.
const MAX_FRAME_BYTES: usize = 64 * 1024;

const HEADER_BYTES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Handshake = 0,
    Frame = 1,
    Close = 2,
    Ping = 3,
    Pong = 4,
}

impl Opcode {
    fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Handshake),
            1 => Some(Self::Frame),
            2 => Some(Self::Close),
            3 => Some(Self::Ping),
            4 => Some(Self::Pong),
            _ => None,
        }
    }
}

/// Reads and writes IPC frames on one stream.
pub struct IpcChannel<S> {
    stream: S,
}

impl<S: AsyncRead + AsyncWrite + Unpin> IpcChannel<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub async fn send(
        &mut self,
        opcode: Opcode,
        body: &serde_json::Value,
    ) -> Result<(), PresenceError> {
        let bytes = serde_json::to_vec(body)?;
        let len = u32::try_from(bytes.len())
            .map_err(|_| PresenceError::Protocol("frame body too large".to_string()))?;

        let mut frame = Vec::with_capacity(HEADER_BYTES + bytes.len());
        frame.extend_from_slice(&(opcode as u32).to_le_bytes());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&bytes);

        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read the next frame.
    ///
    /// EOF surfaces as an `Io` error: the service never closes cleanly
    /// mid-conversation.
    pub async fn recv(&mut self) -> Result<(Opcode, serde_json::Value), PresenceError> {
        let mut header = [0u8; HEADER_BYTES];
        self.stream.read_exact(&mut header).await?;

        let raw_opcode = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

        let opcode = Opcode::from_u32(raw_opcode)
            .ok_or_else(|| PresenceError::Protocol(format!("unknown opcode {raw_opcode}")))?;
        if len > MAX_FRAME_BYTES {
            return Err(PresenceError::Protocol(format!(
                "frame length {len} exceeds maximum {MAX_FRAME_BYTES}"
            )));
        }

        let mut body = vec![0u8; len];
        self.stream.read_exact(&mut body).await?;
        let value = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body)?
        };
        Ok((opcode, value))
    }
}
