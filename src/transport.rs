//! Length-prefixed framing over any async byte stream.
//!
//! A frame is a 4-byte big-endian payload length followed by a JSON-encoded
//! [`Message`]. Writers encode the whole frame before touching the stream, so
//! one `send` is one `write_all`.

use crate::error::TransportError;
use crate::protocol::{decode_payload, encode_frame, Message, FRAME_HEADER_SIZE, MAX_FRAME_SIZE};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Outbound half shared by the broadcast timer and the receive loop.
pub type SharedWriter<W> = Arc<Mutex<FrameWriter<W>>>;

#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Blocks until a whole frame arrives.
    ///
    /// End-of-stream before the first header byte is [`TransportError::Closed`];
    /// end-of-stream anywhere else is a truncated frame and reported as I/O.
    pub async fn recv(&mut self) -> Result<Message, TransportError> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        let mut filled = 0;
        while filled < FRAME_HEADER_SIZE {
            let n = self.inner.read(&mut header[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Err(TransportError::Closed);
                }
                return Err(TransportError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside frame header",
                )));
            }
            filled += n;
        }

        let len = u32::from_be_bytes(header) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(TransportError::FrameTooLarge {
                size: len,
                limit: MAX_FRAME_SIZE,
            });
        }

        let mut payload = vec![0u8; len];
        self.inner.read_exact(&mut payload).await?;
        decode_payload(&payload)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
    frames_sent: u64,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            frames_sent: 0,
        }
    }

    pub fn shared(inner: W) -> SharedWriter<W> {
        Arc::new(Mutex::new(Self::new(inner)))
    }

    pub async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let frame = encode_frame(message)?;
        self.inner.write_all(&frame).await?;
        self.inner.flush().await?;
        self.frames_sent += 1;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.inner.shutdown().await?;
        Ok(())
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}
