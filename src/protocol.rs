use crate::entity::{Entity, EntityId};
use crate::error::TransportError;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;
use std::time::{SystemTime, UNIX_EPOCH};

pub const FRAME_HEADER_SIZE: usize = 4;
pub const MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

// Length prefix is a big-endian u32.
const_assert!(MAX_FRAME_SIZE <= u32::MAX as usize);

/// Camera settings pushed by the ground station. Stored by the session but
/// otherwise has no effect on the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSpec {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
}

fn default_enabled() -> bool {
    true
}

fn default_zoom() -> f64 {
    1.0
}

impl Default for CameraSpec {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            zoom: default_zoom(),
        }
    }
}

/// Deep-copied view of the live field at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub entities: Vec<Entity>,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResponse {
    pub entity_id: EntityId,
    pub width: u32,
    pub height: u32,
    pub x_offset: i32,
    pub y_offset: i32,
    /// 8-bit grayscale, row-major.
    #[serde(with = "serde_bytes")]
    pub pixels: Vec<u8>,
}

impl ImageResponse {
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }
}

/// Every message kind carried on the channel, in either direction.
///
/// Unrecognized `type` tags decode to `Unknown` so the session can log and
/// move on instead of dropping the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    CameraSpec(CameraSpec),
    ImageRequest { id: EntityId },
    Frame(FrameSnapshot),
    Image(ImageResponse),
    #[serde(other)]
    Unknown,
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::CameraSpec(_) => "CameraSpec",
            Message::ImageRequest { .. } => "ImageRequest",
            Message::Frame(_) => "Frame",
            Message::Image(_) => "Image",
            Message::Unknown => "Unknown",
        }
    }
}

/// Length-prefixed frame ready to be written in one call.
pub fn encode_frame(message: &Message) -> Result<Bytes, TransportError> {
    let payload = serde_json::to_vec(message).map_err(TransportError::Encode)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: payload.len(),
            limit: MAX_FRAME_SIZE,
        });
    }
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.extend_from_slice(&payload);
    Ok(buf.freeze())
}

pub fn decode_payload(payload: &[u8]) -> Result<Message, TransportError> {
    serde_json::from_slice(payload).map_err(TransportError::Decode)
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
