use crate::config::SimConfig;
use crate::entity::{Entity, EntityId};
use crate::field::FieldSimulator;
use crate::protocol::ImageResponse;
use arrayvec::ArrayString;
use core::fmt::Write;
use tracing::warn;

pub const BACKGROUND: u8 = 255;
pub const INK: u8 = 0;
pub const LABEL_MARGIN: u32 = 5;

const GLYPH_WIDTH: i64 = 5;
const GLYPH_HEIGHT: i64 = 7;
const GLYPH_ADVANCE: i64 = GLYPH_WIDTH + 1;

/// 5x7 digit font, one byte per row, bit 4 is the leftmost column.
const DIGIT_GLYPHS: [[u8; 7]; 10] = [
    [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
    [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
    [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
    [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
    [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
    [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
    [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
    [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
    [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
];

/// Produces placeholder imagery chunks tagged with an entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSynthesizer {
    width: u32,
    height: u32,
}

impl ImageSynthesizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.chunk_width, config.chunk_height)
    }

    /// Build the image response for `id`. Misses fall back to the placeholder
    /// entity, so this always produces a response.
    pub fn synthesize(&self, field: &FieldSimulator, id: EntityId) -> ImageResponse {
        let entity = field.lookup_or_placeholder(id);
        let (x_offset, y_offset) = pixel_offsets(&entity);

        ImageResponse {
            entity_id: entity.id(),
            width: self.width,
            height: self.height,
            x_offset,
            y_offset,
            pixels: self.render_label(id),
        }
    }

    /// White chunk with `id` drawn in black near the lower-left corner.
    pub fn render_label(&self, id: EntityId) -> Vec<u8> {
        let mut pixels = vec![BACKGROUND; (self.width as usize) * (self.height as usize)];

        let mut label = ArrayString::<20>::new();
        if write!(label, "{}", id).is_err() {
            warn!("Label for entity {} does not fit, leaving chunk blank", id);
            return pixels;
        }

        let baseline = i64::from(self.height) - i64::from(LABEL_MARGIN);
        let top = baseline - GLYPH_HEIGHT;
        let mut left = i64::from(LABEL_MARGIN);

        for digit in label.bytes().map(|b| usize::from(b - b'0')) {
            self.draw_glyph(&mut pixels, &DIGIT_GLYPHS[digit], left, top);
            left += GLYPH_ADVANCE;
            if left >= i64::from(self.width) {
                break;
            }
        }

        pixels
    }

    fn draw_glyph(&self, pixels: &mut [u8], glyph: &[u8; 7], left: i64, top: i64) {
        for (row, bits) in glyph.iter().enumerate() {
            let y = top + row as i64;
            if y < 0 || y >= i64::from(self.height) {
                continue;
            }
            for col in 0..GLYPH_WIDTH {
                let x = left + col;
                if x < 0 || x >= i64::from(self.width) {
                    continue;
                }
                if bits & (0x10 >> col) != 0 {
                    pixels[(y * i64::from(self.width) + x) as usize] = INK;
                }
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Position in units of half the entity's size, truncated toward zero.
pub fn pixel_offsets(entity: &Entity) -> (i32, i32) {
    let half = entity.size() / 2.0;
    (
        (entity.position.x / half) as i32,
        (entity.position.y / half) as i32,
    )
}
