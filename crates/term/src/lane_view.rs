//! LaneView: maps a `ColorPool` into a terminal framebuffer.
//!
//! This module is pure (no I/O). It can be unit-tested.

use crate::core::ColorPool;
use crate::fb::{CellStyle, FrameBuffer, Rgb};
use crate::types::{color_name, PieceColor, QueueId};

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Terminal color for a piece color; "no color" draws as the fallback black.
pub fn color_rgb(color: Option<PieceColor>) -> Rgb {
    match color {
        Some(PieceColor::Red) => Rgb::new(230, 60, 60),
        Some(PieceColor::Blue) => Rgb::new(60, 120, 235),
        Some(PieceColor::Yellow) => Rgb::new(240, 210, 50),
        Some(PieceColor::Green) => Rgb::new(70, 200, 90),
        None => Rgb::new(60, 60, 60),
    }
}

const TITLE: CellStyle = CellStyle::fg(Rgb::new(235, 235, 235)).bold();
const LABEL: CellStyle = CellStyle::fg(Rgb::new(170, 170, 180));
const HINT: CellStyle = CellStyle::fg(Rgb::new(110, 110, 120));

pub const KEY_HINT: &str = "1-9 advance lane  space all  r reset  q quit";

/// Renders one row per lane: cursor, current color, upcoming colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneView {
    preview_len: usize,
}

impl Default for LaneView {
    fn default() -> Self {
        Self { preview_len: 5 }
    }
}

impl LaneView {
    pub fn new(preview_len: usize) -> Self {
        Self { preview_len }
    }

    pub fn render(&self, pool: &ColorPool, lanes: &[QueueId], viewport: Viewport) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into(pool, lanes, viewport, &mut fb);
        fb
    }

    /// Render into an existing framebuffer (resized to the viewport).
    pub fn render_into(
        &self,
        pool: &ColorPool,
        lanes: &[QueueId],
        viewport: Viewport,
        fb: &mut FrameBuffer,
    ) {
        fb.resize(viewport.width, viewport.height);

        let table = pool.table();
        let x = fb.put_str(1, 0, "COLOR POOL", TITLE);
        fb.put_str(
            x + 2,
            0,
            &format!("slots {}  kept {}", table.domain_len(), table.len()),
            LABEL,
        );

        for (row, &queue) in lanes.iter().enumerate() {
            let y = 2 + row as u16 * 2;
            if y >= viewport.height.saturating_sub(1) {
                break;
            }
            self.render_lane(pool, queue, y, fb);
        }

        if viewport.height > 0 {
            fb.put_str(1, viewport.height - 1, KEY_HINT, HINT);
        }
    }

    fn render_lane(&self, pool: &ColorPool, queue: QueueId, y: u16, fb: &mut FrameBuffer) {
        let position = pool.cursor(queue);
        let current = pool.color_at(position);

        fb.put_str(1, y, &format!("LANE {}", queue.saturating_add(1)), LABEL);
        fb.put_str(9, y, &format!("@{position:<5}"), LABEL);

        let mut x = put_block(fb, 16, y, current);
        x = fb.put_str(x, y, " |", HINT) + 1;
        for upcoming in pool.peek(queue, self.preview_len) {
            x = put_block(fb, x, y, upcoming) + 1;
        }
        fb.put_str(x + 1, y, color_name(current), CellStyle::fg(color_rgb(current)));
    }
}

fn put_block(fb: &mut FrameBuffer, x: u16, y: u16, color: Option<PieceColor>) -> u16 {
    let ch = if color.is_some() { '█' } else { '░' };
    let style = CellStyle::fg(color_rgb(color));
    fb.put_char(x, y, ch, style);
    fb.put_char(x + 1, y, ch, style);
    x + 2
}
