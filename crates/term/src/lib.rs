//! Terminal host for the color pool.
//!
//! Shows each lane's cursor, current color and the next few colors, and
//! turns key presses into pool calls. Rendering goes through a small
//! framebuffer so the view stays pure and testable.

pub mod fb;
pub mod keys;
pub mod lane_view;
pub mod renderer;

pub use color_pool_core as core;
pub use color_pool_types as types;

pub use fb::{Cell, CellStyle, FrameBuffer, Rgb};
pub use keys::{map_key, HostAction};
pub use lane_view::{color_rgb, LaneView, Viewport, KEY_HINT};
pub use renderer::{encode_full_into, TerminalRenderer};
