//! Shared types for the color pool - colors, queue identities, constants
//!
//! Everything here is plain data with no external dependencies so the same
//! vocabulary can be used by the pool itself, the terminal host and the
//! JSON adapter.
//!
//! # Color Codes
//!
//! | Code | Color |
//! |------|-------|
//! | 0 | red |
//! | 1 | blue |
//! | 2 | yellow |
//! | 3 | green |
//! | anything else | `"black"` (fallback) |
//!
//! # Examples
//!
//! ```
//! use color_pool_types::{name_of, PieceColor, COLOR_COUNT, NO_COLOR};
//!
//! assert_eq!(COLOR_COUNT, 4);
//! assert_eq!(PieceColor::from_code(2), Some(PieceColor::Yellow));
//! assert_eq!(name_of(3), "green");
//!
//! // Out-of-range codes never fail, they map to the fallback name.
//! assert_eq!(name_of(7), "black");
//! assert_eq!(name_of(NO_COLOR), "black");
//! ```

use std::fmt;

/// Number of known colors (K). Source digits `>= COLOR_COUNT` are dropped on load.
pub const COLOR_COUNT: u8 = 4;

/// Name returned for every code that is not a known color.
pub const FALLBACK_COLOR_NAME: &str = "black";

/// Integer form of "no color" for callers that speak raw codes.
pub const NO_COLOR: i64 = -1;

/// Identity of an independent consumer (an on-screen piece queue / lane).
pub type QueueId = u32;

/// Position within the loaded source stream.
pub type SlotIndex = usize;

/// Queue used by single-cursor consumers.
pub const DEFAULT_QUEUE: QueueId = 0;

/// The four piece colors, in code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceColor {
    Red,
    Blue,
    Yellow,
    Green,
}

impl PieceColor {
    /// All colors, indexed by code.
    pub const ALL: [PieceColor; COLOR_COUNT as usize] = [
        PieceColor::Red,
        PieceColor::Blue,
        PieceColor::Yellow,
        PieceColor::Green,
    ];

    /// Color for a raw code, or `None` when the code is outside `[0, K)`.
    ///
    /// ```
    /// use color_pool_types::PieceColor;
    ///
    /// assert_eq!(PieceColor::from_code(0), Some(PieceColor::Red));
    /// assert_eq!(PieceColor::from_code(4), None);
    /// assert_eq!(PieceColor::from_code(-1), None);
    /// ```
    pub fn from_code(code: i64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            PieceColor::Red => "red",
            PieceColor::Blue => "blue",
            PieceColor::Yellow => "yellow",
            PieceColor::Green => "green",
        }
    }
}

impl fmt::Display for PieceColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a raw color code to its name.
///
/// Total: negative, out-of-range and [`NO_COLOR`] all yield
/// [`FALLBACK_COLOR_NAME`] so rendering code never sees an unmappable value.
pub fn name_of(code: i64) -> &'static str {
    color_name(PieceColor::from_code(code))
}

/// Name of an optional color, `None` being "no color".
pub fn color_name(color: Option<PieceColor>) -> &'static str {
    color.map(PieceColor::name).unwrap_or(FALLBACK_COLOR_NAME)
}
