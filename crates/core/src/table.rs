//! ColorTable - sparse slot index -> color lookup
//!
//! The source format is a run of single decimal digits with no separators.
//! Each character position is one slot; a slot is retained only when its
//! character is a digit below [`COLOR_COUNT`]. Everything else (digits
//! `>= K`, letters, whitespace, a trailing newline) leaves a hole.
//!
//! Holes matter: the pool walks slot indices in order and wraps to 0 at the
//! first missing index, so the gap pattern of the source decides the cycle.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::source::PoolSource;
use crate::types::{PieceColor, SlotIndex, COLOR_COUNT};

/// Failure to read a data source.
///
/// Only the fallible primitives return this; [`ColorTable::load`] degrades
/// to an empty table instead.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read color data from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read color data: {0}")]
    Stream(#[from] io::Error),
}

/// Immutable slot index -> color table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorTable {
    /// `slots[i]` is `Some` iff slot `i` survived filtering.
    slots: Vec<Option<PieceColor>>,
    retained: usize,
}

impl ColorTable {
    /// Table with no slots. Every lookup yields "no color".
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from raw source bytes.
    ///
    /// ```
    /// use color_pool_core::ColorTable;
    /// use color_pool_core::types::PieceColor;
    ///
    /// let table = ColorTable::parse(b"0193");
    /// assert_eq!(table.get(0), Some(PieceColor::Red));
    /// assert_eq!(table.get(1), Some(PieceColor::Blue));
    /// assert_eq!(table.get(2), None); // '9' is out of range
    /// assert_eq!(table.get(3), Some(PieceColor::Green));
    /// ```
    pub fn parse(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        let mut slots = Vec::with_capacity(bytes.len());
        let mut retained = 0usize;

        for ch in text.chars() {
            let color = ch
                .to_digit(10)
                .filter(|&d| d < COLOR_COUNT as u32)
                .and_then(|d| PieceColor::from_code(d as i64));
            if color.is_some() {
                retained += 1;
            }
            slots.push(color);
        }

        // Trailing holes are unreachable; keep the domain tight.
        while matches!(slots.last(), Some(None)) {
            slots.pop();
        }
        slots.shrink_to_fit();

        Self { slots, retained }
    }

    /// Read a whole stream and parse it.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, LoadError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(Self::parse(&buf))
    }

    /// Read and parse a data file.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::read_from(file).map_err(|e| match e {
            LoadError::Stream(source) => LoadError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Load a table from a configured source.
    ///
    /// Never fails: an unreadable source logs a warning and produces an
    /// empty table, which callers treat as degraded but usable.
    pub fn load(source: &PoolSource) -> Self {
        match source {
            PoolSource::Embedded => Self::parse(PoolSource::EMBEDDED_DATA),
            PoolSource::Bytes(bytes) => Self::parse(bytes),
            PoolSource::Path(path) => match Self::from_path(path) {
                Ok(table) => table,
                Err(e) => {
                    log::warn!("{e}; continuing with an empty color table");
                    Self::empty()
                }
            },
        }
    }

    /// Color at `slot`, or `None` when the slot is absent.
    #[inline]
    pub fn get(&self, slot: SlotIndex) -> Option<PieceColor> {
        self.slots.get(slot).copied().flatten()
    }

    #[inline]
    pub fn contains(&self, slot: SlotIndex) -> bool {
        self.get(slot).is_some()
    }

    /// Number of retained slots.
    pub fn len(&self) -> usize {
        self.retained
    }

    pub fn is_empty(&self) -> bool {
        self.retained == 0
    }

    /// One past the highest retained slot index (0 when empty).
    pub fn domain_len(&self) -> usize {
        self.slots.len()
    }

    /// Highest retained slot index.
    pub fn max_slot(&self) -> Option<SlotIndex> {
        self.slots.len().checked_sub(1)
    }

    /// Retained slots in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, PieceColor)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|c| (i, c)))
    }

    /// Retained slots whose successor is absent; a cursor on one of these
    /// wraps to 0 on its next advance.
    pub fn wrap_points(&self) -> impl Iterator<Item = SlotIndex> + '_ {
        self.iter()
            .map(|(i, _)| i)
            .filter(move |&i| !self.contains(i + 1))
    }

    /// How many retained slots hold each color, indexed by code.
    pub fn color_counts(&self) -> [usize; COLOR_COUNT as usize] {
        let mut counts = [0usize; COLOR_COUNT as usize];
        for (_, color) in self.iter() {
            counts[color.code() as usize] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_in_range_digits() {
        let table = ColorTable::parse(b"0123");
        assert_eq!(table.len(), 4);
        assert_eq!(table.domain_len(), 4);
        for (i, color) in PieceColor::ALL.iter().enumerate() {
            assert_eq!(table.get(i), Some(*color));
        }
    }

    #[test]
    fn test_parse_drops_out_of_range_positions() {
        // index 5 holds '4' and must become a hole, not a red slot.
        let table = ColorTable::parse(b"0123040");
        let slots: Vec<_> = table.iter().map(|(i, c)| (i, c.code())).collect();
        assert_eq!(slots, vec![(0, 0), (1, 1), (2, 2), (3, 3), (4, 0), (6, 0)]);
        assert!(!table.contains(5));
    }

    #[test]
    fn test_parse_drops_non_digits() {
        let table = ColorTable::parse(b"1x2 3\n");
        assert!(table.contains(0));
        assert!(!table.contains(1));
        assert!(table.contains(2));
        assert!(!table.contains(3));
        assert!(table.contains(4));
        // Trailing newline is not part of the domain.
        assert_eq!(table.domain_len(), 5);
    }

    #[test]
    fn test_malformed_only_source_is_empty() {
        let table = ColorTable::parse(b"9");
        assert!(table.is_empty());
        assert_eq!(table.domain_len(), 0);
        assert_eq!(table.max_slot(), None);
        assert_eq!(table.get(0), None);
    }

    #[test]
    fn test_absent_is_not_red() {
        let table = ColorTable::parse(b"5");
        assert_eq!(table.get(0), None);
        assert_ne!(table.get(0), Some(PieceColor::Red));
    }

    #[test]
    fn test_get_past_domain_is_none() {
        let table = ColorTable::parse(b"0123");
        assert_eq!(table.get(100), None);
        assert_eq!(table.get(usize::MAX), None);
    }

    #[test]
    fn test_wrap_points_follow_gaps() {
        let table = ColorTable::parse(b"01830");
        let wraps: Vec<_> = table.wrap_points().collect();
        assert_eq!(wraps, vec![1, 4]);
    }

    #[test]
    fn test_color_counts() {
        let table = ColorTable::parse(b"0011223");
        assert_eq!(table.color_counts(), [2, 2, 2, 1]);
    }

    #[test]
    fn test_missing_path_degrades_to_empty() {
        let source = PoolSource::Path(PathBuf::from("/definitely/not/here/colors.txt"));
        let table = ColorTable::load(&source);
        assert!(table.is_empty());
    }

    #[test]
    fn test_from_path_reports_path() {
        let err = ColorTable::from_path(Path::new("/definitely/not/here/colors.txt"))
            .expect_err("missing file");
        assert!(err.to_string().contains("/definitely/not/here/colors.txt"));
    }

    #[test]
    fn test_load_reads_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"2103\n").unwrap();

        let table = ColorTable::load(&PoolSource::Path(file.path().to_path_buf()));
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(0), Some(PieceColor::Yellow));
        assert_eq!(table.get(3), Some(PieceColor::Green));
    }

    #[test]
    fn test_from_path_reads_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let table = ColorTable::from_path(file.path()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_in_memory_bytes() {
        let table = ColorTable::load(&PoolSource::Bytes(b"3x1".to_vec()));
        assert_eq!(table.get(0), Some(PieceColor::Green));
        assert!(!table.contains(1));
        assert_eq!(table.get(2), Some(PieceColor::Blue));
    }

    #[test]
    fn test_embedded_data_is_usable() {
        let table = ColorTable::load(&PoolSource::Embedded);
        assert!(!table.is_empty());
        assert!(table.contains(0));
        for (_, color) in table.iter() {
            assert!(color.code() < COLOR_COUNT);
        }
    }
}
