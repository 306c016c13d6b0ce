//! Where the color table comes from, and how many lanes a host shows.

use std::path::PathBuf;

/// Upper bound on lanes a host may configure.
pub const MAX_LANES: u32 = 9;

/// Default lane count (two on-screen piece queues).
pub const DEFAULT_LANES: u32 = 2;

/// Data source for a [`ColorTable`](crate::ColorTable).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PoolSource {
    /// The data file packaged into the binary.
    #[default]
    Embedded,
    /// A data file on disk, read once at construction.
    Path(PathBuf),
    /// In-memory bytes (tests, tools).
    Bytes(Vec<u8>),
}

impl PoolSource {
    pub const EMBEDDED_DATA: &'static [u8] = include_bytes!("../assets/colors.txt");
}

/// Pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub source: PoolSource,
    pub lanes: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            source: PoolSource::Embedded,
            lanes: DEFAULT_LANES,
        }
    }
}

impl PoolConfig {
    /// Create from environment variables.
    ///
    /// - `COLOR_POOL_DATA`: path to a data file (default: embedded data)
    /// - `COLOR_POOL_LANES`: lane count, clamped to `1..=MAX_LANES`
    pub fn from_env() -> Self {
        use std::env;

        let source = env::var("COLOR_POOL_DATA")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(|s| PoolSource::Path(PathBuf::from(s)))
            .unwrap_or_default();

        let lanes = env::var("COLOR_POOL_LANES")
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_LANES);

        Self::default().with_source(source).with_lanes(lanes)
    }

    pub fn with_source(mut self, source: PoolSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_lanes(mut self, lanes: u32) -> Self {
        self.lanes = lanes.clamp(1, MAX_LANES);
        self
    }
}
