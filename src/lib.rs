//! Color pool (workspace facade crate).
//!
//! Re-exports the member crates as `color_pool::{types,core,adapter,term}`.

pub use color_pool_adapter as adapter;
pub use color_pool_core as core;
pub use color_pool_term as term;
pub use color_pool_types as types;
