//! Core color pool logic - deterministic, synchronous, no I/O beyond loading
//!
//! This crate owns the only real state in the system: a read-only table of
//! piece colors loaded once from a digit stream, and one cursor per queue
//! walking that table.
//!
//! # Module Structure
//!
//! - [`table`]: parses the digit stream into a sparse slot -> color table
//! - [`pool`]: per-queue cursors and the advance / wrap rule
//! - [`notify`]: observer interface for cursor changes
//! - [`source`]: data source and lane configuration
//!
//! # Failure Policy
//!
//! Nothing here fails the caller. An unreadable source becomes an empty
//! table, missing slots read as "no color", and unknown queues start at 0.
//!
//! # Example
//!
//! ```
//! use color_pool_core::{ColorPool, ColorTable, CursorChanged};
//!
//! let mut pool = ColorPool::new(ColorTable::parse(b"0123"));
//! pool.subscribe(|e: CursorChanged| println!("queue {} -> {}", e.queue, e.position));
//!
//! pool.set_cursor(2, 1);
//! assert_eq!(pool.next_color_name(2, None), "yellow");
//! assert_eq!(pool.color_name_at(100), "black");
//! ```

pub mod notify;
pub mod pool;
pub mod source;
pub mod table;

pub use color_pool_types as types;

pub use notify::{CursorChanged, CursorObserver, Observers, SubscriptionId};
pub use pool::{ColorPool, Lane, Preview, PEEK_MAX};
pub use source::{PoolConfig, PoolSource, DEFAULT_LANES, MAX_LANES};
pub use table::{ColorTable, LoadError};
