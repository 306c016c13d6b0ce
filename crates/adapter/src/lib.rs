//! Adapter module - remote access to the color pool over TCP with JSON lines
//!
//! Presentation hosts that do not link the pool directly (a QML scene, a
//! web front end, a test harness) talk to it through this adapter.
//!
//! # Protocol Overview
//!
//! 1. **Connection**: client connects (default: 127.0.0.1:7878)
//! 2. **Handshake**: client sends `hello`, server answers `welcome`
//! 3. **Requests**: `advance`, `name_of`, `color_name_at`, `get_cursor`,
//!    `set_cursor`, `peek`, each answered by exactly one reply. `advance`
//!    takes an optional `resume` slot; leaving it out, `null` or `-1` all
//!    walk from the stored cursor
//! 4. **Events**: clients that set `stream_events` receive a
//!    `cursor_changed` line after every cursor mutation, from any client or
//!    from the local host
//!
//! # Environment Variables
//!
//! - `COLOR_POOL_HOST`: bind address (default: "127.0.0.1")
//! - `COLOR_POOL_PORT`: port number (default: 7878)
//! - `COLOR_POOL_MAX_PENDING`: bounded command queue size (default: 16)
//! - `COLOR_POOL_ADAPTER_DISABLED`: "1" or "true" disables the adapter
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"client":{"name":"board","version":"1.0"},"protocol_version":"1.0.0","stream_events":true}
//! Server -> Client: {"type":"welcome","seq":1,"protocol_version":"1.0.0","client_id":1,"colors":["red","blue","yellow","green"]}
//! Client -> Server: {"type":"set_cursor","seq":2,"queue":2,"position":1}
//! Server -> Client: {"type":"cursor_changed","queue":2,"position":1}
//! Server -> Client: {"type":"cursor","seq":2,"queue":2,"position":1}
//! Client -> Server: {"type":"advance","seq":3,"queue":2}
//! Server -> Client: {"type":"cursor_changed","queue":2,"position":2}
//! Server -> Client: {"type":"color","seq":3,"queue":2,"position":2,"code":2,"name":"yellow"}
//! ```

pub mod protocol;
pub mod runtime;
pub mod server;

pub use color_pool_core as core;
pub use color_pool_types as types;

pub use protocol::{
    parse_message, ClientMessage, ErrorCode, PoolRequest, ServerMessage, PROTOCOL_VERSION,
};
pub use runtime::{
    apply_command, respond, run_pool_service, Adapter, EventForwarder, InboundCommand,
    OutboundMessage,
};
pub use server::{run_server, ServerConfig};
