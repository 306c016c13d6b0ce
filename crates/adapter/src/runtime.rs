//! Adapter runtime integration.
//!
//! The TCP server never owns the pool. It forwards [`InboundCommand`]s to
//! whoever does (the terminal host loop or [`run_pool_service`]) and gets
//! [`OutboundMessage`]s back.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot};

use crate::core::{ColorPool, CursorChanged, CursorObserver};
use crate::protocol::{preview_names, PoolRequest, ServerMessage};
use crate::server::{run_server, ServerConfig};
use crate::types::{color_name, name_of};

/// Request delivered to the pool owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundCommand {
    pub client_id: usize,
    pub seq: u64,
    pub request: PoolRequest,
}

/// Message to be delivered by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    ToClient { client_id: usize, message: ServerMessage },
    /// Sent to every client that asked for events.
    Broadcast { message: ServerMessage },
}

/// Apply one request to the pool and build the reply.
pub fn respond(pool: &mut ColorPool, seq: u64, request: &PoolRequest) -> ServerMessage {
    match *request {
        PoolRequest::Advance { queue, resume } => {
            let color = pool.advance_from(queue, resume);
            ServerMessage::Color {
                seq,
                queue,
                position: pool.cursor(queue),
                code: color.map(|c| c.code()),
                name: color_name(color).to_string(),
            }
        }
        PoolRequest::NameOf { code } => ServerMessage::Name {
            seq,
            name: name_of(code).to_string(),
        },
        PoolRequest::ColorNameAt { slot } => ServerMessage::Name {
            seq,
            name: pool.color_name_at(slot).to_string(),
        },
        PoolRequest::GetCursor { queue } => ServerMessage::Cursor {
            seq,
            queue,
            position: pool.cursor(queue),
        },
        PoolRequest::SetCursor { queue, position } => ServerMessage::Cursor {
            seq,
            queue,
            position: pool.set_cursor(queue, position),
        },
        PoolRequest::Peek { queue, count } => ServerMessage::Preview {
            seq,
            queue,
            colors: preview_names(&pool.peek(queue, count)),
        },
    }
}

/// Apply a command and address the reply to its client.
pub fn apply_command(pool: &mut ColorPool, cmd: &InboundCommand) -> OutboundMessage {
    OutboundMessage::ToClient {
        client_id: cmd.client_id,
        message: respond(pool, cmd.seq, &cmd.request),
    }
}

/// Observer that streams cursor changes to subscribed clients.
#[derive(Debug, Clone)]
pub struct EventForwarder {
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl EventForwarder {
    pub fn new(out_tx: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Self { out_tx }
    }
}

impl CursorObserver for EventForwarder {
    fn cursor_changed(&mut self, event: CursorChanged) {
        let _ = self.out_tx.send(OutboundMessage::Broadcast {
            message: ServerMessage::CursorChanged {
                queue: event.queue,
                position: event.position,
            },
        });
    }
}

/// Own a pool inside the async runtime and serve commands until the
/// command channel closes. Returns the pool.
pub async fn run_pool_service(
    mut pool: ColorPool,
    mut cmd_rx: mpsc::Receiver<InboundCommand>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
) -> ColorPool {
    let subscription = pool.subscribe(EventForwarder::new(out_tx.clone()));
    while let Some(cmd) = cmd_rx.recv().await {
        if out_tx.send(apply_command(&mut pool, &cmd)).is_err() {
            break;
        }
    }
    pool.unsubscribe(subscription);
    pool
}

/// Running adapter instance, for hosts with their own sync loop.
pub struct Adapter {
    _rt: Runtime,
    addr: SocketAddr,
    cmd_rx: mpsc::Receiver<InboundCommand>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Adapter {
    /// Start the server on a background runtime and wait until it is bound.
    ///
    /// Returns `Ok(None)` when the adapter is disabled.
    pub fn start(config: ServerConfig) -> Result<Option<Self>> {
        if config.disabled {
            log::info!("adapter disabled via COLOR_POOL_ADAPTER_DISABLED");
            return Ok(None);
        }

        let max_pending = config.max_pending_commands.max(1);
        let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(max_pending);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();

        let (ready_tx, ready_rx) = oneshot::channel();

        let rt = Runtime::new().context("failed to create tokio runtime")?;
        rt.spawn(async move {
            if let Err(e) = run_server(config, cmd_tx, out_rx, Some(ready_tx)).await {
                log::error!("adapter server stopped: {e:#}");
            }
        });
        let addr = rt
            .block_on(ready_rx)
            .context("adapter server failed to start")?;

        Ok(Some(Self {
            _rt: rt,
            addr,
            cmd_rx,
            out_tx,
        }))
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn start_from_env() -> Result<Option<Self>> {
        Self::start(ServerConfig::from_env())
    }

    pub fn try_recv(&mut self) -> Option<InboundCommand> {
        self.cmd_rx.try_recv().ok()
    }

    pub fn send(&self, msg: OutboundMessage) {
        let _ = self.out_tx.send(msg);
    }

    /// Observer to subscribe on the pool this adapter serves.
    pub fn forwarder(&self) -> EventForwarder {
        EventForwarder::new(self.out_tx.clone())
    }

    /// Apply every pending command to `pool`. Returns how many were applied.
    pub fn pump(&mut self, pool: &mut ColorPool) -> usize {
        let mut applied = 0usize;
        while let Some(cmd) = self.try_recv() {
            self.send(apply_command(pool, &cmd));
            applied += 1;
        }
        applied
    }
}
