//! TCP server for the pool adapter
//!
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::protocol::*;
use crate::runtime::{InboundCommand, OutboundMessage};

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol_version: String,
    pub max_pending_commands: usize,
    pub disabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            protocol_version: PROTOCOL_VERSION.to_string(),
            max_pending_commands: 16,
            disabled: false,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    ///
    /// - `COLOR_POOL_HOST` (default `127.0.0.1`)
    /// - `COLOR_POOL_PORT` (default `7878`)
    /// - `COLOR_POOL_MAX_PENDING` (default `16`)
    /// - `COLOR_POOL_ADAPTER_DISABLED` (`1` or `true`)
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();

        let host = env::var("COLOR_POOL_HOST")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.host);
        let port = env::var("COLOR_POOL_PORT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);
        let max_pending_commands = env::var("COLOR_POOL_MAX_PENDING")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.max_pending_commands);
        let disabled = env::var("COLOR_POOL_ADAPTER_DISABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            host,
            port,
            protocol_version: defaults.protocol_version,
            max_pending_commands,
            disabled,
        }
    }
}

/// Handle to a connected client
struct ClientHandle {
    id: usize,
    stream_events: bool,
    handshaken: bool,
    last_seq: Option<u64>,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

/// Shared server state
struct ServerState {
    config: ServerConfig,
    clients: RwLock<Vec<ClientHandle>>,
}

impl ServerState {
    fn new(config: ServerConfig) -> Self {
        Self {
            config,
            clients: RwLock::new(Vec::new()),
        }
    }

    async fn send_to(&self, client_id: usize, message: ServerMessage) {
        let clients = self.clients.read().await;
        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
            let _ = c.tx.send(message);
        }
    }

    async fn broadcast(&self, message: ServerMessage) {
        let clients = self.clients.read().await;
        for c in clients.iter().filter(|c| c.handshaken && c.stream_events) {
            let _ = c.tx.send(message.clone());
        }
    }

    async fn is_handshaken(&self, client_id: usize) -> bool {
        let clients = self.clients.read().await;
        clients
            .iter()
            .find(|c| c.id == client_id)
            .map(|c| c.handshaken)
            .unwrap_or(false)
    }

    /// Record `seq` if it is greater than the last one seen.
    async fn check_and_update_seq(&self, client_id: usize, seq: u64) -> bool {
        let mut clients = self.clients.write().await;
        let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
            return false;
        };
        match client.last_seq {
            Some(prev) if seq <= prev => false,
            _ => {
                client.last_seq = Some(seq);
                true
            }
        }
    }

    async fn complete_handshake(&self, client_id: usize, hello: &HelloMessage) {
        let mut clients = self.clients.write().await;
        if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
            client.handshaken = true;
            client.stream_events = hello.stream_events;
            client.last_seq = Some(hello.seq);
        }
    }

    async fn remove(&self, client_id: usize) {
        self.clients.write().await.retain(|c| c.id != client_id);
    }
}

/// Start the TCP server.
///
/// Commands go out on `command_tx`; replies and events come back on
/// `out_rx`. `ready_tx` receives the bound address (useful with port 0).
pub async fn run_server(
    config: ServerConfig,
    command_tx: mpsc::Sender<InboundCommand>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let bound = listener.local_addr()?;
    log::info!("adapter listening on {bound}");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState::new(config));

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                match msg {
                    OutboundMessage::ToClient { client_id, message } => {
                        state.send_to(client_id, message).await;
                    }
                    OutboundMessage::Broadcast { message } => {
                        state.broadcast(message).await;
                    }
                }
            }
        });
    }

    let mut client_id_counter = 0usize;
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;
        log::info!("client {client_id} connected from {addr}");

        let state = Arc::clone(&state);
        let command_tx = command_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, client_id, Arc::clone(&state), command_tx).await {
                log::warn!("client {client_id} error: {e}");
            }
            state.remove(client_id).await;
            log::info!("client {client_id} disconnected");
        });
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    client_id: usize,
    state: Arc<ServerState>,
    command_tx: mpsc::Sender<InboundCommand>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    state.clients.write().await.push(ClientHandle {
        id: client_id,
        stream_events: false,
        handshaken: false,
        last_seq: None,
        tx: tx.clone(),
    });

    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(256);
        while let Some(msg) = rx.recv().await {
            buf.clear();
            if serde_json::to_writer(&mut buf, &msg).is_err() {
                continue;
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() || writer.flush().await.is_err() {
                break;
            }
        }
    });

    let reply = |message: ServerMessage| {
        let _ = tx.send(message);
    };

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_message(trimmed) {
            Ok(ClientMessage::Hello(hello)) => {
                if state.is_handshaken(client_id).await
                    && !state.check_and_update_seq(client_id, hello.seq).await
                {
                    reply(create_error(hello.seq, ErrorCode::OutOfOrder, "seq must increase"));
                    continue;
                }
                log::debug!(
                    "client {client_id} hello from {} {} (events: {})",
                    hello.client.name,
                    hello.client.version,
                    hello.stream_events
                );
                state.complete_handshake(client_id, &hello).await;
                reply(create_welcome(
                    hello.seq,
                    &state.config.protocol_version,
                    client_id as u64,
                ));
            }
            Ok(ClientMessage::Request(msg)) => {
                if !state.is_handshaken(client_id).await {
                    reply(create_error(
                        msg.seq,
                        ErrorCode::HandshakeRequired,
                        "send hello first",
                    ));
                    continue;
                }
                if !state.check_and_update_seq(client_id, msg.seq).await {
                    reply(create_error(msg.seq, ErrorCode::OutOfOrder, "seq must increase"));
                    continue;
                }
                let cmd = InboundCommand {
                    client_id,
                    seq: msg.seq,
                    request: msg.request,
                };
                match command_tx.try_send(cmd) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        reply(create_error(msg.seq, ErrorCode::Backpressure, "command queue full"));
                    }
                    Err(TrySendError::Closed(_)) => {
                        reply(create_error(msg.seq, ErrorCode::Unavailable, "pool is gone"));
                    }
                }
            }
            Ok(ClientMessage::Unknown { seq, msg_type }) => {
                reply(create_error(
                    seq,
                    ErrorCode::UnknownType,
                    &format!("unknown message type: {msg_type}"),
                ));
            }
            Err(e) => {
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                reply(create_error(seq, ErrorCode::InvalidMessage, &e.to_string()));
            }
        }
    }

    drop(reply);
    drop(tx);
    state.remove(client_id).await;
    let _ = write_task.await;
    Ok(())
}
