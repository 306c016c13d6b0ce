use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;

use color_pool::adapter::protocol::create_hello;
use color_pool::adapter::{run_pool_service, run_server, InboundCommand, ServerConfig};
use color_pool::core::{ColorPool, ColorTable};

struct Server {
    addr: SocketAddr,
    tasks: Vec<AbortHandle>,
    /// Held open when no pool service drains the command queue.
    _stalled: Option<mpsc::Receiver<InboundCommand>>,
}

impl Server {
    /// Server backed by a pool service over `data`, or by nothing at all
    /// when `data` is `None` (commands pile up in the queue).
    async fn start(data: Option<&[u8]>, max_pending_commands: usize) -> Self {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_pending_commands,
            ..ServerConfig::default()
        };

        let (cmd_tx, cmd_rx) = mpsc::channel(max_pending_commands);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let mut tasks = Vec::new();
        let stalled = match data {
            Some(data) => {
                let pool = ColorPool::new(ColorTable::parse(data));
                tasks.push(tokio::spawn(run_pool_service(pool, cmd_rx, out_tx)).abort_handle());
                None
            }
            None => Some(cmd_rx),
        };
        tasks.push(
            tokio::spawn(async move {
                let _ = run_server(config, cmd_tx, out_rx, Some(ready_tx)).await;
            })
            .abort_handle(),
        );

        let addr = tokio::time::timeout(Duration::from_secs(2), ready_rx)
            .await
            .expect("server did not signal ready")
            .expect("ready channel dropped");

        Self {
            addr,
            tasks,
            _stalled: stalled,
        }
    }

    async fn connect(&self) -> Client {
        let stream = TcpStream::connect(self.addr).await.expect("connect failed");
        let (read_half, writer) = stream.into_split();
        Client {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    fn stop(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn recv(&mut self) -> serde_json::Value {
        let line = tokio::time::timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("connection closed");
        serde_json::from_str(&line).unwrap()
    }

    async fn hello(&mut self, seq: u64, stream_events: bool) -> serde_json::Value {
        let hello = serde_json::to_string(&create_hello(seq, "e2e-test", stream_events)).unwrap();
        self.send(&hello).await;
        self.recv().await
    }
}

/// Pool-backed server plus one connected client.
async fn start(data: &[u8]) -> (Server, Client) {
    let server = Server::start(Some(data), 8).await;
    let client = server.connect().await;
    (server, client)
}

#[tokio::test]
async fn adapter_hello_welcome_lists_colors() {
    let (server, mut h) = start(b"0123").await;

    let welcome = h.hello(1, false).await;
    assert_eq!(welcome["type"], "welcome");
    assert_eq!(welcome["seq"], 1);
    assert_eq!(
        welcome["colors"],
        serde_json::json!(["red", "blue", "yellow", "green"])
    );

    server.stop();
}

#[tokio::test]
async fn adapter_set_cursor_and_advance_stream_events() {
    let (server, mut h) = start(b"0123").await;
    h.hello(1, true).await;

    h.send(r#"{"type":"set_cursor","seq":2,"queue":2,"position":1}"#).await;
    let event = h.recv().await;
    assert_eq!(event["type"], "cursor_changed");
    assert_eq!(event["queue"], 2);
    assert_eq!(event["position"], 1);
    let cursor = h.recv().await;
    assert_eq!(cursor["type"], "cursor");
    assert_eq!(cursor["seq"], 2);
    assert_eq!(cursor["position"], 1);

    h.send(r#"{"type":"advance","seq":3,"queue":2}"#).await;
    let event = h.recv().await;
    assert_eq!(event["type"], "cursor_changed");
    assert_eq!(event["position"], 2);
    let color = h.recv().await;
    assert_eq!(color["type"], "color");
    assert_eq!(color["seq"], 3);
    assert_eq!(color["code"], 2);
    assert_eq!(color["name"], "yellow");

    server.stop();
}

#[tokio::test]
async fn adapter_advance_on_empty_slot_reports_black() {
    let (server, mut h) = start(b"9").await;
    h.hello(1, false).await;

    h.send(r#"{"type":"advance","seq":2,"queue":0,"resume":5}"#).await;
    let color = h.recv().await;
    assert_eq!(color["type"], "color");
    assert_eq!(color["position"], 0);
    assert!(color["code"].is_null());
    assert_eq!(color["name"], "black");

    h.send(r#"{"type":"name_of","seq":3,"code":-1}"#).await;
    let name = h.recv().await;
    assert_eq!(name["type"], "name");
    assert_eq!(name["name"], "black");

    server.stop();
}

#[tokio::test]
async fn adapter_peek_does_not_move_cursor() {
    let (server, mut h) = start(b"0123").await;
    h.hello(1, false).await;

    h.send(r#"{"type":"peek","seq":2,"queue":0,"count":5}"#).await;
    let preview = h.recv().await;
    assert_eq!(preview["type"], "preview");
    assert_eq!(
        preview["colors"],
        serde_json::json!(["blue", "yellow", "green", "red", "blue"])
    );

    h.send(r#"{"type":"get_cursor","seq":3,"queue":0}"#).await;
    let cursor = h.recv().await;
    assert_eq!(cursor["position"], 0);

    server.stop();
}

#[tokio::test]
async fn adapter_requires_handshake() {
    let (server, mut h) = start(b"0123").await;

    h.send(r#"{"type":"advance","seq":1,"queue":0}"#).await;
    let err = h.recv().await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["seq"], 1);
    assert_eq!(err["code"], "handshake_required");

    server.stop();
}

#[tokio::test]
async fn adapter_rejects_stale_seq_and_unknown_types() {
    let (server, mut h) = start(b"0123").await;
    h.hello(5, false).await;

    h.send(r#"{"type":"get_cursor","seq":5,"queue":0}"#).await;
    let err = h.recv().await;
    assert_eq!(err["code"], "out_of_order");
    assert_eq!(err["seq"], 5);

    h.send(r#"{"type":"shuffle","seq":6}"#).await;
    let err = h.recv().await;
    assert_eq!(err["code"], "unknown_type");
    assert_eq!(err["seq"], 6);

    h.send(r#"{"type":"advance","seq":7,"queue":"#).await;
    let err = h.recv().await;
    assert_eq!(err["code"], "invalid_message");
    assert_eq!(err["seq"], 7);

    server.stop();
}

#[tokio::test]
async fn adapter_full_queue_returns_backpressure() {
    let server = Server::start(None, 1).await;
    let mut h = server.connect().await;
    h.hello(1, false).await;

    // The first request takes the only queue slot and is never answered.
    h.send(r#"{"type":"get_cursor","seq":2,"queue":0}"#).await;
    h.send(r#"{"type":"get_cursor","seq":3,"queue":0}"#).await;

    let err = h.recv().await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "backpressure");
    assert_eq!(err["seq"], 3);

    server.stop();
}

#[tokio::test]
async fn adapter_events_reach_other_streaming_clients() {
    let (server, mut actor) = start(b"0123").await;
    let mut watcher = server.connect().await;
    let mut quiet = server.connect().await;

    actor.hello(1, false).await;
    assert_eq!(watcher.hello(1, true).await["type"], "welcome");
    quiet.hello(1, false).await;

    actor.send(r#"{"type":"set_cursor","seq":2,"queue":3,"position":2}"#).await;
    let reply = actor.recv().await;
    assert_eq!(reply["type"], "cursor");
    assert_eq!(reply["seq"], 2);

    let event = watcher.recv().await;
    assert_eq!(event["type"], "cursor_changed");
    assert_eq!(event["queue"], 3);
    assert_eq!(event["position"], 2);

    // Non-streaming clients only ever see replies to their own requests.
    quiet.send(r#"{"type":"get_cursor","seq":2,"queue":3}"#).await;
    let cursor = quiet.recv().await;
    assert_eq!(cursor["type"], "cursor");
    assert_eq!(cursor["position"], 2);

    server.stop();
}

#[tokio::test]
async fn adapter_negative_resume_uses_stored_cursor() {
    let (server, mut h) = start(b"0123").await;
    h.hello(1, false).await;

    h.send(r#"{"type":"set_cursor","seq":2,"queue":0,"position":2}"#).await;
    h.recv().await;

    h.send(r#"{"type":"advance","seq":3,"queue":0,"resume":-1}"#).await;
    let color = h.recv().await;
    assert_eq!(color["type"], "color");
    assert_eq!(color["position"], 3);
    assert_eq!(color["name"], "green");

    server.stop();
}
