//! `color-pool` binary.
//!
//! `play` (the default) runs the terminal lane preview and, unless disabled,
//! serves remote clients from the same pool. `serve` runs only the adapter.
//! `sequence` and `inspect` are one-shot tools for scripting and debugging
//! data files.

use std::io::Read;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyEventKind};
use tokio::sync::mpsc;

use color_pool::adapter::{run_pool_service, run_server, Adapter, ServerConfig};
use color_pool::core::{ColorPool, PoolConfig, PoolSource, MAX_LANES};
use color_pool::term::{map_key, HostAction, LaneView, TerminalRenderer, Viewport};
use color_pool::types::{color_name, PieceColor, QueueId, SlotIndex};

/// Frame interval for the terminal host.
const TICK_MS: u64 = 50;

#[derive(Debug, Parser)]
#[command(name = "color-pool", version, about)]
struct Cli {
    /// Color data file, or `-` for stdin (overrides COLOR_POOL_DATA; default: embedded table)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive lane preview
    Play {
        /// Number of lanes (overrides COLOR_POOL_LANES)
        #[arg(long)]
        lanes: Option<u32>,
        /// Do not start the TCP adapter
        #[arg(long)]
        no_adapter: bool,
    },
    /// Serve the pool over TCP only
    Serve,
    /// Print the next colors drawn by a queue
    Sequence {
        #[arg(long, default_value_t = 0)]
        queue: QueueId,
        #[arg(long, default_value_t = 8)]
        count: usize,
        /// Resume from this slot instead of the queue's cursor
        #[arg(long)]
        resume: Option<SlotIndex>,
    },
    /// Print table statistics
    Inspect,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut config = PoolConfig::from_env();
    if let Some(path) = cli.data {
        config = config.with_source(data_source(path)?);
    }

    match cli.command.unwrap_or(Command::Play {
        lanes: None,
        no_adapter: false,
    }) {
        Command::Play { lanes, no_adapter } => {
            if let Some(lanes) = lanes {
                config = config.with_lanes(lanes);
            }
            play(&config, no_adapter)
        }
        Command::Serve => serve(&config),
        Command::Sequence {
            queue,
            count,
            resume,
        } => {
            sequence(&config, queue, count, resume);
            Ok(())
        }
        Command::Inspect => {
            inspect(&config);
            Ok(())
        }
    }
}

fn data_source(path: PathBuf) -> Result<PoolSource> {
    if path.as_os_str() != "-" {
        return Ok(PoolSource::Path(path));
    }
    let mut bytes = Vec::new();
    std::io::stdin()
        .read_to_end(&mut bytes)
        .context("failed to read color data from stdin")?;
    Ok(PoolSource::Bytes(bytes))
}

fn play(config: &PoolConfig, no_adapter: bool) -> Result<()> {
    let mut pool = ColorPool::from_config(config);

    let mut adapter = if no_adapter {
        None
    } else {
        match Adapter::start_from_env() {
            Ok(adapter) => adapter,
            Err(e) => {
                log::warn!("{e:#}; running without the adapter");
                None
            }
        }
    };
    if let Some(adapter) = adapter.as_ref() {
        pool.subscribe(adapter.forwarder());
    }

    let mut term = TerminalRenderer::new();
    term.enter()?;
    let result = run(&mut term, &mut pool, adapter.as_mut(), config.lanes);

    // Always try to restore terminal state.
    let _ = term.exit();
    result
}

fn run(
    term: &mut TerminalRenderer,
    pool: &mut ColorPool,
    mut adapter: Option<&mut Adapter>,
    lanes: u32,
) -> Result<()> {
    let lane_ids: Vec<QueueId> = (0..lanes.min(MAX_LANES)).collect();
    let view = LaneView::default();
    let tick = Duration::from_millis(TICK_MS);
    let mut last_tick = Instant::now();
    let mut dirty = true;

    loop {
        if dirty {
            let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
            let fb = view.render(pool, &lane_ids, Viewport::new(w, h));
            term.draw(&fb)?;
            dirty = false;
        }

        let timeout = tick.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(action) = map_key(key, lanes) {
                        match action {
                            HostAction::Quit => return Ok(()),
                            HostAction::Advance(queue) => {
                                pool.advance(queue);
                            }
                            HostAction::AdvanceAll => {
                                for &queue in &lane_ids {
                                    pool.advance(queue);
                                }
                            }
                            HostAction::ResetAll => {
                                for &queue in &lane_ids {
                                    pool.reset(queue);
                                }
                            }
                        }
                        dirty = true;
                    }
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick {
            last_tick = Instant::now();
            if let Some(adapter) = adapter.as_deref_mut() {
                if adapter.pump(pool) > 0 {
                    dirty = true;
                }
            }
        }
    }
}

fn serve(config: &PoolConfig) -> Result<()> {
    let server_config = ServerConfig::from_env();
    if server_config.disabled {
        bail!("adapter is disabled (COLOR_POOL_ADAPTER_DISABLED)");
    }
    let pool = ColorPool::from_config(config);
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let (cmd_tx, cmd_rx) = mpsc::channel(server_config.max_pending_commands.max(1));
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let service = tokio::spawn(run_pool_service(pool, cmd_rx, out_tx));

        let result = tokio::select! {
            res = run_server(server_config, cmd_tx, out_rx, None) => res,
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupted, shutting down");
                Ok(())
            }
        };
        service.abort();
        result
    })
}

fn sequence(config: &PoolConfig, queue: QueueId, count: usize, resume: Option<SlotIndex>) {
    let mut pool = ColorPool::from_config(config);
    let mut resume = resume;
    for _ in 0..count {
        println!("{}", pool.next_color_name(queue, resume.take()));
    }
}

fn inspect(config: &PoolConfig) {
    let pool = ColorPool::from_config(config);
    let table = pool.table();
    println!("domain    {}", table.domain_len());
    println!("retained  {}", table.len());
    println!("dropped   {}", table.domain_len() - table.len());
    for (color, count) in PieceColor::ALL.iter().zip(table.color_counts()) {
        println!("{:<9} {}", color.name(), count);
    }
    let wraps: Vec<SlotIndex> = table.wrap_points().collect();
    println!("wraps     {}", wraps.len());
    if let Some(&first) = wraps.first() {
        println!(
            "cycle     0..={first} (slot 0 is {})",
            color_name(table.get(0))
        );
    }
}
