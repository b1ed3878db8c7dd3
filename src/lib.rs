// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod facility;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::unix::AsyncFd;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, RawConfigFile, load_or_default};
use crate::engine::{Event, EventLoop};
use crate::facility::Facility;

pub use crate::engine::{EventLoopOptions, LoopState};
pub use crate::errors::{Result as WatchtreeResult, WatchtreeError};
pub use crate::types::{EventMask, RenameCorrelation, WatchHandle};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the event loop and its initial watches
/// - readiness waiting on the inotify descriptor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let mut raw = load_or_default(args.config.as_deref())?;
    apply_cli_overrides(&args, &mut raw);
    let cfg = ConfigFile::try_from(raw)?;
    cfg.require_paths()?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let mut event_loop = EventLoop::new(cfg.loop_options());
    event_loop.init()?;

    let mask = cfg.event_mask();
    for path in &cfg.watch.paths {
        let handle = if cfg.watch.recursive {
            event_loop.add_watch_recursively(path, mask)
        } else {
            event_loop.add_watch(path, mask)
        }
        .with_context(|| format!("cannot watch {}", path.display()))?;
        debug!(%handle, ?path, "root watch installed");
    }
    info!(
        roots = cfg.watch.paths.len(),
        watches = event_loop.tree().len(),
        recursive = cfg.watch.recursive,
        "watchtree started"
    );

    let fd = event_loop
        .descriptor()
        .context("event loop has no descriptor after init")?;
    let ready = AsyncFd::new(fd).context("cannot register inotify descriptor with tokio")?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut printed = 0u64;
    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res.context("failed to listen for Ctrl+C")?;
                info!("interrupted; stopping");
                break;
            }
            guard = ready.readable() => {
                let mut guard = guard?;
                let done = drain(&mut event_loop, cfg.reader.batch_capacity, args.count, &mut printed)?;
                guard.clear_ready();
                if done {
                    info!(printed, "event count reached; stopping");
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Read and print until the descriptor has nothing queued. Returns `true`
/// once `limit` events have been printed.
fn drain<F: Facility>(
    event_loop: &mut EventLoop<F>,
    capacity: usize,
    limit: Option<u64>,
    printed: &mut u64,
) -> Result<bool> {
    loop {
        for event in event_loop.read_events(capacity)? {
            println!("{}", describe(event_loop, &event));
            *printed += 1;
            if limit.is_some_and(|n| *printed >= n) {
                return Ok(true);
            }
        }

        if event_loop.buffered() == 0 && event_loop.bytes_available()? == 0 {
            return Ok(false);
        }
    }
}

/// One output line: handle, kinds, and the path the event refers to as the
/// tree currently knows it.
fn describe<F: Facility>(event_loop: &EventLoop<F>, event: &Event) -> String {
    let kinds = event.mask.kind_names().join(",");
    let path = match (event_loop.resolve_path(event.handle), event.name()) {
        (Some(dir), Some(name)) => {
            let mut full = OsString::from(dir);
            full.push(name);
            PathBuf::from(full).display().to_string()
        }
        (Some(path), None) => path.display().to_string(),
        (None, Some(name)) => format!("<{}>/{}", event.handle, name.to_string_lossy()),
        (None, None) => format!("<{}>", event.handle),
    };
    format!("{}\t{}\t{}", event.handle, kinds, path)
}

fn apply_cli_overrides(args: &CliArgs, raw: &mut RawConfigFile) {
    if !args.paths.is_empty() {
        raw.watch.paths = args.paths.clone();
    }
    if let Some(recursive) = args.recursive_override() {
        raw.watch.recursive = recursive;
    }
    if let Some(list) = &args.events {
        raw.watch.events = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(mode) = args.rename_correlation {
        raw.reader.rename_correlation = mode;
    }
}

/// Print the effective configuration.
fn print_dry_run(cfg: &ConfigFile) {
    println!("watchtree dry-run");
    println!("  watch.recursive = {}", cfg.watch.recursive);
    println!(
        "  watch.events = {} ({:#x})",
        cfg.event_mask().kind_names().join(","),
        cfg.event_mask().bits()
    );
    println!("  reader.buffer_size = {}", cfg.reader.buffer_size);
    println!("  reader.batch_capacity = {}", cfg.reader.batch_capacity);
    println!(
        "  reader.rename_correlation = {:?}",
        cfg.reader.rename_correlation
    );
    println!();

    println!("paths ({}):", cfg.watch.paths.len());
    for path in &cfg.watch.paths {
        println!("  - {}", path.display());
    }

    debug!("dry-run complete (nothing watched)");
}
