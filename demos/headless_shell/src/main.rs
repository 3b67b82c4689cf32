// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runs a shell on its own thread and feeds it display events.
//!
//! Without arguments the display is headless: backend calls are recorded and
//! printed. `--x11` manages the children of the root window on `$DISPLAY`
//! until the connection closes. `--config <path>` loads a `ShellConfig`.

use anyhow::{Context, Result, bail};
use canopy_backend_x11::{X11Display, X11Mode};
use canopy_core::event::Notification;
use canopy_core::geometry::Rect;
use canopy_core::policy::apply_requests;
use canopy_core::scene::SurfaceHandle;
use canopy_shell::headless::{HeadlessBackend, Passthrough, channel_source};
use canopy_shell::{DisplayNotification, EventPump, Shell, ShellConfig, ShellExecutor};
use tracing::{info, warn};

const ROOT: SurfaceHandle = SurfaceHandle(0x100);
const CLIENT: SurfaceHandle = SurfaceHandle(0x200);

struct Args {
    x11: bool,
    config: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        x11: false,
        config: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--x11" => args.x11 = true,
            "--config" => {
                args.config = Some(iter.next().context("--config needs a path")?);
            }
            other => bail!("unknown argument `{other}`"),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    if let Ok(env_filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt()
            .compact()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt().compact().init();
    }

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => ShellConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => ShellConfig::default(),
    };

    if args.x11 { run_x11(&config) } else { run_headless(&config) }
}

fn run_headless(config: &ShellConfig) -> Result<()> {
    let backend = HeadlessBackend::new();
    let mut shell = Shell::new(config, Some(ROOT), Rect::new(0, 0, 800, 600), backend.clone());
    shell.subscribe(None, apply_requests);
    let root = shell.tree().root();
    let client = shell.attach_surface(root, CLIENT, Rect::new(100, 100, 50, 50))?;
    let registry = shell.registry().clone();

    let executor = ShellExecutor::spawn(shell, &config.thread_name)?;
    let handle = executor.handle();

    handle.request_show(client).wait()?;
    handle.request_move(root, 10, 10).wait()?;
    let absolute = handle
        .submit(move |shell| Ok(shell.tree().absolute_position(client)))
        .wait()?;
    info!(?absolute, "client position after moving the root");
    handle.request_hide(root).wait()?;
    handle.request_show(root).wait()?;

    let (events, source) = channel_source();
    let pump = EventPump::spawn(
        source,
        Passthrough,
        registry,
        handle.clone(),
        config.event_queue_capacity,
    )?;
    for event in [
        DisplayNotification::new(CLIENT, Notification::Geometry(Rect::new(120, 90, 60, 40))),
        DisplayNotification::new(CLIENT, Notification::FocusGained),
        DisplayNotification::new(SurfaceHandle(0xdead), Notification::FocusGained),
        DisplayNotification::new(CLIENT, Notification::Destroy),
    ] {
        events.send(event)?;
    }
    drop(events);
    let stats = pump.join()?;
    info!(?stats, "event pump finished");

    match handle.request_raise(client).wait() {
        Ok(()) => bail!("raise on a destroyed client succeeded"),
        Err(err) => info!(%err, "raise after display destroy"),
    }

    let shell = executor.shutdown()?;
    info!(nodes = shell.tree().node_count(), "shell stopped");
    for call in backend.calls() {
        println!("{call:?}");
    }
    Ok(())
}

fn run_x11(config: &ShellConfig) -> Result<()> {
    let display = X11Display::connect(None, X11Mode::Manage)?;
    let mut shell = Shell::new(
        config,
        Some(display.root_surface()),
        display.root_shape(),
        display.backend(),
    );
    shell.subscribe(None, apply_requests);
    let root = shell.tree().root();
    for (surface, shape) in display.top_level_windows()? {
        if let Err(err) = display.watch(surface) {
            warn!(?surface, %err, "skipping window");
            continue;
        }
        shell.attach_surface(root, surface, shape)?;
    }
    info!(windows = shell.registry().len().saturating_sub(1), "adopted existing windows");
    let registry = shell.registry().clone();

    let executor = ShellExecutor::spawn(shell, &config.thread_name)?;
    let pump = EventPump::spawn(
        display.event_source(),
        display.converter(),
        registry,
        executor.handle(),
        config.event_queue_capacity,
    )?;
    info!("managing X display; close the connection to stop");
    let stats = pump.join()?;
    info!(?stats, "event pump finished");
    executor.shutdown()?;
    Ok(())
}
