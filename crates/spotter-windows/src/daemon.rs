use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use spotter_core::config;
use spotter_core::{
    CommandSink, FrameSource, ImageMatcher, LogSink, PlaybackSink, Runtime, RuntimeMsg,
    TriggerOrchestrator, WindowResult,
};
use tracing::info;

use crate::backend::Win32Backend;
use crate::strategy::default_strategies;
use crate::{config_watcher, ctrl_c, dpi};

/// Options for [`run`], set from the command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunOptions {
    /// Log triggers instead of running the configured command.
    pub dry_run: bool,
    /// Raise Spotter's own log targets to `debug`, like `debug.enabled`.
    pub verbose: bool,
}

/// Runs the watcher until Ctrl+C.
///
/// The main thread owns the orchestrator and handles every message.
/// Background threads produce ticks, config reloads and playback
/// completions.
pub fn run(options: RunOptions) -> WindowResult<()> {
    dpi::enable_dpi_awareness();

    let config = config::load();
    let verbose = options.verbose || config.debug.enabled;
    if let Some(path) = spotter_core::log::init(&config.logging, verbose) {
        eprintln!("Logging to {}", path.display());
    }

    info!("Spotter started (PID: {})", std::process::id());
    info!(
        "Config: target={:?}, template={}, method={}, threshold={}, cooldown={}ms, duration={}",
        config.target.process_name,
        config.matching.template.display(),
        config.matching.method.as_str(),
        config.matching.threshold,
        config.trigger.cooldown_ms,
        config.trigger.duration_cap(),
    );

    let (tx, rx) = mpsc::channel::<RuntimeMsg>();
    ctrl_c::set_handler(tx.clone())?;

    let source = FrameSource::new(Win32Backend, default_strategies());
    let orchestrator = TriggerOrchestrator::new(source, ImageMatcher::new());
    let sink: Box<dyn PlaybackSink> = if options.dry_run {
        Box::new(LogSink)
    } else {
        Box::new(CommandSink::new(config.trigger.command.clone(), tx.clone()))
    };
    let mut runtime = Runtime::new(orchestrator, sink, &config);

    let stop = Arc::new(AtomicBool::new(false));
    let tick_thread = spotter_core::runtime::spawn_tick_thread(
        tx.clone(),
        Duration::from_millis(config.trigger.tick_ms),
        stop.clone(),
        runtime.tick_slot(),
    );
    let watcher_stop = stop.clone();
    let watcher_tx = tx.clone();
    thread::spawn(move || config_watcher::watch(watcher_tx, watcher_stop));
    drop(tx);

    eprintln!("Spotter running. Press Ctrl+C to stop.");
    runtime.run(&rx);

    stop.store(true, Ordering::Relaxed);
    let _ = tick_thread.join();
    info!("Spotter stopped after {} trigger(s)", runtime.triggers());
    eprintln!("Spotter stopped.");
    Ok(())
}
