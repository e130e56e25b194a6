//! The runtime message loop.
//!
//! Ticks, config reloads and playback completions all arrive on one
//! channel and are handled on the loop thread, so the orchestrator is
//! only ever touched from a single thread.

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::playback::{PlaybackFinished, PlaybackSink};
use crate::source::CaptureBackend;
use crate::trigger::{TickOutcome, TriggerOrchestrator};

/// Messages handled by [`Runtime::run`].
#[derive(Debug)]
pub enum RuntimeMsg {
    /// Time to poll the target window.
    Tick,
    /// A validated config from the file watcher.
    Reload(Box<Config>),
    /// A playback started by a trigger has ended.
    PlaybackFinished(PlaybackFinished),
    /// Leave the loop.
    Stop,
}

/// Single-slot gate between the tick thread and the loop.
///
/// Set from the moment a [`RuntimeMsg::Tick`] is queued until the loop
/// has finished handling it, so a slow tick never leaves more than one
/// tick waiting behind it.
#[derive(Debug, Clone, Default)]
pub struct TickSlot(Arc<AtomicBool>);

impl TickSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the slot. Returns `false` if a tick is already pending.
    pub fn claim(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Frees the slot once a tick has run to completion.
    pub fn release(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Spawns a thread that sends [`RuntimeMsg::Tick`] every `interval`
/// until `stop` is set or the receiver goes away. An interval that
/// elapses while the previous tick is still pending is skipped.
pub fn spawn_tick_thread(
    tx: mpsc::Sender<RuntimeMsg>,
    interval: Duration,
    stop: Arc<AtomicBool>,
    slot: TickSlot,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(interval);
            if !slot.claim() {
                continue;
            }
            if tx.send(RuntimeMsg::Tick).is_err() {
                break;
            }
        }
    })
}

/// Owns the orchestrator and the playback sink for the loop's lifetime.
pub struct Runtime<B: CaptureBackend> {
    orchestrator: TriggerOrchestrator<B>,
    sink: Box<dyn PlaybackSink>,
    debug_path: Option<PathBuf>,
    triggers: u64,
    tick_slot: TickSlot,
}

impl<B: CaptureBackend> Runtime<B> {
    /// Builds a runtime and applies `config` to the orchestrator.
    pub fn new(
        orchestrator: TriggerOrchestrator<B>,
        sink: Box<dyn PlaybackSink>,
        config: &Config,
    ) -> Self {
        let mut runtime = Self {
            orchestrator,
            sink,
            debug_path: None,
            triggers: 0,
            tick_slot: TickSlot::new(),
        };
        runtime.reload(config);
        runtime
    }

    pub fn orchestrator(&self) -> &TriggerOrchestrator<B> {
        &self.orchestrator
    }

    /// The slot to hand to [`spawn_tick_thread`]; released after every
    /// handled tick.
    pub fn tick_slot(&self) -> TickSlot {
        self.tick_slot.clone()
    }

    /// Number of triggers handed to the sink so far.
    pub fn triggers(&self) -> u64 {
        self.triggers
    }

    /// Handles messages until [`RuntimeMsg::Stop`] arrives or every
    /// sender is gone.
    pub fn run(&mut self, rx: &mpsc::Receiver<RuntimeMsg>) {
        while let Ok(msg) = rx.recv() {
            if self.handle(msg).is_break() {
                break;
            }
        }
    }

    pub fn handle(&mut self, msg: RuntimeMsg) -> ControlFlow<()> {
        match msg {
            RuntimeMsg::Tick => {
                self.tick();
                self.tick_slot.release();
            }
            RuntimeMsg::Reload(config) => {
                info!("config reloaded");
                self.reload(&config);
            }
            RuntimeMsg::PlaybackFinished(finished) => {
                info!(
                    "playback '{}' finished (exit code {:?}, stopped at cap: {})",
                    finished.program, finished.exit_code, finished.stopped
                );
            }
            RuntimeMsg::Stop => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn reload(&mut self, config: &Config) {
        self.orchestrator.apply_config(config);
        self.sink.reconfigure(&config.trigger);
        self.debug_path = config.debug.save_path.clone();
    }

    fn tick(&mut self) {
        let outcome = self.orchestrator.tick();

        if outcome.matched()
            && let Some(path) = &self.debug_path
            && let Err(e) = self.orchestrator.matcher().save_debug_image(path)
        {
            warn!("could not save debug image: {e}");
        }

        if let TickOutcome::Triggered(event) = outcome {
            self.triggers += 1;
            if let Err(e) = self.sink.trigger(event.duration) {
                warn!("playback failed: {e}");
            }
        } else {
            debug!("tick: {outcome:?}");
        }
    }
}
