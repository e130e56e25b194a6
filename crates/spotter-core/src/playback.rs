//! The playback consumer seam.
//!
//! Spotter does not decode or play audio itself. A trigger is handed to a
//! [`PlaybackSink`]; the daemon uses [`CommandSink`], which runs a
//! user-configured command (for example a media player) and reports its
//! completion back on the runtime channel.

use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::TriggerConfig;
use crate::error::{Error, WindowResult};
use crate::runtime::RuntimeMsg;
use crate::trigger::DurationCap;

/// Placeholder replaced by the duration cap in command arguments.
pub const DURATION_PLACEHOLDER: &str = "{duration}";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Receives trigger events. Implementations must not block the caller.
pub trait PlaybackSink {
    fn trigger(&mut self, duration: DurationCap) -> WindowResult<()>;

    /// Picks up changed trigger settings after a config reload.
    fn reconfigure(&mut self, _config: &TriggerConfig) {}
}

/// Completion report for a playback started by [`CommandSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackFinished {
    pub program: String,
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// Whether the process was stopped, because it reached the cap or a
    /// newer trigger replaced it.
    pub stopped: bool,
}

/// Logs triggers and does nothing else.
#[derive(Debug, Default)]
pub struct LogSink;

impl PlaybackSink for LogSink {
    fn trigger(&mut self, duration: DurationCap) -> WindowResult<()> {
        info!("trigger (duration: {duration})");
        Ok(())
    }
}

/// Runs a command on every trigger and stops it once the cap elapses.
///
/// At most one playback runs at a time: a new trigger stops the running
/// command before starting it again.
pub struct CommandSink {
    argv: Vec<String>,
    events: mpsc::Sender<RuntimeMsg>,
    current: Option<Playback>,
}

/// A running command and the thread supervising it.
struct Playback {
    stop: Arc<AtomicBool>,
    supervisor: thread::JoinHandle<()>,
}

impl Playback {
    fn is_running(&self) -> bool {
        !self.supervisor.is_finished()
    }

    /// Asks the supervisor to kill the command and waits for it.
    fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.supervisor.join();
    }
}

impl CommandSink {
    /// `argv[0]` is the program. An empty `argv` only logs triggers.
    pub fn new(argv: Vec<String>, events: mpsc::Sender<RuntimeMsg>) -> Self {
        Self {
            argv,
            events,
            current: None,
        }
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Whether a started command is still running.
    pub fn is_playing(&self) -> bool {
        self.current.as_ref().is_some_and(Playback::is_running)
    }

    fn stop_current(&mut self) {
        if let Some(playback) = self.current.take() {
            if playback.is_running() {
                info!("stopping previous playback");
            }
            playback.stop();
        }
    }
}

impl Drop for CommandSink {
    fn drop(&mut self) {
        self.stop_current();
    }
}

impl PlaybackSink for CommandSink {
    fn trigger(&mut self, duration: DurationCap) -> WindowResult<()> {
        let argv = self.argv.clone();
        let Some((program, args)) = argv.split_first() else {
            info!("trigger (duration: {duration}); no command configured");
            return Ok(());
        };

        self.stop_current();
        let mut child = Command::new(program)
            .args(expand_args(args, duration))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Io(std::io::Error::new(e.kind(), format!("{program}: {e}"))))?;
        info!("started '{program}' (PID {}, duration: {duration})", child.id());

        let program = program.clone();
        let events = self.events.clone();
        let cap = duration.as_duration();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let supervisor = thread::spawn(move || {
            let finished = supervise(&mut child, program, cap, &stop_flag);
            let _ = events.send(RuntimeMsg::PlaybackFinished(finished));
        });
        self.current = Some(Playback { stop, supervisor });
        Ok(())
    }

    fn reconfigure(&mut self, config: &TriggerConfig) {
        if self.argv != config.command {
            info!("trigger command changed to {:?}", config.command);
            self.argv = config.command.clone();
        }
    }
}

/// Substitutes the cap into every argument. A full-length playback is
/// written as `-1`, the same convention as the config file.
pub fn expand_args(args: &[String], duration: DurationCap) -> Vec<String> {
    let value = match duration {
        DurationCap::Full => "-1".to_string(),
        DurationCap::Seconds(s) => s.to_string(),
    };
    args.iter()
        .map(|arg| arg.replace(DURATION_PLACEHOLDER, &value))
        .collect()
}

/// Waits for `child`, killing it once `cap` has elapsed or `stop` is set.
fn supervise(
    child: &mut Child,
    program: String,
    cap: Option<Duration>,
    stop: &AtomicBool,
) -> PlaybackFinished {
    let started = Instant::now();
    let mut stopped = false;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {}
            Err(e) => {
                warn!("lost track of '{program}': {e}");
                break None;
            }
        }
        if stop.load(Ordering::Relaxed) || cap.is_some_and(|cap| started.elapsed() >= cap) {
            let _ = child.kill();
            stopped = true;
            break child.wait().ok();
        }
        thread::sleep(POLL_INTERVAL);
    };

    PlaybackFinished {
        program,
        exit_code: status.and_then(|s| s.code()),
        stopped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn placeholder_is_replaced_by_cap() {
        // Arrange
        let argv = args(&["-t", "{duration}", "--len={duration}s", "alert.wav"]);

        // Act
        let capped = expand_args(&argv, DurationCap::Seconds(2.5));
        let full = expand_args(&argv, DurationCap::Full);

        // Assert
        assert_eq!(capped, args(&["-t", "2.5", "--len=2.5s", "alert.wav"]));
        assert_eq!(full, args(&["-t", "-1", "--len=-1s", "alert.wav"]));
    }

    #[test]
    fn empty_command_only_logs() {
        // Arrange
        let (tx, rx) = mpsc::channel();
        let mut sink = CommandSink::new(Vec::new(), tx);

        // Act
        let result = sink.trigger(DurationCap::Full);

        // Assert
        assert!(result.is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn missing_program_is_an_error() {
        // Arrange
        let (tx, _rx) = mpsc::channel();
        let mut sink = CommandSink::new(args(&["spotter-test-no-such-program"]), tx);

        // Act
        let err = sink.trigger(DurationCap::Full).unwrap_err();

        // Assert
        assert!(err.to_string().contains("spotter-test-no-such-program"));
    }

    #[test]
    fn reconfigure_replaces_command() {
        // Arrange
        let (tx, _rx) = mpsc::channel();
        let mut sink = CommandSink::new(args(&["old"]), tx);
        let config = TriggerConfig {
            command: args(&["new", "{duration}"]),
            ..Default::default()
        };

        // Act
        sink.reconfigure(&config);

        // Assert
        assert_eq!(sink.argv(), args(&["new", "{duration}"]).as_slice());
    }

    #[cfg(unix)]
    #[test]
    fn finished_command_reports_exit_code() {
        // Arrange
        let (tx, rx) = mpsc::channel();
        let mut sink = CommandSink::new(args(&["sh", "-c", "exit 3"]), tx);

        // Act
        sink.trigger(DurationCap::Full).unwrap();
        let msg = rx.recv_timeout(Duration::from_secs(10)).unwrap();

        // Assert
        let RuntimeMsg::PlaybackFinished(finished) = msg else {
            panic!("unexpected message");
        };
        assert_eq!(finished.program, "sh");
        assert_eq!(finished.exit_code, Some(3));
        assert!(!finished.stopped);
    }

    #[cfg(unix)]
    #[test]
    fn capped_command_is_stopped() {
        // Arrange
        let (tx, rx) = mpsc::channel();
        let mut sink = CommandSink::new(args(&["sleep", "30"]), tx);
        let started = Instant::now();

        // Act
        sink.trigger(DurationCap::Seconds(0.2)).unwrap();
        let msg = rx.recv_timeout(Duration::from_secs(10)).unwrap();

        // Assert
        let RuntimeMsg::PlaybackFinished(finished) = msg else {
            panic!("unexpected message");
        };
        assert!(finished.stopped);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn new_trigger_replaces_running_command() {
        // Arrange
        let (tx, rx) = mpsc::channel();
        let mut sink = CommandSink::new(args(&["sleep", "30"]), tx);

        // Act
        for _ in 0..3 {
            sink.trigger(DurationCap::Full).unwrap();
        }
        let replaced: Vec<_> = (0..2)
            .map(|_| rx.recv_timeout(Duration::from_secs(10)).unwrap())
            .collect();

        // Assert
        for msg in replaced {
            let RuntimeMsg::PlaybackFinished(finished) = msg else {
                panic!("unexpected message");
            };
            assert!(finished.stopped);
        }
        assert!(sink.is_playing());
        assert!(rx.try_recv().is_err());

        drop(sink);
        let last = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(matches!(last, RuntimeMsg::PlaybackFinished(PlaybackFinished { stopped: true, .. })));
    }
}
