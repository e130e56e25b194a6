pub mod config;
pub mod error;
pub mod frame;
pub mod log;
pub mod matcher;
pub mod playback;
pub mod rect;
pub mod runtime;
pub mod source;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, WindowResult};
pub use frame::{Frame, frame_from_bgra};
pub use matcher::{ImageMatcher, MatchMethod, MatchResult, Preprocessing};
pub use playback::{CommandSink, LogSink, PlaybackFinished, PlaybackSink};
pub use rect::{Point, Rect};
pub use runtime::{Runtime, RuntimeMsg};
pub use source::{CaptureArea, CaptureBackend, CaptureStrategy, FrameSource, ProcessId};
pub use trigger::{DurationCap, TickOutcome, TriggerEvent, TriggerOrchestrator};
