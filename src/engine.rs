//! Playback engine interface and the events it reports back to the viewer.

use std::path::Path;

use thiserror::Error;

use crate::session::{MediaStatus, PlaybackState};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to initialize GStreamer: {0}")]
    Init(String),
    #[error("failed to build playback pipeline: {0}")]
    Pipeline(String),
    #[error("failed to load {path}: {reason}")]
    Load {
        path: std::path::PathBuf,
        reason: String,
    },
}

/// Change notifications produced while the engine runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    StateChanged(PlaybackState),
    PositionChanged(u64),
    DurationChanged(u64),
}

impl EngineEvent {
    pub fn dispatch(self, observer: &mut dyn PlaybackObserver) {
        match self {
            EngineEvent::StateChanged(state) => observer.on_state_changed(state),
            EngineEvent::PositionChanged(ms) => observer.on_position_changed(ms),
            EngineEvent::DurationChanged(ms) => observer.on_duration_changed(ms),
        }
    }
}

/// Receiver of engine events
pub trait PlaybackObserver {
    fn on_state_changed(&mut self, state: PlaybackState);
    fn on_position_changed(&mut self, position_ms: u64);
    fn on_duration_changed(&mut self, duration_ms: u64);
}

/// A decoded RGBA frame with tightly packed rows
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Media playback backend driven from the UI thread
pub trait PlaybackEngine {
    /// Load a file without starting playback
    fn load(&mut self, path: &Path) -> Result<(), EngineError>;
    fn play(&mut self);
    fn pause(&mut self);
    /// Jump to an absolute position, in milliseconds
    fn seek_to(&mut self, position_ms: u64);
    /// Release the loaded media
    fn unload(&mut self);

    fn state(&self) -> PlaybackState;
    fn media_status(&self) -> MediaStatus;
    /// Reported duration in milliseconds; 0 when unknown or a still image
    fn duration_ms(&self) -> u64;

    /// Drain pending change notifications
    fn poll_events(&mut self) -> Vec<EngineEvent>;
    /// Most recent decoded frame, if a new one arrived since the last call
    fn take_frame(&mut self) -> Option<VideoFrame>;
}
