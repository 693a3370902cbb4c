//! Playback session state and elapsed-time formatting.

use std::path::{Path, PathBuf};

/// Transport state of the playback engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// What the engine knows about the loaded media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaStatus {
    #[default]
    NoMedia,
    /// Load requested, preroll not finished
    Loading,
    Loaded,
    EndOfMedia,
    /// The pipeline could not decode the file
    Unsupported,
}

/// One opened media file
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    media_path: PathBuf,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub state: PlaybackState,
}

impl PlaybackSession {
    pub fn new(media_path: &Path) -> Self {
        Self {
            media_path: media_path.to_path_buf(),
            position_ms: 0,
            duration_ms: 0,
            state: PlaybackState::Stopped,
        }
    }

    pub fn media_path(&self) -> &Path {
        &self.media_path
    }
}

/// Split whole seconds into `(H, MM, SS)`; hours are not padded
pub fn to_time_format(seconds: u64) -> (String, String, String) {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    (
        hours.to_string(),
        format!("{:02}", minutes),
        format!("{:02}", secs),
    )
}

/// Elapsed label text for a position in milliseconds, e.g. `0:01:05`
pub fn format_elapsed(position_ms: u64) -> String {
    let (hours, minutes, seconds) = to_time_format(position_ms / 1000);
    format!("{}:{}:{}", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_format_examples() {
        assert_eq!(
            to_time_format(3661),
            ("1".to_string(), "01".to_string(), "01".to_string())
        );
        assert_eq!(
            to_time_format(59),
            ("0".to_string(), "00".to_string(), "59".to_string())
        );
        assert_eq!(to_time_format(36_000).0, "10");
    }

    #[test]
    fn time_format_recombines_to_input() {
        for s in (0..200_000u64).step_by(997) {
            let (h, m, sec) = to_time_format(s);
            assert_eq!(m.len(), 2);
            assert_eq!(sec.len(), 2);
            let (h, m, sec): (u64, u64, u64) =
                (h.parse().unwrap(), m.parse().unwrap(), sec.parse().unwrap());
            assert!(m < 60 && sec < 60);
            assert_eq!(h * 3600 + m * 60 + sec, s);
        }
    }

    #[test]
    fn elapsed_label_floors_milliseconds() {
        assert_eq!(format_elapsed(0), "0:00:00");
        assert_eq!(format_elapsed(65_999), "0:01:05");
        assert_eq!(format_elapsed(3_723_000), "1:02:03");
    }

    #[test]
    fn new_session_starts_stopped_at_zero() {
        let session = PlaybackSession::new(Path::new("clip.mp4"));
        assert_eq!(session.state, PlaybackState::Stopped);
        assert_eq!(session.position_ms, 0);
        assert_eq!(session.media_path(), Path::new("clip.mp4"));
    }
}
