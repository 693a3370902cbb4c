//! Display state the controller renders; written by the viewer.

/// Glyph shown on the play button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayIcon {
    #[default]
    Play,
    Pause,
}

impl PlayIcon {
    pub fn glyph(&self) -> &'static str {
        match self {
            PlayIcon::Play => "▶",
            PlayIcon::Pause => "⏸",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlWidgets {
    /// Seek slider bounds in milliseconds
    pub seek_range: (u64, u64),
    /// Seek slider position in milliseconds
    pub seek_value: u64,
    pub play_icon: PlayIcon,
    pub timer_label: String,
}

impl Default for ControlWidgets {
    fn default() -> Self {
        Self {
            seek_range: (0, 0),
            seek_value: 0,
            play_icon: PlayIcon::Play,
            timer_label: "0:00:00".to_string(),
        }
    }
}
