//! Configuration module for window layout, playback hotkey and alert settings.
//! Stored as a small INI file in the per-user config directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info, warn};

const DEFAULT_CONFIG_INI: &str = include_str!("../config.ini");

/// Fallback URL behind the "Install" button of the unsupported-media notice
pub const DEFAULT_CODEC_URL: &str = "https://codecguide.com/download_k-lite_codec_pack_basic.htm";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ignoring [{section}] {key}: invalid value {value:?}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
    #[error("config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Key that toggles play/pause from the global listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayKey {
    Space,
    Enter,
    Pause,
    Letter(char),
}

impl FromStr for PlayKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "space" | "spacebar" => Ok(Self::Space),
            "enter" | "return" => Ok(Self::Enter),
            "pause" | "break" => Ok(Self::Pause),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_lowercase() => Ok(Self::Letter(c)),
                    _ => Err(()),
                }
            }
        }
    }
}

impl PlayKey {
    pub fn as_str(&self) -> String {
        match self {
            Self::Space => "space".to_string(),
            Self::Enter => "enter".to_string(),
            Self::Pause => "pause".to_string(),
            Self::Letter(c) => c.to_string(),
        }
    }

    /// Convert to the key reported by the global hook
    pub fn to_rdev_key(&self) -> Option<rdev::Key> {
        use rdev::Key;
        let key = match self {
            Self::Space => Key::Space,
            Self::Enter => Key::Return,
            Self::Pause => Key::Pause,
            Self::Letter(c) => match c {
                'a' => Key::KeyA,
                'b' => Key::KeyB,
                'c' => Key::KeyC,
                'd' => Key::KeyD,
                'e' => Key::KeyE,
                'f' => Key::KeyF,
                'g' => Key::KeyG,
                'h' => Key::KeyH,
                'i' => Key::KeyI,
                'j' => Key::KeyJ,
                'k' => Key::KeyK,
                'l' => Key::KeyL,
                'm' => Key::KeyM,
                'n' => Key::KeyN,
                'o' => Key::KeyO,
                'p' => Key::KeyP,
                'q' => Key::KeyQ,
                'r' => Key::KeyR,
                's' => Key::KeyS,
                't' => Key::KeyT,
                'u' => Key::KeyU,
                'v' => Key::KeyV,
                'w' => Key::KeyW,
                'x' => Key::KeyX,
                'y' => Key::KeyY,
                'z' => Key::KeyZ,
                _ => return None,
            },
        };
        Some(key)
    }
}

/// A loaded configuration plus what happened while reading it.
///
/// Loading runs before the tracing subscriber exists, so problems are kept
/// here and logged by [`LoadedConfig::report`] once it does.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
    /// The file did not exist and was written from the defaults
    pub created: bool,
    pub problems: Vec<ConfigError>,
}

impl LoadedConfig {
    pub fn report(&self) {
        if self.created {
            info!("Created default config at {}", self.path.display());
        } else {
            debug!("Loaded config from {}", self.path.display());
        }
        for problem in &self.problems {
            warn!("Config: {}", problem);
        }
    }
}

/// Position and size of a window, in points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLayout {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Initial viewer window placement
    pub viewer: WindowLayout,
    /// Dominant-side size used for newly opened media
    pub base_size: u32,
    /// Viewer background color (RGB)
    pub background_rgb: [u8; 3],
    /// Initial controller window placement
    pub controller: WindowLayout,
    /// Offset added to the size slider position (minimum window size)
    pub size_slider_offset: u32,
    /// Initial size slider position
    pub size_slider_initial: u32,
    /// Folder the open dialog starts in; `None` means `media` beside the executable
    pub media_dir: Option<PathBuf>,
    /// Whether the global keyboard listener is started
    pub global_hotkey: bool,
    pub toggle_play_key: PlayKey,
    pub codec_install_url: String,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            viewer: WindowLayout {
                x: 0,
                y: 0,
                width: 700,
                height: 500,
            },
            base_size: 700,
            background_rgb: [0, 0, 0],
            controller: WindowLayout {
                x: 750,
                y: 100,
                width: 700,
                height: 100,
            },
            size_slider_offset: 200,
            size_slider_initial: 500,
            media_dir: None,
            global_hotkey: true,
            toggle_play_key: PlayKey::Space,
            codec_install_url: DEFAULT_CODEC_URL.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Per-user configuration directory, created on demand.
    fn config_dir() -> PathBuf {
        let dir = directories::ProjectDirs::from("dev", "pvd", "pvd-viewer")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| exe_dir().unwrap_or_else(|| PathBuf::from(".")));

        let _ = fs::create_dir_all(&dir);
        dir
    }

    /// Get settings file path.
    ///
    /// Seeds the user file from a `config.ini` shipped beside the executable
    /// the first time it is looked up.
    pub fn config_path() -> PathBuf {
        let config = Self::config_dir().join("config.ini");

        if !config.exists() {
            if let Some(shipped) = exe_dir().map(|d| d.join("config.ini")) {
                if shipped.exists() && shipped != config {
                    let _ = fs::copy(&shipped, &config);
                }
            }
        }

        config
    }

    /// Load configuration, writing the bundled template on first run.
    pub fn load() -> LoadedConfig {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> LoadedConfig {
        let mut loaded = LoadedConfig {
            config: Config::default(),
            path: path.to_path_buf(),
            created: false,
            problems: Vec::new(),
        };

        if !path.exists() {
            if fs::write(path, DEFAULT_CONFIG_INI).is_ok() {
                loaded.created = true;
            } else {
                match loaded.config.save_to(path) {
                    Ok(()) => loaded.created = true,
                    Err(e) => loaded.problems.push(e),
                }
                return loaded;
            }
        }

        match fs::read_to_string(path) {
            Ok(content) => {
                let (config, problems) = Self::parse_ini(&content);
                loaded.config = config;
                loaded.problems.extend(problems);
            }
            Err(source) => {
                loaded.problems.push(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
        loaded
    }

    /// Parse INI content into Config. Invalid values keep the default and
    /// are returned alongside it.
    pub fn parse_ini(content: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::default();
        let mut problems = Vec::new();
        let mut section = String::new();

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                section = line[1..line.len() - 1].trim().to_lowercase();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if let Err(e) = config.apply(&section, &key, value) {
                problems.push(e);
            }
        }

        (config, problems)
    }

    fn apply(&mut self, section: &str, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        };

        match (section, key) {
            ("viewer", "x") => self.viewer.x = value.parse().map_err(|_| invalid())?,
            ("viewer", "y") => self.viewer.y = value.parse().map_err(|_| invalid())?,
            ("viewer", "width") => self.viewer.width = parse_size(value).ok_or_else(invalid)?,
            ("viewer", "height") => self.viewer.height = parse_size(value).ok_or_else(invalid)?,
            ("viewer", "base_size") => self.base_size = parse_size(value).ok_or_else(invalid)?,
            ("viewer", "background_rgb") => {
                self.background_rgb = parse_rgb_triplet(value).ok_or_else(invalid)?
            }
            ("controller", "x") => self.controller.x = value.parse().map_err(|_| invalid())?,
            ("controller", "y") => self.controller.y = value.parse().map_err(|_| invalid())?,
            ("controller", "width") => {
                self.controller.width = parse_size(value).ok_or_else(invalid)?
            }
            ("controller", "height") => {
                self.controller.height = parse_size(value).ok_or_else(invalid)?
            }
            ("controller", "size_slider_offset") => {
                self.size_slider_offset = value.parse().map_err(|_| invalid())?
            }
            ("controller", "size_slider_initial") => {
                self.size_slider_initial = value.parse().map_err(|_| invalid())?
            }
            ("controller", "media_dir") => {
                self.media_dir = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            ("playback", "global_hotkey") => {
                self.global_hotkey = parse_bool(value).ok_or_else(invalid)?
            }
            ("playback", "toggle_play_key") => {
                self.toggle_play_key = value.parse().map_err(|_| invalid())?
            }
            ("alert", "codec_install_url") => {
                if value.is_empty() {
                    return Err(invalid());
                }
                self.codec_install_url = value.to_string();
            }
            ("logging", "level") => {
                if value.is_empty() {
                    return Err(invalid());
                }
                self.log_level = value.to_lowercase();
            }
            _ => debug!("Unknown config key [{}] {}", section, key),
        }

        Ok(())
    }

    /// Folder the open dialog starts in
    pub fn media_dir(&self) -> PathBuf {
        self.media_dir.clone().unwrap_or_else(|| {
            exe_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("media")
        })
    }

    /// Render the configuration back to INI text
    pub fn to_ini_string(&self) -> String {
        let mut content = String::new();

        content.push_str("; PVD Viewer configuration\n\n");

        content.push_str("[Viewer]\n");
        push_layout(&mut content, &self.viewer);
        content.push_str(&format!("base_size = {}\n", self.base_size));
        let [r, g, b] = self.background_rgb;
        content.push_str(&format!("background_rgb = {}, {}, {}\n\n", r, g, b));

        content.push_str("[Controller]\n");
        push_layout(&mut content, &self.controller);
        content.push_str(&format!("size_slider_offset = {}\n", self.size_slider_offset));
        content.push_str(&format!("size_slider_initial = {}\n", self.size_slider_initial));
        content.push_str(&format!(
            "media_dir = {}\n\n",
            self.media_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        ));

        content.push_str("[Playback]\n");
        content.push_str(&format!("global_hotkey = {}\n", self.global_hotkey));
        content.push_str(&format!(
            "toggle_play_key = {}\n\n",
            self.toggle_play_key.as_str()
        ));

        content.push_str("[Alert]\n");
        content.push_str(&format!("codec_install_url = {}\n\n", self.codec_install_url));

        content.push_str("[Logging]\n");
        content.push_str(&format!("level = {}\n", self.log_level));

        content
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, self.to_ini_string()).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
}

fn push_layout(content: &mut String, layout: &WindowLayout) {
    content.push_str(&format!("x = {}\n", layout.x));
    content.push_str(&format!("y = {}\n", layout.y));
    content.push_str(&format!("width = {}\n", layout.width));
    content.push_str(&format!("height = {}\n", layout.height));
}

/// Window sizes must be non-zero
fn parse_size(value: &str) -> Option<u32> {
    value.parse::<u32>().ok().filter(|v| *v > 0)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_rgb_triplet(value: &str) -> Option<[u8; 3]> {
    let parts: Vec<&str> = value
        .split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 {
        return None;
    }
    let r = parts[0].parse::<u8>().ok()?;
    let g = parts[1].parse::<u8>().ok()?;
    let b = parts[2].parse::<u8>().ok()?;
    Some([r, g, b])
}
