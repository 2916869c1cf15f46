use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::kernel::trigger::TriggerConfig;
use crate::outputs::stage::StageConfig;
use crate::outputs::Volume;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{field} must be a non-negative number of seconds, got {value}")]
    NegativeDuration { field: &'static str, value: f64 },
    #[error("{field} must be within [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f32 },
    #[error("{0} must not be empty")]
    EmptyCommand(&'static str),
    #[error("surface_max must be at least 1x1")]
    EmptySurface,
    #[error("capture_size must be between 1x1 and {max_width}x{max_height}, got {width}x{height}")]
    CaptureSize {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },
}

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSelector {
    Device(u32),
    /// A directory of still images replayed in a loop.
    Directory(PathBuf),
}

impl CameraSelector {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<u32>() {
            Ok(index) => CameraSelector::Device(index),
            Err(_) => CameraSelector::Directory(PathBuf::from(raw)),
        }
    }
}

impl Default for CameraSelector {
    fn default() -> Self {
        CameraSelector::Device(0)
    }
}

impl<'de> Deserialize<'de> for CameraSelector {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Index(u32),
            Text(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Index(index) => CameraSelector::Device(index),
            Raw::Text(text) => CameraSelector::parse(&text),
        })
    }
}

/// Full runtime configuration. Durations are seconds in the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Seconds between polls; also the classifier's rate limit.
    pub poll_interval: f64,
    pub confidence_threshold: f32,
    /// Seconds an emotion must be held before a meme fires.
    pub hold_duration: f64,
    /// Seconds between memes.
    pub cooldown_duration: f64,
    /// How long a meme stays on screen.
    pub display_duration: f64,
    pub sound_enabled: bool,
    pub volume: f32,
    pub camera: CameraSelector,
    /// Mirror frames before classification.
    pub mirror: bool,
    pub memes_dir: PathBuf,
    pub sounds_dir: PathBuf,
    pub classifier_command: Vec<String>,
    pub presenter_command: Vec<String>,
    pub player_command: Vec<String>,
    pub surface_max: (u32, u32),
    /// Frame size the camera is scaled to before classification.
    pub capture_size: (u32, u32),
}

/// Largest accepted `capture_size` (8K UHD).
pub const MAX_CAPTURE_SIZE: (u32, u32) = (7680, 4320);

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: 0.3,
            confidence_threshold: 0.4,
            hold_duration: 2.0,
            cooldown_duration: 5.0,
            display_duration: 4.0,
            sound_enabled: true,
            volume: 1.0,
            camera: CameraSelector::default(),
            mirror: true,
            memes_dir: PathBuf::from("assets/memes"),
            sounds_dir: PathBuf::from("assets/sounds"),
            classifier_command: vec!["memey-classifier".to_string()],
            presenter_command: strings(&[
                "ffplay", "-loglevel", "quiet", "-window_title", "{title}",
                "-x", "{width}", "-y", "{height}", "{path}",
            ]),
            player_command: strings(&[
                "ffplay", "-nodisp", "-autoexit", "-loglevel", "quiet",
                "-volume", "{volume}", "{path}",
            ]),
            surface_max: (960, 540),
            capture_size: (640, 480),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("poll_interval", self.poll_interval),
            ("hold_duration", self.hold_duration),
            ("cooldown_duration", self.cooldown_duration),
            ("display_duration", self.display_duration),
        ] {
            // also rejects NaN and infinity, which Duration can't hold
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::NegativeDuration { field, value });
            }
        }
        for (field, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("volume", self.volume),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { field, value });
            }
        }
        for (field, command) in [
            ("classifier_command", &self.classifier_command),
            ("presenter_command", &self.presenter_command),
            ("player_command", &self.player_command),
        ] {
            if command.first().map(|p| p.trim().is_empty()).unwrap_or(true) {
                return Err(ConfigError::EmptyCommand(field));
            }
        }
        if self.surface_max.0 == 0 || self.surface_max.1 == 0 {
            return Err(ConfigError::EmptySurface);
        }
        let (width, height) = self.capture_size;
        let (max_width, max_height) = MAX_CAPTURE_SIZE;
        if width == 0 || height == 0 || width > max_width || height > max_height {
            return Err(ConfigError::CaptureSize { width, height, max_width, max_height });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval)
    }

    pub fn trigger(&self) -> TriggerConfig {
        TriggerConfig {
            confidence_threshold: self.confidence_threshold,
            hold_duration: Duration::from_secs_f64(self.hold_duration),
            cooldown_duration: Duration::from_secs_f64(self.cooldown_duration),
        }
    }

    pub fn stage(&self) -> StageConfig {
        StageConfig {
            display_duration: Duration::from_secs_f64(self.display_duration),
            sound_enabled: self.sound_enabled,
            volume: Volume::new(self.volume),
        }
    }
}

#[derive(Parser, Debug, Default)]
#[command(
    name = "memey",
    version,
    about = "Shows a meme and plays a sound when you hold a facial expression",
    long_about = "Memey watches the webcam, classifies your facial emotion, and when\n\
                  an emotion is held long enough it pops up a matching meme and\n\
                  plays a matching sound.\n\n\
                  Settings come from defaults, then --config (JSON), then flags."
)]
pub struct Cli {
    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Camera device index, or a directory of images to replay
    #[arg(long)]
    pub camera: Option<String>,

    /// Meme library root (one subdirectory per emotion)
    #[arg(long)]
    pub memes_dir: Option<PathBuf>,

    /// Sound library root (one file per emotion)
    #[arg(long)]
    pub sounds_dir: Option<PathBuf>,

    /// Seconds between polls
    #[arg(long)]
    pub poll_interval: Option<f64>,

    /// Minimum classifier confidence (0-1)
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Seconds to hold an emotion before a meme fires
    #[arg(long)]
    pub hold: Option<f64>,

    /// Seconds between memes
    #[arg(long)]
    pub cooldown: Option<f64>,

    /// Seconds a meme stays on screen
    #[arg(long)]
    pub display: Option<f64>,

    /// Start with sound off
    #[arg(long)]
    pub no_sound: bool,

    /// Playback volume (0-1)
    #[arg(long)]
    pub volume: Option<f32>,

    /// Do not mirror camera frames
    #[arg(long)]
    pub no_mirror: bool,

    /// Classifier sidecar command line
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    pub classifier: Option<Vec<String>>,
}

impl Cli {
    /// Defaults, then the config file, then flags. Validated.
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut Config) {
        if let Some(camera) = &self.camera {
            config.camera = CameraSelector::parse(camera);
        }
        if let Some(dir) = &self.memes_dir {
            config.memes_dir = dir.clone();
        }
        if let Some(dir) = &self.sounds_dir {
            config.sounds_dir = dir.clone();
        }
        if let Some(v) = self.poll_interval {
            config.poll_interval = v;
        }
        if let Some(v) = self.threshold {
            config.confidence_threshold = v;
        }
        if let Some(v) = self.hold {
            config.hold_duration = v;
        }
        if let Some(v) = self.cooldown {
            config.cooldown_duration = v;
        }
        if let Some(v) = self.display {
            config.display_duration = v;
        }
        if self.no_sound {
            config.sound_enabled = false;
        }
        if let Some(v) = self.volume {
            config.volume = v;
        }
        if self.no_mirror {
            config.mirror = false;
        }
        if let Some(command) = &self.classifier {
            config.classifier_command = command.clone();
        }
    }
}
