//! Effect layer: the meme surface and the sound stream. The kernel never
//! calls into here; the session hands trigger events to the `Stage`.

pub mod player;
pub mod presenter;
pub mod process;
pub mod stage;

pub use player::{CommandPlayer, NativePlayer, Player, SystemPlayer};
pub use presenter::{CommandPresenter, MemeCard, Presenter};
pub use stage::{Stage, StageReport};

use std::path::PathBuf;

/// A running presentation or playback. `stop` must return promptly; the
/// teardown itself may finish in the background.
pub trait ActiveOutput: Send {
    fn stop(&mut self);
    fn is_active(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("empty command template")]
    EmptyCommand,
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read image {path}: {reason}")]
    Image { path: PathBuf, reason: String },
    #[error("cannot decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("audio backend: {0}")]
    Backend(String),
}

/// Playback gain in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume(f32);

impl Default for Volume {
    fn default() -> Self {
        Volume(1.0)
    }
}

impl Volume {
    pub fn new(level: f32) -> Self {
        if level.is_nan() {
            return Self::default();
        }
        Volume(level.clamp(0.0, 1.0))
    }

    pub fn get(&self) -> f32 {
        self.0
    }

    pub fn percent(&self) -> u8 {
        (self.0 * 100.0).round() as u8
    }

    pub fn adjust(self, delta: f32) -> Self {
        Self::new(self.0 + delta)
    }
}
