use super::presenter::{MemeCard, Presenter};
use super::player::Player;
use super::{ActiveOutput, Volume};
use crate::assets::{MemeLibrary, SoundLibrary};
use crate::kernel::event::TriggerEvent;
use crate::kernel::telemetry::StageFailure;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageConfig {
    pub display_duration: Duration,
    pub sound_enabled: bool,
    pub volume: Volume,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            display_duration: Duration::from_secs(4),
            sound_enabled: true,
            volume: Volume::default(),
        }
    }
}

/// What `perform` actually did with one event.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StageReport {
    pub presented: Option<PathBuf>,
    pub played: Option<PathBuf>,
    pub failures: Vec<StageFailure>,
}

// The one live surface, shared with the timer that will dismiss it.
struct PresentationSlot {
    surface: Arc<Mutex<Box<dyn ActiveOutput>>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

fn close_surface(surface: &Mutex<Box<dyn ActiveOutput>>) {
    match surface.lock() {
        Ok(mut surface) => surface.stop(),
        Err(poisoned) => poisoned.into_inner().stop(),
    }
}

fn surface_active(surface: &Mutex<Box<dyn ActiveOutput>>) -> bool {
    match surface.lock() {
        Ok(surface) => surface.is_active(),
        Err(poisoned) => poisoned.into_inner().is_active(),
    }
}

/// Executes trigger events: one meme surface and one sound at a time.
///
/// Every call returns without waiting on rendering or decoding. Must be
/// driven from inside a tokio runtime (dismissal timers are tasks).
pub struct Stage<P, A> {
    presenter: P,
    player: A,
    memes: Arc<MemeLibrary>,
    sounds: Arc<SoundLibrary>,
    config: StageConfig,
    presentation: Option<PresentationSlot>,
    playback: Option<Box<dyn ActiveOutput>>,
    rng: StdRng,
}

impl<P: Presenter, A: Player> Stage<P, A> {
    pub fn new(
        presenter: P,
        player: A,
        memes: Arc<MemeLibrary>,
        sounds: Arc<SoundLibrary>,
        config: StageConfig,
    ) -> Self {
        Self {
            presenter,
            player,
            memes,
            sounds,
            config,
            presentation: None,
            playback: None,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn perform(&mut self, event: &TriggerEvent) -> StageReport {
        let mut report = StageReport::default();
        let label = event.emotion.as_str();

        match self.memes.pick(label, &mut self.rng).map(Path::to_path_buf) {
            None => info!(emotion = label, "no meme available"),
            Some(path) => {
                self.dismiss();
                let card = MemeCard { emotion: event.emotion, path: &path };
                match self.presenter.present(&card) {
                    Ok(surface) => {
                        self.presentation = Some(self.schedule_dismissal(surface));
                        report.presented = Some(path);
                    }
                    Err(e) => {
                        warn!(emotion = label, "error displaying meme: {}", e);
                        report.failures.push(StageFailure::Presentation);
                    }
                }
            }
        }

        if self.config.sound_enabled {
            match self.sounds.sound_for(label).map(Path::to_path_buf) {
                None => debug!(emotion = label, "no sound available"),
                Some(path) => {
                    self.stop_sound();
                    match self.player.play(&path, self.config.volume) {
                        Ok(playback) => {
                            self.playback = Some(playback);
                            report.played = Some(path);
                        }
                        Err(e) => {
                            warn!(emotion = label, "error playing sound: {}", e);
                            report.failures.push(StageFailure::Playback);
                        }
                    }
                }
            }
        }

        report
    }

    fn schedule_dismissal(&self, surface: Box<dyn ActiveOutput>) -> PresentationSlot {
        let surface = Arc::new(Mutex::new(surface));
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let shared = surface.clone();
        let after = self.config.display_duration;

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(after) => {
                    close_surface(&shared);
                    debug!("meme auto-dismissed");
                }
                _ = token.cancelled() => debug!("meme replaced or closed"),
            }
        });

        PresentationSlot { surface, cancel, task }
    }

    /// Closes the current meme, if any, ahead of its timer. The surface is
    /// stopped before this returns.
    pub fn dismiss(&mut self) {
        if let Some(slot) = self.presentation.take() {
            slot.cancel.cancel();
            close_surface(&slot.surface);
        }
    }

    pub fn stop_sound(&mut self) {
        if let Some(mut playback) = self.playback.take() {
            playback.stop();
        }
    }

    /// False once the timer fired or the viewer went away on its own.
    pub fn is_presenting(&self) -> bool {
        self.presentation
            .as_ref()
            .map(|slot| !slot.task.is_finished() && surface_active(&slot.surface))
            .unwrap_or(false)
    }

    pub fn is_playing(&self) -> bool {
        self.playback.as_ref().map(|p| p.is_active()).unwrap_or(false)
    }

    /// Returns the new state. Turning sound off silences what's playing.
    pub fn toggle_sound(&mut self) -> bool {
        self.config.sound_enabled = !self.config.sound_enabled;
        if !self.config.sound_enabled {
            self.stop_sound();
        }
        info!(enabled = self.config.sound_enabled, "sound toggled");
        self.config.sound_enabled
    }

    pub fn sound_enabled(&self) -> bool {
        self.config.sound_enabled
    }

    /// Applies from the next playback on.
    pub fn adjust_volume(&mut self, delta: f32) -> Volume {
        self.config.volume = self.config.volume.adjust(delta);
        info!(volume = self.config.volume.percent(), "volume");
        self.config.volume
    }

    pub fn volume(&self) -> Volume {
        self.config.volume
    }

    pub fn shutdown(&mut self) {
        self.dismiss();
        self.stop_sound();
    }
}
