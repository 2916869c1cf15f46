#![allow(dead_code)]

use memey::assets::{MemeLibrary, SoundLibrary};
use memey::outputs::stage::{Stage, StageConfig};
use memey::outputs::{ActiveOutput, MemeCard, OutputError, Player, Presenter, Volume};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Ordered log of what the stubs were asked to do.
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub struct StubOutput {
    name: String,
    log: Log,
    active: Arc<AtomicBool>,
}

impl ActiveOutput for StubOutput {
    fn stop(&mut self) {
        if self.active.swap(false, Ordering::SeqCst) {
            self.log.push(format!("stop {}", self.name));
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

#[derive(Clone, Default)]
pub struct StubPresenter {
    pub log: Log,
    pub fail: bool,
    // Liveness flag of the most recent surface, so tests can close the
    // window behind the stage's back.
    pub last_surface: Arc<Mutex<Option<Arc<AtomicBool>>>>,
}

impl StubPresenter {
    pub fn close_window(&self) {
        if let Some(active) = self.last_surface.lock().unwrap().as_ref() {
            active.store(false, Ordering::SeqCst);
        }
    }
}

impl Presenter for StubPresenter {
    fn present(&self, card: &MemeCard<'_>) -> Result<Box<dyn ActiveOutput>, OutputError> {
        if self.fail {
            return Err(OutputError::EmptyCommand);
        }
        let name = file_name(card.path);
        self.log.push(format!("show {}", name));
        let active = Arc::new(AtomicBool::new(true));
        *self.last_surface.lock().unwrap() = Some(active.clone());
        Ok(Box::new(StubOutput { name, log: self.log.clone(), active }))
    }
}

#[derive(Clone, Default)]
pub struct StubPlayer {
    pub log: Log,
    pub fail: bool,
}

impl Player for StubPlayer {
    fn play(
        &mut self,
        sound: &Path,
        volume: Volume,
    ) -> Result<Box<dyn ActiveOutput>, OutputError> {
        if self.fail {
            return Err(OutputError::Backend("no device".into()));
        }
        let name = file_name(sound);
        self.log.push(format!("play {} @{}", name, volume.percent()));
        Ok(Box::new(StubOutput {
            name,
            log: self.log.clone(),
            active: Arc::new(AtomicBool::new(true)),
        }))
    }
}

/// memes/{happy,sad,neutral}/<emotion>.png and sounds/{happy,sad}.mp3
pub fn asset_fixture() -> (TempDir, Arc<MemeLibrary>, Arc<SoundLibrary>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let memes = dir.path().join("memes");
    let sounds = dir.path().join("sounds");

    for emotion in ["happy", "sad", "neutral"] {
        let bucket = memes.join(emotion);
        std::fs::create_dir_all(&bucket).unwrap();
        std::fs::write(bucket.join(format!("{emotion}.png")), b"png").unwrap();
    }
    std::fs::create_dir_all(&sounds).unwrap();
    for emotion in ["happy", "sad"] {
        std::fs::write(sounds.join(format!("{emotion}.mp3")), b"mp3").unwrap();
    }

    let memes = Arc::new(MemeLibrary::load(&memes).unwrap());
    let sounds = Arc::new(SoundLibrary::load(&sounds).unwrap());
    (dir, memes, sounds)
}

pub fn stub_stage(config: StageConfig) -> (TempDir, Log, Stage<StubPresenter, StubPlayer>) {
    let (dir, log, _, stage) = stub_stage_with_presenter(config);
    (dir, log, stage)
}

/// Like `stub_stage`, also handing back the presenter the stage shows through.
pub fn stub_stage_with_presenter(
    config: StageConfig,
) -> (TempDir, Log, StubPresenter, Stage<StubPresenter, StubPlayer>) {
    let (dir, memes, sounds) = asset_fixture();
    let log = Log::default();
    let presenter = StubPresenter { log: log.clone(), ..StubPresenter::default() };
    let player = StubPlayer { log: log.clone(), fail: false };
    let stage = Stage::new(presenter.clone(), player, memes, sounds, config);
    (dir, log, presenter, stage)
}
