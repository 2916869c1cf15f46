use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use memey::assets::{MemeLibrary, SoundLibrary};
use memey::config::{CameraSelector, Cli};
use memey::control::{self, HELP};
use memey::kernel::event::Observation;
use memey::kernel::time::{SessionClock, MIN_POLL};
use memey::kernel::TriggerController;
use memey::outputs::stage::Stage;
use memey::outputs::{CommandPlayer, CommandPresenter, SystemPlayer};
use memey::session::{Flow, Session};
use memey::vision::{
    Classifier, CommandClassifier, DirectorySource, FfmpegCamera, FrameSource, Prediction,
    RateLimitedClassifier, VisionPipeline,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("memey=info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    info!("MEMEY - Emotion Meme Generator");

    let config = cli.resolve().context("invalid configuration")?;

    // 2. Libraries (read-only from here on)
    let memes = Arc::new(MemeLibrary::load(&config.memes_dir).context("loading meme library")?);
    let sounds =
        Arc::new(SoundLibrary::load(&config.sounds_dir).context("loading sound library")?);
    info!(
        emotions = ?memes.available_emotions(),
        root = %memes.root().display(),
        "memes available"
    );
    if sounds.is_empty() {
        warn!(root = %sounds.root().display(), "no sounds found, memes will play silently");
    }

    // 3. Vision. Camera or classifier failing here ends the run before the loop.
    let classifier = match CommandClassifier::spawn(config.classifier_command.clone()) {
        Ok(c) => RateLimitedClassifier::new(c, config.poll_interval()),
        Err(e) => {
            error!("could not start classifier: {}", e);
            return Err(e).context("classifier unavailable");
        }
    };
    let predictions = match &config.camera {
        CameraSelector::Device(index) => match FfmpegCamera::open(*index, config.capture_size) {
            Ok(camera) => start_vision(camera, classifier, config.mirror)?,
            Err(e) => {
                error!("could not open camera {}: {}", index, e);
                error!("make sure your webcam is connected");
                return Err(e).context("camera unavailable");
            }
        },
        CameraSelector::Directory(dir) => {
            let source = DirectorySource::open(dir, config.poll_interval())
                .context("frame directory unusable")?;
            start_vision(source, classifier, config.mirror)?
        }
    };

    // 4. Kernel + stage
    let presenter = CommandPresenter::new(config.presenter_command.clone(), config.surface_max);
    let player = SystemPlayer::new(CommandPlayer::new(config.player_command.clone()));
    let stage = Stage::new(presenter, player, memes, sounds, config.stage());
    let mut session = Session::new(TriggerController::new(config.trigger()), stage);

    // 5. Controls
    let (cmd_tx, mut cmd_rx) = mpsc::channel(32);
    control::spawn_stdin_reader(cmd_tx.clone());
    control::spawn_ctrl_c(cmd_tx);
    println!("{HELP}");

    // 6. Poll
    let clock = SessionClock::start();
    let mut cadence = interval(config.poll_interval().max(MIN_POLL));
    cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(session = %session.stats().session_id(), "memey is ready");

    let mut predictions = predictions;
    'poll: loop {
        cadence.tick().await;

        while let Ok(command) = cmd_rx.try_recv() {
            if session.handle(command, clock.now()) == Flow::Quit {
                break 'poll;
            }
        }

        if predictions.has_changed().is_err() {
            warn!("camera stream ended");
            break;
        }
        let prediction = predictions.borrow_and_update().clone();
        session.observe(Observation::new(prediction.emotion, prediction.confidence, clock.now()));
    }

    info!("cleaning up");
    let summary = session.shutdown(clock.now());
    info!(summary = %serde_json::to_string(&summary)?, "session summary");
    info!("goodbye");
    Ok(())
}

/// Moves capture + classification onto their own OS thread.
fn start_vision<S, C>(
    source: S,
    classifier: RateLimitedClassifier<C>,
    mirror: bool,
) -> anyhow::Result<watch::Receiver<Prediction>>
where
    S: FrameSource + 'static,
    C: Classifier + 'static,
{
    let (pipeline, rx) = VisionPipeline::new(source, classifier, mirror);
    std::thread::Builder::new()
        .name("vision".into())
        .spawn(move || pipeline.run())
        .context("spawning vision thread")?;
    Ok(rx)
}
