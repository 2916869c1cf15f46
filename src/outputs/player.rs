use super::process::{render_command, ProcessOutput};
use super::{ActiveOutput, OutputError, Volume};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Starts playback of one sound. The returned handle stops it.
pub trait Player: Send {
    fn play(
        &mut self,
        sound: &Path,
        volume: Volume,
    ) -> Result<Box<dyn ActiveOutput>, OutputError>;
}

/// External player process. Placeholders: `{path}`, `{volume}` (0-100).
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    template: Vec<String>,
}

impl CommandPlayer {
    pub fn new(template: Vec<String>) -> Self {
        Self { template }
    }

    pub fn argv(&self, sound: &Path, volume: Volume) -> Vec<String> {
        render_command(
            &self.template,
            &[
                ("path", sound.display().to_string()),
                ("volume", volume.percent().to_string()),
            ],
        )
    }
}

impl Player for CommandPlayer {
    fn play(
        &mut self,
        sound: &Path,
        volume: Volume,
    ) -> Result<Box<dyn ActiveOutput>, OutputError> {
        let output = ProcessOutput::spawn(&self.argv(sound, volume))?;
        info!(sound = %sound.display(), volume = volume.percent(), "playing");
        Ok(Box::new(output))
    }
}

/// Decoded PCM, interleaved, normalized to [-1, 1].
#[derive(Debug, Clone)]
pub struct WavClip {
    pub channels: u16,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl WavClip {
    pub fn load(path: &Path) -> Result<Self, OutputError> {
        let decode_err = |e: hound::Error| OutputError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        let reader = hound::WavReader::open(path).map_err(decode_err)?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(decode_err)?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << spec.bits_per_sample.saturating_sub(1).min(31)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(decode_err)?
            }
        };

        Ok(Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            samples,
        })
    }

    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() as u64 / self.channels.max(1) as u64;
        Duration::from_secs_f64(frames as f64 / self.sample_rate.max(1) as f64)
    }
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// In-process WAV playback on the default output device.
///
/// `cpal::Stream` is not `Send` on every host, so each clip gets a thread
/// that decodes it, owns its stream and parks until the clip drains or a
/// stop arrives. `play` only spawns that thread; a clip that cannot be
/// decoded or opened shows up as a handle that is no longer active.
#[derive(Debug, Default)]
pub struct NativePlayer;

struct NativePlayback {
    stop_tx: Option<mpsc::Sender<()>>,
    playing: Arc<AtomicBool>,
}

impl ActiveOutput for NativePlayback {
    fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }

    fn is_active(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

impl Player for NativePlayer {
    fn play(
        &mut self,
        sound: &Path,
        volume: Volume,
    ) -> Result<Box<dyn ActiveOutput>, OutputError> {
        if !is_wav(sound) {
            return Err(OutputError::UnsupportedFormat(sound.to_path_buf()));
        }
        Ok(Box::new(spawn_voice(sound.to_path_buf(), volume, None)))
    }
}

// External player used when the device refuses a clip. The voice thread is
// outside the runtime, so it carries a handle to spawn the process with.
struct Fallback {
    player: CommandPlayer,
    runtime: tokio::runtime::Handle,
}

enum Voice {
    Native(cpal::Stream),
    External(Box<dyn ActiveOutput>),
}

fn spawn_voice(sound: PathBuf, volume: Volume, fallback: Option<Fallback>) -> NativePlayback {
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let playing = Arc::new(AtomicBool::new(true));
    let flag = playing.clone();

    std::thread::spawn(move || {
        let Some(voice) = open_voice(&sound, volume, &flag, fallback) else {
            flag.store(false, Ordering::SeqCst);
            return;
        };

        loop {
            let finished = match &voice {
                Voice::Native(_) => !flag.load(Ordering::SeqCst),
                Voice::External(output) => !output.is_active(),
            };
            if finished {
                break;
            }
            match stop_rx.recv_timeout(Duration::from_millis(50)) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }

        if let Voice::External(mut output) = voice {
            output.stop();
        }
        flag.store(false, Ordering::SeqCst);
    });

    NativePlayback { stop_tx: Some(stop_tx), playing }
}

fn open_voice(
    sound: &Path,
    volume: Volume,
    playing: &Arc<AtomicBool>,
    fallback: Option<Fallback>,
) -> Option<Voice> {
    let native = WavClip::load(sound).and_then(|clip| {
        let secs = clip.duration().as_secs_f32();
        let stream = build_stream(clip, volume, playing.clone())?;
        info!(sound = %sound.display(), volume = volume.percent(), secs, "playing");
        Ok(stream)
    });
    let error = match native {
        Ok(stream) => return Some(Voice::Native(stream)),
        Err(e) => e,
    };

    let Some(Fallback { mut player, runtime }) = fallback else {
        warn!(sound = %sound.display(), "native playback failed: {}", error);
        return None;
    };
    warn!(
        sound = %sound.display(),
        "native playback failed, using external player: {}", error
    );

    let _runtime = runtime.enter();
    match player.play(sound, volume) {
        Ok(output) => Some(Voice::External(output)),
        Err(e) => {
            warn!(sound = %sound.display(), "external playback failed: {}", e);
            None
        }
    }
}

fn build_stream(
    clip: WavClip,
    volume: Volume,
    playing: Arc<AtomicBool>,
) -> Result<cpal::Stream, OutputError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| OutputError::Backend("no output device available".into()))?;

    let config = cpal::StreamConfig {
        channels: clip.channels,
        sample_rate: cpal::SampleRate(clip.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let gain = volume.get();
    let samples = clip.samples;
    let mut cursor = 0usize;
    let err_fn = |err| error!("an error occurred on output stream: {}", err);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for out in data.iter_mut() {
                    *out = match samples.get(cursor) {
                        Some(sample) => {
                            cursor += 1;
                            sample * gain
                        }
                        None => 0.0,
                    };
                }
                if cursor >= samples.len() {
                    playing.store(false, Ordering::SeqCst);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| OutputError::Backend(e.to_string()))?;

    stream.play().map_err(|e| OutputError::Backend(e.to_string()))?;
    Ok(stream)
}

/// WAV in-process when the device accepts the clip's format, everything else
/// (and any native failure) through the external player.
pub struct SystemPlayer {
    native: NativePlayer,
    fallback: CommandPlayer,
}

impl SystemPlayer {
    pub fn new(fallback: CommandPlayer) -> Self {
        Self { native: NativePlayer, fallback }
    }
}

impl Player for SystemPlayer {
    fn play(
        &mut self,
        sound: &Path,
        volume: Volume,
    ) -> Result<Box<dyn ActiveOutput>, OutputError> {
        if !is_wav(sound) {
            return self.fallback.play(sound, volume);
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return self.native.play(sound, volume);
        };
        let fallback = Fallback { player: self.fallback.clone(), runtime };
        Ok(Box::new(spawn_voice(sound.to_path_buf(), volume, Some(fallback))))
    }
}
