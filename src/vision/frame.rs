use image::RgbImage;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::assets::IMAGE_EXTENSIONS;

#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image, captured_at: Instant::now() }
    }

    /// Selfie view: the user sees themselves as in a mirror.
    pub fn mirrored(self) -> Self {
        Self {
            image: image::imageops::flip_horizontal(&self.image),
            captured_at: self.captured_at,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("frame stream ended")]
    EndOfStream,
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Anything that yields frames. Blocking; run it off the async runtime.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Frame, CaptureError>;
}

/// Webcam via an `ffmpeg` child emitting fixed-size `rgb24` frames on
/// stdout. `ffmpeg` scales to `size`, so every frame is exactly
/// `width * height * 3` bytes.
pub struct FfmpegCamera {
    child: Child,
    stdout: BufReader<ChildStdout>,
    size: (u32, u32),
    // First frame is read during `open` to prove the device works.
    primed: Option<Frame>,
}

impl FfmpegCamera {
    /// Spawns ffmpeg for `device_index` and blocks until the first frame
    /// arrives. Any failure here means the device is unusable.
    pub fn open(device_index: u32, size: (u32, u32)) -> Result<Self, CaptureError> {
        let (format, device) = platform_input(device_index)?;
        let (width, height) = size;
        info!(format, device = %device, width, height, "opening camera");

        let mut child = Command::new("ffmpeg")
            .args(["-loglevel", "error", "-f", format, "-i", &device])
            .args(["-vf", &format!("scale={width}:{height}")])
            .args(["-pix_fmt", "rgb24", "-f", "rawvideo", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                CaptureError::DeviceUnavailable(format!("failed to spawn ffmpeg: {e}"))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::DeviceUnavailable("ffmpeg stdout not captured".into()))?;
        let mut stdout = BufReader::new(stdout);

        let first = match read_raw_frame(&mut stdout, size) {
            Ok(Some(image)) => Frame::new(image),
            Ok(None) => {
                let _ = child.kill();
                return Err(CaptureError::DeviceUnavailable(format!(
                    "no frames from {device}"
                )));
            }
            Err(e) => {
                let _ = child.kill();
                return Err(CaptureError::DeviceUnavailable(e.to_string()));
            }
        };
        info!("camera started");

        Ok(Self { child, stdout, size, primed: Some(first) })
    }
}

impl FrameSource for FfmpegCamera {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        if let Some(frame) = self.primed.take() {
            return Ok(frame);
        }
        match read_raw_frame(&mut self.stdout, self.size)? {
            Some(image) => Ok(Frame::new(image)),
            None => Err(CaptureError::EndOfStream),
        }
    }
}

impl Drop for FfmpegCamera {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn platform_input(index: u32) -> Result<(&'static str, String), CaptureError> {
    if cfg!(target_os = "linux") {
        Ok(("v4l2", format!("/dev/video{index}")))
    } else if cfg!(target_os = "macos") {
        Ok(("avfoundation", index.to_string()))
    } else {
        Err(CaptureError::DeviceUnavailable(
            "device capture is only wired for linux (v4l2) and macos (avfoundation)".into(),
        ))
    }
}

/// Reads one packed `rgb24` frame of `size`. `Ok(None)` on a clean EOF at a
/// frame boundary; EOF inside a frame is `EndOfStream`.
pub fn read_raw_frame<R: BufRead>(
    reader: &mut R,
    size: (u32, u32),
) -> Result<Option<RgbImage>, CaptureError> {
    if reader.fill_buf()?.is_empty() {
        return Ok(None);
    }

    let (width, height) = size;
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(3))
        .ok_or_else(|| CaptureError::Malformed(format!("frame size {width}x{height}")))?;
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => CaptureError::EndOfStream,
        _ => e.into(),
    })?;

    RgbImage::from_raw(width, height, data)
        .map(Some)
        .ok_or_else(|| CaptureError::Malformed("pixel buffer size mismatch".into()))
}

/// Replays a directory of still images in name order, looping forever.
/// Handy for demos and for running without a webcam.
pub struct DirectorySource {
    frames: Vec<PathBuf>,
    cursor: usize,
    pace: Duration,
}

impl DirectorySource {
    pub fn open(dir: impl AsRef<Path>, pace: Duration) -> Result<Self, CaptureError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            CaptureError::DeviceUnavailable(format!("{}: {e}", dir.display()))
        })?;

        let mut frames = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && crate::assets::has_extension(&path, IMAGE_EXTENSIONS) {
                frames.push(path);
            }
        }
        frames.sort();

        if frames.is_empty() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "no images in {}",
                dir.display()
            )));
        }
        info!(dir = %dir.display(), frames = frames.len(), "replaying still frames");
        Ok(Self { frames, cursor: 0, pace })
    }
}

impl FrameSource for DirectorySource {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        // Bounded number of attempts so a directory of broken files can't spin.
        for _ in 0..self.frames.len() {
            let path = &self.frames[self.cursor];
            self.cursor = (self.cursor + 1) % self.frames.len();
            std::thread::sleep(self.pace);

            match image::open(path) {
                Ok(img) => {
                    debug!(path = %path.display(), "frame");
                    return Ok(Frame::new(img.to_rgb8()));
                }
                Err(e) => warn!(path = %path.display(), "skipping unreadable frame: {}", e),
            }
        }
        Err(CaptureError::EndOfStream)
    }
}
