use crate::kernel::emotion::{Emotion, UnknownEmotion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::frame::Frame;

/// Dominant emotion plus confidence in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub emotion: Emotion,
    pub confidence: f32,
    /// Per-label scores when the model reports them.
    pub scores: Option<BTreeMap<Emotion, f32>>,
}

impl Prediction {
    pub fn new(emotion: Emotion, confidence: f32) -> Self {
        Self { emotion, confidence: confidence.clamp(0.0, 1.0), scores: None }
    }

    /// What the kernel assumes before the first successful classification.
    pub fn no_signal() -> Self {
        Self::new(Emotion::Neutral, 0.0)
    }

    /// The `n` highest per-label scores, best first. Empty without scores.
    pub fn top_scores(&self, n: usize) -> Vec<(Emotion, f32)> {
        let mut ranked: Vec<(Emotion, f32)> = self
            .scores
            .iter()
            .flat_map(|scores| scores.iter().map(|(e, s)| (*e, *s)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("no face in frame")]
    NoFace,
    #[error("classifier reported: {0}")]
    Model(String),
    #[error(transparent)]
    UnknownLabel(#[from] UnknownEmotion),
    #[error("classifier protocol: {0}")]
    Protocol(String),
    #[error("classifier process: {0}")]
    Io(#[from] std::io::Error),
}

/// Opaque emotion model. Implementations may be slow; callers rate-limit.
pub trait Classifier: Send {
    fn classify(&mut self, frame: &Frame) -> Result<Prediction, ClassifyError>;
}

/// Caches the last prediction and only consults the model once per
/// `interval`. Never fails: a model error yields the last known reading.
pub struct RateLimitedClassifier<C> {
    inner: C,
    interval: Duration,
    last_run: Option<Instant>,
    last: Prediction,
}

impl<C: Classifier> RateLimitedClassifier<C> {
    pub fn new(inner: C, interval: Duration) -> Self {
        Self {
            inner,
            interval,
            last_run: None,
            last: Prediction::no_signal(),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn classify_at(&mut self, frame: &Frame, now: Instant) -> Prediction {
        if let Some(last_run) = self.last_run {
            if now.saturating_duration_since(last_run) < self.interval {
                return self.last.clone();
            }
        }
        // Stamp before the call so a failing model is still rate-limited.
        self.last_run = Some(now);

        match self.inner.classify(frame) {
            Ok(prediction) => {
                debug!(
                    emotion = %prediction.emotion,
                    confidence = prediction.confidence,
                    top = ?prediction.top_scores(3),
                    "classified"
                );
                self.last = prediction;
            }
            Err(ClassifyError::NoFace) => debug!("no face, keeping last reading"),
            Err(e) => warn!("classification failed, keeping last reading: {}", e),
        }
        self.last.clone()
    }
}

#[derive(Debug, Serialize)]
struct FrameHeader<'a> {
    width: u32,
    height: u32,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct SidecarReply {
    label: Option<String>,
    confidence: Option<f32>,
    #[serde(default)]
    scores: Option<BTreeMap<String, f32>>,
    error: Option<String>,
}

/// Parses one reply line of the sidecar protocol.
pub fn parse_reply(line: &str) -> Result<Prediction, ClassifyError> {
    let reply: SidecarReply =
        serde_json::from_str(line.trim()).map_err(|e| ClassifyError::Protocol(e.to_string()))?;

    if let Some(error) = reply.error {
        return Err(if error.to_ascii_lowercase().contains("no face") {
            ClassifyError::NoFace
        } else {
            ClassifyError::Model(error)
        });
    }

    let label = reply
        .label
        .ok_or_else(|| ClassifyError::Protocol("reply has neither label nor error".into()))?;
    let emotion: Emotion = label.parse()?;
    let confidence = reply.confidence.unwrap_or(0.0);

    // Unknown score keys are dropped rather than failing the whole reply.
    let scores = reply.scores.map(|raw| {
        raw.into_iter()
            .filter_map(|(k, v)| k.parse::<Emotion>().ok().map(|e| (e, v.clamp(0.0, 1.0))))
            .collect()
    });

    Ok(Prediction { scores, ..Prediction::new(emotion, confidence) })
}

/// Emotion model hosted in a child process, JSON lines over stdio.
///
/// Request: `{"width":W,"height":H,"format":"rgb8"}\n` then `W*H*3` bytes.
/// Reply: `{"label":"happy","confidence":0.91}` or `{"error":"no face"}`.
/// A dead sidecar is respawned on the next call.
pub struct CommandClassifier {
    command: Vec<String>,
    process: Option<Sidecar>,
}

struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl CommandClassifier {
    /// Spawns the sidecar up front so a bad command fails at startup.
    pub fn spawn(command: Vec<String>) -> Result<Self, ClassifyError> {
        let process = Some(Sidecar::spawn(&command)?);
        info!(command = ?command, "classifier sidecar started");
        Ok(Self { command, process })
    }
}

impl Sidecar {
    fn spawn(command: &[String]) -> Result<Self, ClassifyError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| ClassifyError::Protocol("empty classifier command".into()))?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClassifyError::Protocol("sidecar stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClassifyError::Protocol("sidecar stdout not captured".into()))?;
        Ok(Self { child, stdin, stdout: BufReader::new(stdout) })
    }

    fn round_trip(&mut self, frame: &Frame) -> Result<Prediction, ClassifyError> {
        let header = FrameHeader {
            width: frame.image.width(),
            height: frame.image.height(),
            format: "rgb8",
        };
        let mut line =
            serde_json::to_vec(&header).map_err(|e| ClassifyError::Protocol(e.to_string()))?;
        line.push(b'\n');
        self.stdin.write_all(&line)?;
        self.stdin.write_all(frame.image.as_raw())?;
        self.stdin.flush()?;

        let mut reply = String::new();
        if self.stdout.read_line(&mut reply)? == 0 {
            return Err(ClassifyError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "sidecar closed stdout",
            )));
        }
        parse_reply(&reply)
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Classifier for CommandClassifier {
    fn classify(&mut self, frame: &Frame) -> Result<Prediction, ClassifyError> {
        if self.process.is_none() {
            warn!("respawning classifier sidecar");
            self.process = Some(Sidecar::spawn(&self.command)?);
        }
        let Some(sidecar) = self.process.as_mut() else {
            return Err(ClassifyError::Protocol("sidecar unavailable".into()));
        };

        match sidecar.round_trip(frame) {
            Err(ClassifyError::Io(e)) => {
                // Pipe is in an unknown state; drop it and start fresh next time.
                self.process = None;
                Err(ClassifyError::Io(e))
            }
            other => other,
        }
    }
}
