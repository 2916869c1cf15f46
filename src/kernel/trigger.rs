use super::emotion::Emotion;
use super::event::TriggerEvent;
use std::time::Duration;
use tracing::{debug, info};

/// Emotion used by `force_trigger` when the current label is neutral.
pub const DEFAULT_MANUAL_EMOTION: Emotion = Emotion::Happy;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerConfig {
    /// Readings below this are treated as "no signal" (neutral).
    pub confidence_threshold: f32,
    /// Minimum episode length before a fire.
    pub hold_duration: Duration,
    /// Minimum spacing between sustained fires, across episodes.
    pub cooldown_duration: Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.4,
            hold_duration: Duration::from_secs(2),
            cooldown_duration: Duration::from_secs(5),
        }
    }
}

/// Observable phase of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Neutral label, or no episode timing (fresh start / after `reset_timer`).
    Idle,
    Holding { emotion: Emotion, since: Duration },
    Triggered { emotion: Emotion, since: Duration },
}

/// Snapshot for the status line. Read-only, never used for decisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldStatus {
    pub emotion: Emotion,
    pub held: Option<Duration>,
    /// 0.0 - 1.0, `None` unless a non-neutral episode is timing.
    pub progress: Option<f32>,
    pub cooldown_remaining: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Episode {
    emotion: Emotion,
    started_at: Option<Duration>,
    triggered: bool,
}

/// Debounce + cooldown state machine over the classifier stream.
///
/// Single writer: the polling loop owns it and calls `observe` in arrival
/// order. Nothing in here blocks or touches I/O.
#[derive(Debug)]
pub struct TriggerController {
    config: TriggerConfig,
    episode: Episode,
    last_trigger: Option<Duration>,
}

impl TriggerController {
    pub fn new(config: TriggerConfig) -> Self {
        Self {
            config,
            episode: Episode {
                emotion: Emotion::Neutral,
                started_at: None,
                triggered: false,
            },
            last_trigger: None,
        }
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Feed one reading. Returns the event when this reading completes a hold.
    pub fn observe(
        &mut self,
        emotion: Emotion,
        confidence: f32,
        now: Duration,
    ) -> Option<TriggerEvent> {
        // NaN must land on the "no signal" side too.
        let emotion = if !(confidence >= self.config.confidence_threshold) {
            Emotion::Neutral
        } else {
            emotion
        };

        // Any change, including a one-frame flicker, restarts the episode.
        if emotion != self.episode.emotion {
            debug!(from = %self.episode.emotion, to = %emotion, "episode reset");
            self.episode = Episode {
                emotion,
                started_at: Some(now),
                triggered: false,
            };
            return None;
        }

        let Some(started_at) = self.episode.started_at else {
            self.episode.started_at = Some(now);
            return None;
        };

        let held = now.saturating_sub(started_at);
        if emotion.is_neutral()
            || held < self.config.hold_duration
            || self.episode.triggered
            || !self.cooldown_elapsed(now)
        {
            return None;
        }

        self.episode.triggered = true;
        self.last_trigger = Some(now);
        info!(emotion = %emotion, held_ms = held.as_millis() as u64, "trigger fired");
        Some(TriggerEvent::sustained(emotion, now))
    }

    /// Manual override. Ignores threshold, hold and cooldown, and leaves
    /// episode and cooldown state exactly as they were.
    pub fn force_trigger(&self, emotion: Emotion, now: Duration) -> TriggerEvent {
        let emotion = if emotion.is_neutral() { DEFAULT_MANUAL_EMOTION } else { emotion };
        info!(emotion = %emotion, "manual trigger");
        TriggerEvent::manual(emotion, now)
    }

    /// Restart the hold countdown without forgetting which label we're on.
    pub fn reset_timer(&mut self) {
        self.episode.started_at = None;
        self.episode.triggered = false;
        info!(emotion = %self.episode.emotion, "hold timer reset");
    }

    pub fn current_emotion(&self) -> Emotion {
        self.episode.emotion
    }

    pub fn last_trigger(&self) -> Option<Duration> {
        self.last_trigger
    }

    pub fn phase(&self) -> Phase {
        match self.episode.started_at {
            Some(since) if !self.episode.emotion.is_neutral() => {
                if self.episode.triggered {
                    Phase::Triggered { emotion: self.episode.emotion, since }
                } else {
                    Phase::Holding { emotion: self.episode.emotion, since }
                }
            }
            _ => Phase::Idle,
        }
    }

    pub fn status(&self, now: Duration) -> HoldStatus {
        let held = self.episode.started_at.map(|start| now.saturating_sub(start));
        let progress = match held {
            Some(held) if !self.episode.emotion.is_neutral() => {
                let hold = self.config.hold_duration.as_secs_f32();
                Some(if hold > 0.0 { (held.as_secs_f32() / hold).min(1.0) } else { 1.0 })
            }
            _ => None,
        };
        let cooldown_remaining = match self.last_trigger {
            Some(last) => self.config.cooldown_duration.saturating_sub(now.saturating_sub(last)),
            None => Duration::ZERO,
        };

        HoldStatus {
            emotion: self.episode.emotion,
            held,
            progress,
            cooldown_remaining,
        }
    }

    fn cooldown_elapsed(&self, now: Duration) -> bool {
        match self.last_trigger {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.config.cooldown_duration,
        }
    }
}
