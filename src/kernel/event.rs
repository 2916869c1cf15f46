use super::emotion::Emotion;
use serde::Serialize;
use std::time::Duration;

/// One classifier reading as the kernel sees it. Ephemeral, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub emotion: Emotion,
    pub confidence: f32,
    pub at: Duration,
}

impl Observation {
    pub fn new(emotion: Emotion, confidence: f32, at: Duration) -> Self {
        Self { emotion, confidence, at }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerOrigin {
    /// Hold + cooldown satisfied by the observation stream.
    Sustained,
    /// Operator override, bypasses every gate.
    Manual,
}

/// "Display and play assets for emotion E." Consumed by the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub emotion: Emotion,
    pub at: Duration,
    pub origin: TriggerOrigin,
}

impl TriggerEvent {
    pub fn sustained(emotion: Emotion, at: Duration) -> Self {
        Self { emotion, at, origin: TriggerOrigin::Sustained }
    }

    pub fn manual(emotion: Emotion, at: Duration) -> Self {
        Self { emotion, at, origin: TriggerOrigin::Manual }
    }
}
