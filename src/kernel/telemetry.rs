//! Session counters.
//!
//! Telemetry is a read-only side layer: nothing in the controller or the
//! stage reads it back. It never holds frame data, only labels and counts.

use super::emotion::Emotion;
use super::event::{TriggerEvent, TriggerOrigin};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageFailure {
    Presentation,
    Playback,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub duration_secs: f64,
    pub observations: u64,
    pub low_confidence: u64,
    pub episodes: u64,
    pub sustained_triggers: u64,
    pub manual_triggers: u64,
    pub triggers_by_emotion: BTreeMap<Emotion, u64>,
    pub presentation_failures: u64,
    pub playback_failures: u64,
}

#[derive(Debug)]
pub struct SessionStats {
    session_id: Uuid,
    observations: u64,
    low_confidence: u64,
    episodes: u64,
    triggers: BTreeMap<(Emotion, TriggerOrigin), u64>,
    presentation_failures: u64,
    playback_failures: u64,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            observations: 0,
            low_confidence: 0,
            episodes: 0,
            triggers: BTreeMap::new(),
            presentation_failures: 0,
            playback_failures: 0,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn record_observation(&mut self, below_threshold: bool, new_episode: bool) {
        self.observations += 1;
        if below_threshold {
            self.low_confidence += 1;
        }
        if new_episode {
            self.episodes += 1;
        }
    }

    pub fn record_trigger(&mut self, event: &TriggerEvent) {
        *self.triggers.entry((event.emotion, event.origin)).or_insert(0) += 1;
    }

    pub fn record_failure(&mut self, failure: StageFailure) {
        match failure {
            StageFailure::Presentation => self.presentation_failures += 1,
            StageFailure::Playback => self.playback_failures += 1,
        }
    }

    pub fn triggers(&self, origin: TriggerOrigin) -> u64 {
        self.triggers
            .iter()
            .filter(|((_, o), _)| *o == origin)
            .map(|(_, n)| n)
            .sum()
    }

    pub fn summary(&self, duration_secs: f64) -> SessionSummary {
        let mut triggers_by_emotion = BTreeMap::new();
        for ((emotion, _), n) in &self.triggers {
            *triggers_by_emotion.entry(*emotion).or_insert(0) += n;
        }

        SessionSummary {
            session_id: self.session_id,
            duration_secs,
            observations: self.observations,
            low_confidence: self.low_confidence,
            episodes: self.episodes,
            sustained_triggers: self.triggers(TriggerOrigin::Sustained),
            manual_triggers: self.triggers(TriggerOrigin::Manual),
            triggers_by_emotion,
            presentation_failures: self.presentation_failures,
            playback_failures: self.playback_failures,
        }
    }
}
