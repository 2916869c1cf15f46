use std::time::Duration;
use tracing::{debug, info};

use crate::control::{ControlCommand, VOLUME_STEP};
use crate::kernel::emotion::Emotion;
use crate::kernel::event::{Observation, TriggerEvent};
use crate::kernel::telemetry::{SessionStats, SessionSummary};
use crate::kernel::trigger::TriggerController;
use crate::outputs::{Player, Presenter, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// One polling-loop step: kernel decision, then effects, then bookkeeping.
/// The loop owns the session; nothing else touches the controller.
pub struct Session<P, A> {
    controller: TriggerController,
    stage: Stage<P, A>,
    stats: SessionStats,
    // Raw (un-thresholded) label of the latest reading, for manual triggers.
    last_seen: Emotion,
}

impl<P: Presenter, A: Player> Session<P, A> {
    pub fn new(controller: TriggerController, stage: Stage<P, A>) -> Self {
        Self {
            controller,
            stage,
            stats: SessionStats::new(),
            last_seen: Emotion::Neutral,
        }
    }

    pub fn observe(&mut self, observation: Observation) -> Option<TriggerEvent> {
        let threshold = self.controller.config().confidence_threshold;
        let below = !(observation.confidence >= threshold);
        let before = self.controller.current_emotion();

        let event = self
            .controller
            .observe(observation.emotion, observation.confidence, observation.at);

        self.stats
            .record_observation(below, self.controller.current_emotion() != before);
        self.last_seen = observation.emotion;

        if let Some(event) = event {
            info!("{} detected! Showing meme...", event.emotion.as_str().to_uppercase());
            self.fire(&event);
        }

        let status = self.controller.status(observation.at);
        debug!(
            emotion = %status.emotion,
            progress = ?status.progress,
            cooldown_ms = status.cooldown_remaining.as_millis() as u64,
            "status"
        );
        event
    }

    pub fn handle(&mut self, command: ControlCommand, now: Duration) -> Flow {
        match command {
            ControlCommand::Quit => return Flow::Quit,
            ControlCommand::ResetTimer => self.controller.reset_timer(),
            ControlCommand::ManualTrigger => {
                let event = self.controller.force_trigger(self.last_seen, now);
                self.fire(&event);
            }
            ControlCommand::ToggleSound => {
                self.stage.toggle_sound();
            }
            ControlCommand::VolumeUp => {
                self.stage.adjust_volume(VOLUME_STEP);
            }
            ControlCommand::VolumeDown => {
                self.stage.adjust_volume(-VOLUME_STEP);
            }
        }
        Flow::Continue
    }

    fn fire(&mut self, event: &TriggerEvent) {
        self.stats.record_trigger(event);
        let report = self.stage.perform(event);
        for failure in report.failures {
            self.stats.record_failure(failure);
        }
    }

    pub fn controller(&self) -> &TriggerController {
        &self.controller
    }

    pub fn stage(&self) -> &Stage<P, A> {
        &self.stage
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Tears down outputs and returns the session summary.
    pub fn shutdown(&mut self, elapsed: Duration) -> SessionSummary {
        self.stage.shutdown();
        self.stats.summary(elapsed.as_secs_f64())
    }
}
