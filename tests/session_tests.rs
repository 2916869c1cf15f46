mod common;

use common::stub_stage;
use memey::control::ControlCommand;
use memey::kernel::emotion::Emotion;
use memey::kernel::event::{Observation, TriggerOrigin};
use memey::kernel::trigger::{Phase, TriggerConfig, TriggerController};
use memey::outputs::stage::StageConfig;
use memey::session::{Flow, Session};
use std::time::Duration;

fn t(secs: f64) -> Duration {
    Duration::from_secs_f64(secs)
}

type StubSession = Session<common::StubPresenter, common::StubPlayer>;

fn session() -> (tempfile::TempDir, common::Log, StubSession) {
    let (dir, log, stage) = stub_stage(StageConfig::default());
    let controller = TriggerController::new(TriggerConfig::default());
    (dir, log, Session::new(controller, stage))
}

#[tokio::test(start_paused = true)]
async fn test_sustained_reading_reaches_the_stage() {
    let (_dir, log, mut session) = session();

    assert!(session.observe(Observation::new(Emotion::Sad, 0.8, t(0.0))).is_none());
    let event = session
        .observe(Observation::new(Emotion::Sad, 0.8, t(2.0)))
        .expect("fires after hold");
    assert_eq!(event.origin, TriggerOrigin::Sustained);
    assert_eq!(log.entries(), vec!["show sad.png", "play sad.mp3 @100"]);
}

#[tokio::test(start_paused = true)]
async fn test_manual_trigger_uses_raw_label() {
    let (_dir, log, mut session) = session();

    // Below threshold: the controller sees neutral, the operator still sees sad
    session.observe(Observation::new(Emotion::Sad, 0.1, t(0.0)));
    assert_eq!(session.controller().current_emotion(), Emotion::Neutral);

    assert_eq!(session.handle(ControlCommand::ManualTrigger, t(0.1)), Flow::Continue);
    assert_eq!(log.entries()[0], "show sad.png");
    assert_eq!(session.stats().triggers(TriggerOrigin::Manual), 1);
    assert_eq!(session.controller().last_trigger(), None, "manual ignores cooldown state");
}

#[tokio::test(start_paused = true)]
async fn test_manual_trigger_on_neutral_shows_default() {
    let (_dir, log, mut session) = session();
    session.handle(ControlCommand::ManualTrigger, t(0.0));
    assert_eq!(log.entries()[0], "show happy.png");
}

#[tokio::test(start_paused = true)]
async fn test_reset_and_quit_commands() {
    let (_dir, _log, mut session) = session();

    session.observe(Observation::new(Emotion::Happy, 0.9, t(0.0)));
    assert!(matches!(session.controller().phase(), Phase::Holding { .. }));

    assert_eq!(session.handle(ControlCommand::ResetTimer, t(1.0)), Flow::Continue);
    assert_eq!(session.controller().phase(), Phase::Idle);

    assert_eq!(session.handle(ControlCommand::Quit, t(1.5)), Flow::Quit);
}

#[tokio::test(start_paused = true)]
async fn test_sound_and_volume_commands() {
    let (_dir, _log, mut session) = session();

    session.handle(ControlCommand::ToggleSound, t(0.0));
    assert!(!session.stage().sound_enabled());

    session.handle(ControlCommand::VolumeDown, t(0.0));
    session.handle(ControlCommand::VolumeDown, t(0.0));
    assert_eq!(session.stage().volume().percent(), 80);
}

#[tokio::test(start_paused = true)]
async fn test_summary_counts() {
    let (_dir, _log, mut session) = session();

    let readings = [
        (Emotion::Happy, 0.9, 0.0),
        (Emotion::Happy, 0.9, 2.0),
        (Emotion::Happy, 0.2, 2.5),
        (Emotion::Sad, 0.9, 3.0),
        (Emotion::Sad, 0.9, 7.5),
    ];
    for (emotion, confidence, at) in readings {
        session.observe(Observation::new(emotion, confidence, t(at)));
    }
    session.handle(ControlCommand::ManualTrigger, t(8.0));

    let summary = session.shutdown(t(8.0));
    assert_eq!(summary.observations, 5);
    assert_eq!(summary.low_confidence, 1);
    // happy, neutral, sad
    assert_eq!(summary.episodes, 3);
    assert_eq!(summary.sustained_triggers, 2);
    assert_eq!(summary.manual_triggers, 1);
    assert_eq!(summary.triggers_by_emotion.get(&Emotion::Sad), Some(&2));
    assert_eq!(summary.presentation_failures, 0);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["triggers_by_emotion"]["happy"], 1);
}

#[test]
fn test_control_parsing() {
    assert_eq!(ControlCommand::parse(" Q "), Some(ControlCommand::Quit));
    assert_eq!(ControlCommand::parse("esc"), Some(ControlCommand::Quit));
    assert_eq!(ControlCommand::parse("r"), Some(ControlCommand::ResetTimer));
    assert_eq!(ControlCommand::parse("m"), Some(ControlCommand::ManualTrigger));
    assert_eq!(ControlCommand::parse("s"), Some(ControlCommand::ToggleSound));
    assert_eq!(ControlCommand::parse("="), Some(ControlCommand::VolumeUp));
    assert_eq!(ControlCommand::parse("_"), Some(ControlCommand::VolumeDown));
    assert_eq!(ControlCommand::parse("x"), None);
}
