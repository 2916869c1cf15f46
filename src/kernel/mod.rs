//! Pure decision core. No I/O, no awaits: the driver feeds it observations
//! and executes whatever events come back.

pub mod emotion;
pub mod event;
pub mod telemetry;
pub mod time;
pub mod trigger;

pub use emotion::Emotion;
pub use event::{Observation, TriggerEvent, TriggerOrigin};
pub use trigger::{TriggerConfig, TriggerController};
