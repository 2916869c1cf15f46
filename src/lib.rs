pub mod assets;
pub mod config;
pub mod control;
pub mod kernel;
pub mod outputs;
pub mod session;
pub mod vision;

// Re-export specific items for convenient access
pub use kernel::trigger::TriggerController;
pub use session::Session;
