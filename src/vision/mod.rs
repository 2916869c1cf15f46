//! Frame acquisition and emotion classification, off the polling loop.

pub mod classifier;
pub mod frame;
pub mod pipeline;

pub use classifier::{
    Classifier, ClassifyError, CommandClassifier, Prediction, RateLimitedClassifier,
};
pub use frame::{CaptureError, DirectorySource, FfmpegCamera, Frame, FrameSource};
pub use pipeline::VisionPipeline;
