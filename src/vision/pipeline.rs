use tokio::sync::watch;
use tracing::{error, info};

use super::classifier::{Classifier, Prediction, RateLimitedClassifier};
use super::frame::FrameSource;

/// Capture -> mirror -> classify, publishing only the latest reading.
///
/// Meant for a dedicated OS thread: frame reads and model calls block.
/// The polling loop never waits on this; it samples the `watch` channel.
pub struct VisionPipeline<S, C> {
    source: S,
    classifier: RateLimitedClassifier<C>,
    mirror: bool,
    tx: watch::Sender<Prediction>,
}

impl<S: FrameSource, C: Classifier> VisionPipeline<S, C> {
    pub fn new(
        source: S,
        classifier: RateLimitedClassifier<C>,
        mirror: bool,
    ) -> (Self, watch::Receiver<Prediction>) {
        let (tx, rx) = watch::channel(Prediction::no_signal());
        (Self { source, classifier, mirror, tx }, rx)
    }

    /// Runs until the source ends or every receiver is gone. Returning drops
    /// the sender, which is how the loop learns the camera went away.
    pub fn run(mut self) {
        info!("vision pipeline started");
        loop {
            let frame = match self.source.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    error!("frame capture failed, stopping vision: {}", e);
                    break;
                }
            };
            let frame = if self.mirror { frame.mirrored() } else { frame };
            let captured_at = frame.captured_at;

            let prediction = self.classifier.classify_at(&frame, captured_at);
            if self.tx.send(prediction).is_err() {
                info!("no listeners left, stopping vision");
                break;
            }
        }
    }
}
