use image::{Rgb, RgbImage};
use memey::kernel::emotion::Emotion;
use memey::vision::{
    CaptureError, Classifier, ClassifyError, DirectorySource, Frame, FrameSource, Prediction,
    RateLimitedClassifier, VisionPipeline,
};
use std::collections::VecDeque;
use std::time::Duration;

/// Yields the queued frames, then reports the stream as ended.
struct QueuedFrames(VecDeque<Frame>);

impl FrameSource for QueuedFrames {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        self.0.pop_front().ok_or(CaptureError::EndOfStream)
    }
}

// 2x1 frame with a red pixel on the left.
fn red_left() -> Frame {
    let mut image = RgbImage::new(2, 1);
    image.put_pixel(0, 0, Rgb([255, 0, 0]));
    Frame::new(image)
}

/// Reads orientation off the frame: red on the right means it was mirrored.
struct Orientation {
    seen: usize,
}

impl Classifier for Orientation {
    fn classify(&mut self, frame: &Frame) -> Result<Prediction, ClassifyError> {
        self.seen += 1;
        let mirrored = frame.image.get_pixel(1, 0).0 == [255, 0, 0];
        let emotion = if mirrored { Emotion::Happy } else { Emotion::Sad };
        Ok(Prediction::new(emotion, 0.5 + self.seen as f32 * 0.1))
    }
}

fn run_pipeline(frames: usize, mirror: bool) -> tokio::sync::watch::Receiver<Prediction> {
    let source = QueuedFrames((0..frames).map(|_| red_left()).collect());
    let classifier = RateLimitedClassifier::new(Orientation { seen: 0 }, Duration::ZERO);
    let (pipeline, rx) = VisionPipeline::new(source, classifier, mirror);
    pipeline.run();
    rx
}

#[test]
fn test_pipeline_publishes_latest_mirrored_reading() {
    let rx = run_pipeline(3, true);

    let latest = rx.borrow().clone();
    assert_eq!(latest.emotion, Emotion::Happy, "classifier saw the mirrored frame");
    assert!((latest.confidence - 0.8).abs() < 1e-6, "third reading wins");
}

#[test]
fn test_pipeline_without_mirror_passes_frames_through() {
    let rx = run_pipeline(1, false);
    assert_eq!(rx.borrow().emotion, Emotion::Sad);
}

#[test]
fn test_pipeline_end_closes_channel() {
    let rx = run_pipeline(2, true);
    assert!(rx.has_changed().is_err(), "sender dropped once the source ended");
}

#[test]
fn test_pipeline_stops_when_receivers_are_gone() {
    let source = QueuedFrames((0..1000).map(|_| red_left()).collect());
    let classifier = RateLimitedClassifier::new(Orientation { seen: 0 }, Duration::ZERO);
    let (pipeline, rx) = VisionPipeline::new(source, classifier, true);
    drop(rx);

    // Returns after the first failed publish instead of draining all frames
    pipeline.run();
}

#[test]
fn test_directory_replay_is_ordered_and_skips_broken_frames() {
    let dir = tempfile::tempdir().expect("tempdir");
    RgbImage::new(2, 2).save(dir.path().join("a.png")).unwrap();
    std::fs::write(dir.path().join("b.png"), b"not an image").unwrap();
    RgbImage::new(3, 3).save(dir.path().join("c.png")).unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

    let mut source = DirectorySource::open(dir.path(), Duration::ZERO).unwrap();
    let sizes: Vec<(u32, u32)> = (0..4)
        .map(|_| source.next_frame().unwrap().image.dimensions())
        .collect();

    assert_eq!(sizes, vec![(2, 2), (3, 3), (2, 2), (3, 3)]);
}

#[test]
fn test_directory_of_broken_frames_ends_stream() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("a.jpg"), b"junk").unwrap();
    std::fs::write(dir.path().join("b.png"), b"junk").unwrap();

    let mut source = DirectorySource::open(dir.path(), Duration::ZERO).unwrap();
    assert!(matches!(source.next_frame(), Err(CaptureError::EndOfStream)));
}

#[test]
fn test_directory_without_images_is_unavailable() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("readme.md"), b"no frames").unwrap();

    assert!(matches!(
        DirectorySource::open(dir.path(), Duration::ZERO),
        Err(CaptureError::DeviceUnavailable(_))
    ));
}
