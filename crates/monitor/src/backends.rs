//! Concrete collaborators chosen from configuration

use alerting::{AlertError, CommandNotifier, LogNotifier, Notifier, Permission};
use camera_capture::{CameraError, FrameSource, ImageSequenceSource, SyntheticCamera, VideoFrame};
use emotion::{EmotionDetection, EmotionError, EmotionProvider, OnnxEmotionProvider};
use face_mesh::{FixedLandmarkProvider, LandmarkProvider, LandmarkSet, MeshError, ReplayLandmarkProvider};

/// Configured frame source
pub enum Source {
    Synthetic(SyntheticCamera),
    Images(ImageSequenceSource),
}

impl FrameSource for Source {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        match self {
            Source::Synthetic(camera) => camera.next_frame(),
            Source::Images(images) => images.next_frame(),
        }
    }

    fn is_active(&self) -> bool {
        match self {
            Source::Synthetic(camera) => camera.is_active(),
            Source::Images(images) => images.is_active(),
        }
    }
}

/// Configured landmark provider
pub enum Landmarks {
    Replay(ReplayLandmarkProvider),
    Fixed(FixedLandmarkProvider),
}

impl LandmarkProvider for Landmarks {
    fn process(&mut self, frame: &VideoFrame) -> Result<Option<LandmarkSet>, MeshError> {
        match self {
            Landmarks::Replay(replay) => replay.process(frame),
            Landmarks::Fixed(fixed) => fixed.process(frame),
        }
    }
}

/// Configured expression model
pub enum EmotionModel {
    Onnx(Box<OnnxEmotionProvider>),
    /// No model: every poll comes back empty
    Disabled,
}

impl EmotionProvider for EmotionModel {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<EmotionDetection>, EmotionError> {
        match self {
            EmotionModel::Onnx(model) => model.detect(frame),
            EmotionModel::Disabled => Ok(Vec::new()),
        }
    }
}

/// Configured notification backend
pub enum AnyNotifier {
    Log(LogNotifier),
    Desktop(CommandNotifier),
}

impl Notifier for AnyNotifier {
    fn request_permission(&mut self) -> Permission {
        match self {
            AnyNotifier::Log(n) => n.request_permission(),
            AnyNotifier::Desktop(n) => n.request_permission(),
        }
    }

    fn show(&mut self, title: &str, body: &str) -> Result<(), AlertError> {
        match self {
            AnyNotifier::Log(n) => n.show(title, body),
            AnyNotifier::Desktop(n) => n.show(title, body),
        }
    }
}
