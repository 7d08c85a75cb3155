//! Expression model seam

use crate::{EmotionError, Expressions};
use camera_capture::VideoFrame;
use std::collections::VecDeque;

/// One detected face with its expression scores
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionDetection {
    pub expressions: Expressions,
}

/// Expression model: zero or more detections per frame
pub trait EmotionProvider {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<EmotionDetection>, EmotionError>;
}

/// Plays back a queue of canned results, then reports no faces
#[derive(Debug, Clone, Default)]
pub struct ScriptedEmotionProvider {
    script: VecDeque<Result<Vec<EmotionDetection>, String>>,
    looping: bool,
}

impl ScriptedEmotionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay the script forever
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Queue one frame with a single detection
    pub fn push(mut self, expressions: Expressions) -> Self {
        self.script.push_back(Ok(vec![EmotionDetection { expressions }]));
        self
    }

    /// Queue one frame without any face
    pub fn push_empty(mut self) -> Self {
        self.script.push_back(Ok(Vec::new()));
        self
    }

    /// Queue one failing call
    pub fn push_error(mut self, reason: impl Into<String>) -> Self {
        self.script.push_back(Err(reason.into()));
        self
    }
}

impl EmotionProvider for ScriptedEmotionProvider {
    fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<EmotionDetection>, EmotionError> {
        let Some(next) = self.script.pop_front() else {
            return Ok(Vec::new());
        };
        if self.looping {
            self.script.push_back(next.clone());
        }
        next.map_err(EmotionError::InferenceFailed)
    }
}
