//! Emotion Classification
//!
//! Polls an expression model on its own timer and keeps the current emotion
//! label and its display severity.

mod classifier;
mod expressions;
mod onnx;
mod provider;

pub use classifier::{EmotionClassifier, EmotionReading, POLL_INTERVAL};
pub use expressions::{format_label, EmotionSeverity, Expressions};
pub use onnx::OnnxEmotionProvider;
pub use provider::{EmotionDetection, EmotionProvider, ScriptedEmotionProvider};

use thiserror::Error;

/// Errors during emotion classification
#[derive(Debug, Error)]
pub enum EmotionError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid output shape: expected {expected} scores, got {actual}")]
    InvalidOutput { expected: usize, actual: usize },
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),
}
