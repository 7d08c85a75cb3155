//! ONNX expression classifier (FER+ layout) using tract

use crate::{EmotionDetection, EmotionError, EmotionProvider, Expressions};
use camera_capture::VideoFrame;
use image::imageops::FilterType;
use image::GrayImage;
use std::path::Path;
use tracing::{debug, info};
use tract_onnx::prelude::*;

/// Side of the square grayscale input
pub const INPUT_SIZE: usize = 64;

/// Output classes in model order, named the way the UI expects
pub const LABELS: [&str; 8] = [
    "neutral",
    "happy",
    "surprised",
    "sad",
    "angry",
    "disgusted",
    "fearful",
    "contempt",
];

type EmotionPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// Expression classifier backed by an ONNX model
pub struct OnnxEmotionProvider {
    plan: EmotionPlan,
}

impl OnnxEmotionProvider {
    /// Load and optimize the model
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EmotionError> {
        let path = path.as_ref();
        info!("Loading emotion model from {}", path.display());

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(0, f32::fact([1, 1, INPUT_SIZE, INPUT_SIZE]).into())
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| EmotionError::ModelLoad(e.to_string()))?;

        Ok(Self { plan })
    }
}

/// Grayscale, resize to the model input and lay out as 1x1xHxW
fn preprocess(frame: &VideoFrame) -> Result<Tensor, EmotionError> {
    let gray = GrayImage::from_raw(frame.width, frame.height, frame.to_grayscale())
        .ok_or_else(|| EmotionError::ImageProcessing("Failed to create image buffer".into()))?;

    let resized = image::imageops::resize(
        &gray,
        INPUT_SIZE as u32,
        INPUT_SIZE as u32,
        FilterType::Triangle,
    );

    let input = tract_ndarray::Array4::from_shape_fn((1, 1, INPUT_SIZE, INPUT_SIZE), |(_, _, y, x)| {
        resized.get_pixel(x as u32, y as u32)[0] as f32
    });
    Ok(input.into())
}

/// Numerically stable softmax
pub(crate) fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 {
        exps.iter().map(|v| v / sum).collect()
    } else {
        vec![0.0; logits.len()]
    }
}

impl EmotionProvider for OnnxEmotionProvider {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<EmotionDetection>, EmotionError> {
        let input = preprocess(frame)?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| EmotionError::InferenceFailed(e.to_string()))?;

        let logits: Vec<f32> = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| EmotionError::InferenceFailed(e.to_string()))?
            .iter()
            .copied()
            .collect();

        if logits.len() != LABELS.len() {
            return Err(EmotionError::InvalidOutput {
                expected: LABELS.len(),
                actual: logits.len(),
            });
        }

        let scores = softmax(&logits);
        debug!("Expression scores: {:?}", scores);

        let expressions = Expressions::from_pairs(LABELS.iter().copied().zip(scores));
        Ok(vec![EmotionDetection { expressions }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let scores = softmax(&[1.0, 2.0, 3.0, 0.5, -1.0, 0.0, 0.0, 4.0]);
        let total: f32 = scores.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
        assert_eq!(
            scores.iter().cloned().fold(0.0f32, f32::max),
            scores[7]
        );
    }

    #[test]
    fn test_preprocess_shape() {
        let frame = VideoFrame::filled(640, 480, [255, 255, 255], 0, 0);
        let tensor = preprocess(&frame).unwrap();
        assert_eq!(tensor.shape(), &[1, 1, INPUT_SIZE, INPUT_SIZE]);
        let view = tensor.to_array_view::<f32>().unwrap();
        assert!(view.iter().all(|v| *v >= 254.0));
    }

    #[test]
    fn test_missing_model() {
        let result = OnnxEmotionProvider::load("/no/such/emotion-model.onnx");
        assert!(matches!(result, Err(EmotionError::ModelLoad(_))));
    }
}
