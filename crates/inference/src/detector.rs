use crate::backend::InferenceBackend;
use crate::detection::{Detection, ModelKind};
use crate::error::DetectError;
use crate::normalize;
use crate::processing::{
    post::{TransformerRawOutput, YoloPostProcessor, post_process},
    pre::{TransformerPreProcessor, YoloPreProcessor},
};
use anyhow::Context;
use image::RgbImage;

pub const YOLO_INPUT: &str = "images";
pub const YOLO_OUTPUTS: [&str; 1] = ["output0"];
pub const TRANSFORMER_INPUT: &str = "pixel_values";
pub const TRANSFORMER_OUTPUTS: [&str; 2] = ["logits", "pred_boxes"];

pub const DEFAULT_YOLO_CONFIDENCE: f32 = 0.25;
pub const DEFAULT_YOLO_IOU: f32 = 0.7;
pub const DEFAULT_YOLO_MAX_DETECTIONS: usize = 300;
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.7;

/// A loaded model that turns a bitmap into normalized detections.
pub trait Detector: Send {
    fn kind(&self) -> ModelKind;

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, DetectError>;
}

pub struct YoloDetector<B: InferenceBackend> {
    backend: B,
    preprocessor: YoloPreProcessor,
    postprocessor: YoloPostProcessor,
}

impl<B: InferenceBackend> YoloDetector<B> {
    pub fn new(backend: B, input_size: u32) -> Self {
        Self {
            backend,
            preprocessor: YoloPreProcessor::new(input_size),
            postprocessor: YoloPostProcessor::new(
                DEFAULT_YOLO_CONFIDENCE,
                DEFAULT_YOLO_IOU,
                DEFAULT_YOLO_MAX_DETECTIONS,
            ),
        }
    }
}

impl<B: InferenceBackend> Detector for YoloDetector<B> {
    fn kind(&self) -> ModelKind {
        ModelKind::Yolo
    }

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, DetectError> {
        let (width, height) = image.dimensions();
        let (input, letterbox) = self.preprocessor.preprocess(image)?;

        let outputs = {
            let _infer_span = tracing::info_span!("model_inference").entered();
            self.backend.infer(input.view())?
        };
        let output = outputs.first().context("YOLO model returned no outputs")?;

        let boxes = self
            .postprocessor
            .parse_detections(&output.view(), &letterbox, width, height)?;

        normalize::from_yolo(boxes, width, height)
    }
}

pub struct TransformerDetector<B: InferenceBackend> {
    backend: B,
    preprocessor: TransformerPreProcessor,
    score_threshold: f32,
}

impl<B: InferenceBackend> TransformerDetector<B> {
    pub fn new(
        backend: B,
        shortest_edge: u32,
        longest_edge: u32,
        score_threshold: f32,
    ) -> Self {
        Self {
            backend,
            preprocessor: TransformerPreProcessor::new(shortest_edge, longest_edge),
            score_threshold,
        }
    }
}

impl<B: InferenceBackend> Detector for TransformerDetector<B> {
    fn kind(&self) -> ModelKind {
        ModelKind::Transformer
    }

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, DetectError> {
        let (width, height) = image.dimensions();
        let input = self.preprocessor.preprocess(image)?;

        let outputs = {
            let _infer_span = tracing::info_span!("model_inference").entered();
            self.backend.infer(input.view())?
        };
        let [logits, pred_boxes] = outputs.as_slice() else {
            return Err(DetectError::InferenceFailed(format!(
                "expected logits and pred_boxes, model returned {} outputs",
                outputs.len()
            )));
        };

        let raw = TransformerRawOutput {
            logits: logits.view(),
            pred_boxes: pred_boxes.view(),
        };
        // Target size is (height, width).
        let results = post_process(&raw, (height, width), self.score_threshold)?;

        normalize::from_transformer(results, width, height)
    }
}
