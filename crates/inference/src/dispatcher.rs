use crate::detection::{DetectionOutcome, ModelDescriptor};
use crate::error::DetectError;
use crate::registry::Registry;
use image::RgbImage;
use std::sync::Arc;
use std::time::Instant;

/// Routes a detection request to the named model.
///
/// Calls block for the duration of inference; async callers should run them
/// on a blocking thread.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn models(&self) -> Vec<ModelDescriptor> {
        self.registry.list()
    }

    #[tracing::instrument(
        skip(self, image),
        fields(
            width = image.width(),
            height = image.height(),
            detections = tracing::field::Empty
        )
    )]
    pub fn detect(&self, model_name: &str, image: &RgbImage) -> Result<DetectionOutcome, DetectError> {
        let model = self.registry.resolve(model_name)?;

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectError::InvalidImage(format!(
                "image has no pixels ({width}x{height})"
            )));
        }

        let start = Instant::now();
        let detections = model.detect(image)?;

        tracing::Span::current().record("detections", detections.len());
        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Detection finished"
        );

        Ok(DetectionOutcome {
            detections,
            original_width: width,
            original_height: height,
        })
    }
}
