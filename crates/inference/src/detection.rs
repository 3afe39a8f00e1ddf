use serde::Serialize;

/// Family of inference backend. Models of the same kind share pre-processing,
/// post-processing and normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModelKind {
    #[serde(rename = "yolo")]
    Yolo,
    #[serde(rename = "huggingface")]
    Transformer,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Yolo => "yolo",
            ModelKind::Transformer => "huggingface",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ModelKind,
    pub description: String,
}

/// One predicted object in absolute pixel coordinates of the original image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: [f32; 4],
    pub confidence: f32,
    pub class_id: u32,
    pub class_name: &'static str,
}

/// Normalized detections plus the size of the image they refer to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionOutcome {
    pub detections: Vec<Detection>,
    pub original_width: u32,
    pub original_height: u32,
}
