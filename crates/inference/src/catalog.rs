use crate::detection::{ModelDescriptor, ModelKind};

/// Input geometry a model expects; also decides the model kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputGeometry {
    /// Square letterbox of `size` pixels.
    Letterbox { size: u32 },
    /// Aspect preserving resize bounded by both edges.
    ShortestEdge { shortest: u32, longest: u32 },
}

/// A model the gateway knows how to serve and where its weights live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// ONNX file name, relative to the model directory
    pub file: &'static str,
    pub geometry: InputGeometry,
}

impl ModelSpec {
    pub fn kind(&self) -> ModelKind {
        match self.geometry {
            InputGeometry::Letterbox { .. } => ModelKind::Yolo,
            InputGeometry::ShortestEdge { .. } => ModelKind::Transformer,
        }
    }

    pub fn descriptor(&self) -> ModelDescriptor {
        ModelDescriptor {
            name: self.name.to_string(),
            kind: self.kind(),
            description: self.description.to_string(),
        }
    }
}

const YOLO_INPUT: InputGeometry = InputGeometry::Letterbox { size: 640 };

pub fn default_catalog() -> Vec<ModelSpec> {
    vec![
        ModelSpec {
            name: "YOLOv5s",
            description: "Small model, fast inference",
            file: "yolov5s.onnx",
            geometry: YOLO_INPUT,
        },
        ModelSpec {
            name: "YOLOv5m",
            description: "Medium model, balanced performance",
            file: "yolov5m.onnx",
            geometry: YOLO_INPUT,
        },
        ModelSpec {
            name: "YOLOv5l",
            description: "Large model, high accuracy",
            file: "yolov5l.onnx",
            geometry: YOLO_INPUT,
        },
        ModelSpec {
            name: "YOLOv5x",
            description: "Extra-large model, highest accuracy",
            file: "yolov5x.onnx",
            geometry: YOLO_INPUT,
        },
        ModelSpec {
            name: "DETR",
            description: "Facebook DETR model with ResNet-50 backbone",
            file: "detr-resnet-50.onnx",
            geometry: InputGeometry::ShortestEdge {
                shortest: 800,
                longest: 1333,
            },
        },
        ModelSpec {
            name: "YOLOS",
            description: "Vision Transformer based object detection",
            file: "yolos-small.onnx",
            geometry: InputGeometry::ShortestEdge {
                shortest: 512,
                longest: 1333,
            },
        },
    ]
}

/// Selects catalog entries by name, keeping catalog order. An empty selection
/// means every model. Unknown names are returned as the error.
pub fn select(catalog: Vec<ModelSpec>, names: &[String]) -> Result<Vec<ModelSpec>, Vec<String>> {
    if names.is_empty() {
        return Ok(catalog);
    }

    let unknown: Vec<String> = names
        .iter()
        .filter(|name| !catalog.iter().any(|spec| spec.name == name.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(unknown);
    }

    Ok(catalog
        .into_iter()
        .filter(|spec| names.iter().any(|name| name == spec.name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_and_kinds() {
        let catalog = default_catalog();
        let names: Vec<&str> = catalog.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec!["YOLOv5s", "YOLOv5m", "YOLOv5l", "YOLOv5x", "DETR", "YOLOS"]
        );
        assert!(catalog[..4].iter().all(|s| s.kind() == ModelKind::Yolo));
        assert!(catalog[4..].iter().all(|s| s.kind() == ModelKind::Transformer));
    }

    #[test]
    fn test_select_keeps_catalog_order() {
        let selected = select(
            default_catalog(),
            &["DETR".to_string(), "YOLOv5s".to_string()],
        )
        .unwrap();
        let names: Vec<&str> = selected.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["YOLOv5s", "DETR"]);
    }

    #[test]
    fn test_select_reports_unknown_names() {
        let err = select(default_catalog(), &["YOLOv8n".to_string()]).unwrap_err();
        assert_eq!(err, vec!["YOLOv8n".to_string()]);
    }

    #[test]
    fn test_empty_selection_means_everything() {
        assert_eq!(select(default_catalog(), &[]).unwrap().len(), 6);
    }
}
