//! Flattens backend-native results into [`Detection`]s.
//!
//! Every detection leaving this module has a box inside the image with
//! `x1 < x2` and `y1 < y2`, a confidence in `[0, 1]`, and a class id that
//! names a real entry of the COCO table. Coordinates are rounded to
//! [`BOX_DECIMALS`] and confidences to [`CONFIDENCE_DECIMALS`] decimals.

use crate::classes;
use crate::detection::Detection;
use crate::error::DetectError;
use crate::processing::post::{TransformerResults, YoloBox};

pub const BOX_DECIMALS: i32 = 2;
pub const CONFIDENCE_DECIMALS: i32 = 4;

pub fn from_yolo(
    boxes: Vec<YoloBox>,
    width: u32,
    height: u32,
) -> Result<Vec<Detection>, DetectError> {
    let mut detections = Vec::with_capacity(boxes.len());
    for b in boxes {
        let class_id = classes::yolo_to_coco(b.class_index).ok_or_else(|| {
            DetectError::InferenceFailed(format!(
                "YOLO class index {} is outside the 80-class map",
                b.class_index
            ))
        })?;
        if let Some(detection) =
            finish([b.x1, b.y1, b.x2, b.y2], b.confidence, class_id, width, height)?
        {
            detections.push(detection);
        }
    }
    Ok(detections)
}

pub fn from_transformer(
    results: TransformerResults,
    width: u32,
    height: u32,
) -> Result<Vec<Detection>, DetectError> {
    let TransformerResults {
        scores,
        labels,
        boxes,
    } = results;
    if scores.len() != labels.len() || labels.len() != boxes.len() {
        return Err(DetectError::InferenceFailed(format!(
            "post-processing returned {} scores, {} labels and {} boxes",
            scores.len(),
            labels.len(),
            boxes.len()
        )));
    }

    let mut detections = Vec::with_capacity(scores.len());
    for ((score, label), bbox) in scores.into_iter().zip(labels).zip(boxes) {
        let class_id = u32::try_from(label).map_err(|_| {
            DetectError::InferenceFailed(format!("class label {label} does not fit the table"))
        })?;
        if let Some(detection) = finish(bbox, score, class_id, width, height)? {
            detections.push(detection);
        }
    }
    Ok(detections)
}

fn finish(
    bbox: [f32; 4],
    confidence: f32,
    class_id: u32,
    width: u32,
    height: u32,
) -> Result<Option<Detection>, DetectError> {
    let class_name = classes::class_name(class_id).ok_or_else(|| {
        DetectError::InferenceFailed(format!(
            "class id {class_id} is outside the {}-entry class table",
            classes::COCO_CLASSES.len()
        ))
    })?;
    if class_name == classes::PLACEHOLDER {
        tracing::warn!(class_id, "Dropping detection with a reserved class id");
        return Ok(None);
    }
    if !confidence.is_finite() || bbox.iter().any(|v| !v.is_finite()) {
        return Err(DetectError::InferenceFailed(
            "backend produced a non-finite box or score".to_string(),
        ));
    }

    let (w, h) = (width as f32, height as f32);
    let bbox = [
        round_to(bbox[0].clamp(0.0, w), BOX_DECIMALS),
        round_to(bbox[1].clamp(0.0, h), BOX_DECIMALS),
        round_to(bbox[2].clamp(0.0, w), BOX_DECIMALS),
        round_to(bbox[3].clamp(0.0, h), BOX_DECIMALS),
    ];

    if bbox[0] >= bbox[2] || bbox[1] >= bbox[3] {
        tracing::debug!(?bbox, class_id, "Dropping degenerate box");
        return Ok(None);
    }

    Ok(Some(Detection {
        bbox,
        confidence: round_to(confidence.clamp(0.0, 1.0), CONFIDENCE_DECIMALS),
        class_id,
        class_name,
    }))
}

#[inline]
fn round_to(value: f32, decimals: i32) -> f32 {
    let factor = 10f32.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yolo_box(bbox: [f32; 4], confidence: f32, class_index: usize) -> YoloBox {
        YoloBox {
            x1: bbox[0],
            y1: bbox[1],
            x2: bbox[2],
            y2: bbox[3],
            confidence,
            class_index,
        }
    }

    #[test]
    fn test_yolo_classes_map_into_coco_table() {
        let detections = from_yolo(
            vec![
                yolo_box([10.0, 10.0, 50.0, 50.0], 0.9, 0),
                yolo_box([60.0, 10.0, 90.0, 50.0], 0.8, 16),
            ],
            100,
            100,
        )
        .unwrap();

        assert_eq!(detections[0].class_id, 1);
        assert_eq!(detections[0].class_name, "person");
        assert_eq!(detections[1].class_id, 18);
        assert_eq!(detections[1].class_name, "dog");
    }

    #[test]
    fn test_yolo_class_outside_map_fails() {
        let err = from_yolo(vec![yolo_box([0.0, 0.0, 5.0, 5.0], 0.9, 80)], 10, 10).unwrap_err();
        assert!(matches!(err, DetectError::InferenceFailed(_)));
    }

    #[test]
    fn test_rounding_is_applied_consistently() {
        let detections = from_yolo(
            vec![yolo_box([10.123_4, 20.987_6, 30.005_1, 40.0], 0.876_543, 2)],
            100,
            100,
        )
        .unwrap();

        assert_eq!(detections[0].bbox, [10.12, 20.99, 30.01, 40.0]);
        assert_eq!(detections[0].confidence, 0.8765);
    }

    #[test]
    fn test_transformer_boxes_are_clamped_and_degenerate_ones_dropped() {
        let results = TransformerResults {
            scores: vec![0.95, 0.9],
            labels: vec![18, 3],
            boxes: vec![[-4.0, 2.0, 120.0, 70.0], [150.0, 10.0, 180.0, 20.0]],
        };

        let detections = from_transformer(results, 100, 60).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bbox, [0.0, 2.0, 100.0, 60.0]);
        assert_eq!(detections[0].class_name, "dog");
    }

    #[test]
    fn test_placeholder_ids_are_dropped() {
        let results = TransformerResults {
            scores: vec![0.9, 0.9],
            labels: vec![12, 1],
            boxes: vec![[0.0, 0.0, 10.0, 10.0], [0.0, 0.0, 10.0, 10.0]],
        };

        let detections = from_transformer(results, 20, 20).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_name, "person");
    }

    #[test]
    fn test_out_of_table_label_fails() {
        let results = TransformerResults {
            scores: vec![0.9],
            labels: vec![91],
            boxes: vec![[0.0, 0.0, 10.0, 10.0]],
        };
        assert!(from_transformer(results, 20, 20).is_err());
    }

    #[test]
    fn test_mismatched_lengths_fail() {
        let results = TransformerResults {
            scores: vec![0.9],
            labels: vec![],
            boxes: vec![],
        };
        assert!(from_transformer(results, 20, 20).is_err());
    }
}
