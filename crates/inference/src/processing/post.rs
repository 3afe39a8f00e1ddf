use super::pre::Letterbox;
use anyhow::{Context, bail};
use ndarray::{ArrayViewD, Axis, Ix3};
use std::cmp::Ordering;

/// A YOLO box after NMS, in original image pixels. `class_index` is the
/// contiguous class index predicted by the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct YoloBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_index: usize,
}

/// Tensor layouts produced by YOLO exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum YoloLayout {
    /// `[1, anchors, 5 + classes]`: box, objectness, class scores (YOLOv5 export).
    AnchorBased,
    /// `[1, 4 + classes, anchors]`: box then class scores (anchor-free head).
    AnchorFree,
}

pub struct YoloPostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl YoloPostProcessor {
    pub fn new(confidence_threshold: f32, iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
            max_detections,
        }
    }

    #[tracing::instrument(skip_all, fields(shape = ?output.shape()))]
    pub fn parse_detections(
        &self,
        output: &ArrayViewD<f32>,
        letterbox: &Letterbox,
        orig_width: u32,
        orig_height: u32,
    ) -> anyhow::Result<Vec<YoloBox>> {
        let output = output
            .view()
            .into_dimensionality::<Ix3>()
            .context("YOLO output must be a rank 3 tensor")?;
        if output.shape()[0] != 1 {
            bail!("expected a batch of one, got {}", output.shape()[0]);
        }
        let output = output.index_axis(Axis(0), 0);

        let layout = if output.shape()[1] > output.shape()[0] {
            YoloLayout::AnchorFree
        } else {
            YoloLayout::AnchorBased
        };
        // Rows are anchors, columns are attributes.
        let rows = match layout {
            YoloLayout::AnchorBased => output,
            YoloLayout::AnchorFree => output.reversed_axes(),
        };
        let class_start = match layout {
            YoloLayout::AnchorBased => 5,
            YoloLayout::AnchorFree => 4,
        };
        if rows.shape()[1] <= class_start {
            bail!(
                "YOLO output has {} attributes per anchor, expected more than {}",
                rows.shape()[1],
                class_start
            );
        }

        let mut candidates = Vec::new();

        for row in rows.outer_iter() {
            let (class_index, class_score) = row
                .iter()
                .skip(class_start)
                .copied()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .context("anchor without class scores")?;

            let confidence = match layout {
                YoloLayout::AnchorBased => row[4] * class_score,
                YoloLayout::AnchorFree => class_score,
            };

            if confidence < self.confidence_threshold {
                continue;
            }

            let (x1, y1, x2, y2) = cxcywh_to_xyxy(row[0], row[1], row[2], row[3]);

            // Apply inverse letterbox transform to original image coordinates
            let unletterbox = |value: f32, offset: f32, limit: u32| {
                ((value - offset) / letterbox.scale).clamp(0.0, limit as f32)
            };

            candidates.push(YoloBox {
                x1: unletterbox(x1, letterbox.offset_x, orig_width),
                y1: unletterbox(y1, letterbox.offset_y, orig_height),
                x2: unletterbox(x2, letterbox.offset_x, orig_width),
                y2: unletterbox(y2, letterbox.offset_y, orig_height),
                confidence: confidence.clamp(0.0, 1.0),
                class_index,
            });
        }

        tracing::trace!(candidates = candidates.len(), "YOLO candidates above threshold");

        Ok(non_max_suppression(
            candidates,
            self.iou_threshold,
            self.max_detections,
        ))
    }
}

/// Class-aware greedy NMS. Output is sorted by descending confidence.
pub fn non_max_suppression(
    mut boxes: Vec<YoloBox>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<YoloBox> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<YoloBox> = Vec::new();
    for candidate in boxes {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_index == candidate.class_index && iou(k, &candidate) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &YoloBox, b: &YoloBox) -> f32 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = inter_w * inter_h;
    if inter <= 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter + f32::EPSILON)
}

/// Raw outputs of a DETR-style detection head.
pub struct TransformerRawOutput<'a> {
    /// `[1, queries, classes + 1]`, the last class is "no object"
    pub logits: ArrayViewD<'a, f32>,
    /// `[1, queries, 4]` normalized cxcywh
    pub pred_boxes: ArrayViewD<'a, f32>,
}

/// Kept queries in absolute pixels of the target size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformerResults {
    pub scores: Vec<f32>,
    pub labels: Vec<usize>,
    pub boxes: Vec<[f32; 4]>,
}

/// Turns raw DETR-style outputs into scored boxes.
///
/// `target_size` is `(height, width)` of the image the boxes should be scaled to.
/// Queries scoring below `threshold` are dropped.
#[tracing::instrument(skip(raw))]
pub fn post_process(
    raw: &TransformerRawOutput<'_>,
    target_size: (u32, u32),
    threshold: f32,
) -> anyhow::Result<TransformerResults> {
    let logits = raw
        .logits
        .view()
        .into_dimensionality::<Ix3>()
        .context("logits must be a rank 3 tensor")?;
    let boxes = raw
        .pred_boxes
        .view()
        .into_dimensionality::<Ix3>()
        .context("pred_boxes must be a rank 3 tensor")?;

    if logits.shape()[0] != 1 || boxes.shape()[0] != 1 {
        bail!("expected a batch of one");
    }
    if logits.shape()[1] != boxes.shape()[1] {
        bail!(
            "logits have {} queries but pred_boxes have {}",
            logits.shape()[1],
            boxes.shape()[1]
        );
    }
    if boxes.shape()[2] != 4 {
        bail!("pred_boxes must have 4 coordinates, got {}", boxes.shape()[2]);
    }
    if logits.shape()[2] < 2 {
        bail!("logits need at least one class plus the no-object class");
    }

    let (img_height, img_width) = (target_size.0 as f32, target_size.1 as f32);
    let mut results = TransformerResults::default();

    for (query_logits, query_box) in logits
        .index_axis(Axis(0), 0)
        .outer_iter()
        .zip(boxes.index_axis(Axis(0), 0).outer_iter())
    {
        let max_logit = query_logits
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let denominator: f32 = query_logits.iter().map(|l| (l - max_logit).exp()).sum();

        let num_classes = query_logits.len() - 1;
        let (label, best_logit) = query_logits
            .iter()
            .copied()
            .take(num_classes)
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .context("query without class logits")?;
        let score = (best_logit - max_logit).exp() / denominator;

        if score < threshold {
            continue;
        }

        let (x1, y1, x2, y2) =
            cxcywh_to_xyxy(query_box[0], query_box[1], query_box[2], query_box[3]);

        results.scores.push(score);
        results.labels.push(label);
        results.boxes.push([
            x1 * img_width,
            y1 * img_height,
            x2 * img_width,
            y2 * img_height,
        ]);
    }

    Ok(results)
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}
