use common::span;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use image::RgbImage;
use ndarray::{Array, ArrayD, IxDyn};

const LETTERBOX_COLOR: u8 = 114;
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Geometry of a letterbox transform, needed to map boxes back to the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

/// Square letterbox input used by YOLO graphs.
pub struct YoloPreProcessor {
    pub input_size: u32,
    letterboxed_buffer: Vec<u8>,
}

impl YoloPreProcessor {
    pub fn new(input_size: u32) -> Self {
        Self {
            input_size,
            letterboxed_buffer: vec![LETTERBOX_COLOR; (input_size * input_size * 3) as usize],
        }
    }

    pub fn preprocess(&mut self, image: &RgbImage) -> anyhow::Result<(ArrayD<f32>, Letterbox)> {
        let _s = span!("yolo_preprocess");

        let (width, height) = image.dimensions();
        let size = self.input_size;

        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let new_width = ((width as f32 * scale) as u32).clamp(1, size);
        let new_height = ((height as f32 * scale) as u32).clamp(1, size);

        let offset_x = (size - new_width) / 2;
        let offset_y = (size - new_height) / 2;

        let resized = resize_rgb(image, new_width, new_height)?;

        self.letterboxed_buffer.fill(LETTERBOX_COLOR);
        let stride = (size * 3) as usize;
        let row_len = (new_width * 3) as usize;

        for y in 0..new_height as usize {
            let src_row = y * row_len;
            let dst_row = (y + offset_y as usize) * stride + offset_x as usize * 3;

            self.letterboxed_buffer[dst_row..dst_row + row_len]
                .copy_from_slice(&resized[src_row..src_row + row_len]);
        }

        let input = to_chw(&self.letterboxed_buffer, size, size, |_, value| {
            value as f32 / 255.0
        })?;

        Ok((
            input,
            Letterbox {
                scale,
                offset_x: offset_x as f32,
                offset_y: offset_y as f32,
            },
        ))
    }
}

/// Aspect preserving resize with ImageNet normalization, as used by DETR-style
/// image processors.
pub struct TransformerPreProcessor {
    pub shortest_edge: u32,
    pub longest_edge: u32,
}

impl TransformerPreProcessor {
    pub fn new(shortest_edge: u32, longest_edge: u32) -> Self {
        Self {
            shortest_edge,
            longest_edge,
        }
    }

    /// Output `(width, height)`: shortest edge scaled to `shortest_edge` unless
    /// that pushes the longest edge past `longest_edge`.
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let min_orig = width.min(height) as f32;
        let max_orig = width.max(height) as f32;

        let mut size = self.shortest_edge as f32;
        if max_orig / min_orig * size > self.longest_edge as f32 {
            size = (self.longest_edge as f32 * min_orig / max_orig).round();
        }
        let size = size.max(1.0);

        if width < height {
            let out_height = (size * height as f32 / width as f32) as u32;
            (size as u32, out_height.max(1))
        } else {
            let out_width = (size * width as f32 / height as f32) as u32;
            (out_width.max(1), size as u32)
        }
    }

    pub fn preprocess(&self, image: &RgbImage) -> anyhow::Result<ArrayD<f32>> {
        let _s = span!("transformer_preprocess");

        let (width, height) = image.dimensions();
        let (new_width, new_height) = self.target_dimensions(width, height);
        let resized = resize_rgb(image, new_width, new_height)?;

        to_chw(&resized, new_width, new_height, |channel, value| {
            (value as f32 / 255.0 - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel]
        })
    }
}

fn resize_rgb(image: &RgbImage, width: u32, height: u32) -> anyhow::Result<Vec<u8>> {
    let _s = common::span_debug!("resize");

    if image.dimensions() == (width, height) {
        return Ok(image.as_raw().clone());
    }

    let src = Image::from_vec_u8(
        image.width(),
        image.height(),
        image.as_raw().clone(),
        PixelType::U8x3,
    )?;
    let mut resized = Image::new(width, height, PixelType::U8x3);

    Resizer::new().resize(
        &src,
        &mut resized,
        &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
    )?;

    Ok(resized.buffer().to_vec())
}

/// Interleaved RGB bytes -> `[1, 3, height, width]` tensor.
fn to_chw<F>(pixels: &[u8], width: u32, height: u32, normalize: F) -> anyhow::Result<ArrayD<f32>>
where
    F: Fn(usize, u8) -> f32,
{
    let spatial = (width * height) as usize;
    let mut output = vec![0.0f32; 3 * spatial];

    for (i, px) in pixels.chunks_exact(3).take(spatial).enumerate() {
        output[i] = normalize(0, px[0]);
        output[spatial + i] = normalize(1, px[1]);
        output[2 * spatial + i] = normalize(2, px[2]);
    }

    Ok(Array::from_shape_vec(
        IxDyn(&[1, 3, height as usize, width as usize]),
        output,
    )?)
}
