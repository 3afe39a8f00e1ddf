use image::RgbImage;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid imageUrl: {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch image: {0}")]
    Upstream(String),

    #[error("Image exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("Failed to decode image: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Upstream("timed out".to_string())
        } else {
            FetchError::Upstream(err.without_url().to_string())
        }
    }
}

/// Downloads images over HTTP(S) with a timeout and a size cap.
#[derive(Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl ImageFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("detection-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, max_bytes })
    }

    #[tracing::instrument(skip(self), fields(bytes = tracing::field::Empty))]
    pub async fn fetch(&self, image_url: &str) -> Result<Vec<u8>, FetchError> {
        let url = parse_url(image_url)?;

        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Upstream(format!("upstream responded with {status}")));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes as u64 {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        tracing::Span::current().record("bytes", body.len());
        Ok(body)
    }
}

fn parse_url(image_url: &str) -> Result<Url, FetchError> {
    let url = Url::parse(image_url.trim()).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::InvalidUrl(format!(
            "unsupported scheme `{other}`"
        ))),
    }
}

/// Decodes any supported image format into an 8-bit RGB bitmap.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, FetchError> {
    let image = image::load_from_memory(bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(FetchError::Decode("image has no pixels".to_string()));
    }
    Ok(image.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    #[test]
    fn test_parse_url_accepts_http_and_https() {
        assert!(parse_url("http://example.com/a.jpg").is_ok());
        assert!(parse_url(" https://example.com/a.jpg ").is_ok());
    }

    #[test]
    fn test_parse_url_rejects_other_schemes() {
        assert!(matches!(
            parse_url("file:///etc/passwd"),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(parse_url("not a url"), Err(FetchError::InvalidUrl(_))));
    }

    #[test]
    fn test_decode_converts_to_rgb() {
        let rgba = RgbaImage::from_pixel(7, 5, Rgba([10, 20, 30, 128]));
        let mut png = Cursor::new(Vec::new());
        rgba.write_to(&mut png, ImageFormat::Png).unwrap();

        let image = decode(png.get_ref()).unwrap();
        assert_eq!(image.dimensions(), (7, 5));
        assert_eq!(image.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode(b"<html>not an image</html>"),
            Err(FetchError::Decode(_))
        ));
    }
}
