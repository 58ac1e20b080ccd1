use image::imageops::FilterType;
use ndarray::Array3;

pub const INPUT_CHANNELS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image could not be decoded: {0}")]
    Undecodable(#[from] image::ImageError),
    #[error("unsupported image geometry: {width}x{height}")]
    BadShape { width: u32, height: u32 },
}

/// A decoded leaf image, resized to the model resolution and normalized to
/// [0,1] in CHW layout. Immutable once built; owned by the request.
#[derive(Debug)]
pub struct LeafImage {
    pub pixels: Array3<f32>,
    pub source_width: u32,
    pub source_height: u32,
}

/// Decode raw bytes and normalize them for inference. Undecodable payloads
/// are rejected here, before any model work happens.
pub fn prepare(bytes: &[u8], input_size: u32) -> Result<LeafImage, ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let (source_width, source_height) = (decoded.width(), decoded.height());
    if source_width == 0 || source_height == 0 {
        return Err(ImageError::BadShape {
            width: source_width,
            height: source_height,
        });
    }

    let resized = decoded.resize_exact(input_size, input_size, FilterType::Lanczos3);
    let rgb = resized.to_rgb8();

    let size = input_size as usize;
    let mut pixels = Array3::zeros((INPUT_CHANNELS, size, size));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..INPUT_CHANNELS {
            pixels[[c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    Ok(LeafImage {
        pixels,
        source_width,
        source_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use std::io::Cursor;

    fn encode_png(img: RgbImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_prepare_resizes_and_normalizes() {
        let mut img = RgbImage::new(10, 6);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([255, 128, 0]);
        }
        let leaf = prepare(&encode_png(img), 32).unwrap();
        assert_eq!(leaf.pixels.dim(), (3, 32, 32));
        assert_eq!(leaf.source_width, 10);
        assert_eq!(leaf.source_height, 6);
        for &v in leaf.pixels.iter() {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_prepare_rejects_garbage() {
        let err = prepare(b"definitely not an image", 32).unwrap_err();
        assert!(matches!(err, ImageError::Undecodable(_)));
    }
}
