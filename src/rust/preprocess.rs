use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

/// Side length, in pixels, the crop classifier was trained on.
pub const TARGET_SIZE: u32 = 224;

/// Number of colour channels fed to the classifier (RGB, channel-last).
pub const CHANNELS: usize = 3;

/// Divisor mapping `u8` channel values into `[0, 1]`.
const PIXEL_SCALE: f32 = 255.0;

/// Matches the training loader, which resizes with nearest-neighbour sampling.
const RESIZE_FILTER: FilterType = FilterType::Nearest;

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("Image payload is empty")]
    Empty,
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Turns raw upload bytes into the `[1, 224, 224, 3]` tensor the classifier expects.
///
/// Steps, in order:
/// 1. Decode the bytes (PNG, JPEG, BMP, GIF, WebP)
/// 2. Stretch to 224x224 without preserving aspect ratio
/// 3. Convert to RGB, channel-last
/// 4. Scale every channel value by 1/255
/// 5. Prepend a batch dimension of 1
///
/// The resolution and scaling are shared with the training side; changing
/// them silently degrades accuracy.
pub fn preprocess_image(bytes: &[u8]) -> Result<Array4<f32>, PreprocessError> {
    let image = decode_image(bytes)?;
    Ok(image_to_tensor(&image))
}

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, PreprocessError> {
    if bytes.is_empty() {
        return Err(PreprocessError::Empty);
    }
    Ok(image::load_from_memory(bytes)?)
}

pub fn image_to_tensor(image: &DynamicImage) -> Array4<f32> {
    let side = TARGET_SIZE as usize;
    let rgb = image
        .resize_exact(TARGET_SIZE, TARGET_SIZE, RESIZE_FILTER)
        .to_rgb8();

    Array4::from_shape_fn((1, side, side, CHANNELS), |(_, y, x, c)| {
        rgb.get_pixel(x as u32, y as u32)[c] as f32 / PIXEL_SCALE
    })
}
