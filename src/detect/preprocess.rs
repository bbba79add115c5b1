use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Convert an RGB24 frame into the model's square NCHW float input.
///
/// The frame is scaled (nearest neighbour, no aspect preservation) to
/// `input_size` x `input_size` and each channel is normalized to 0..1.
pub fn to_model_input(rgb: &[u8], width: u32, height: u32, input_size: u32) -> Result<Vec<f32>> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
    if rgb.len() != expected {
        return Err(anyhow!(
            "expected {} RGB bytes, received {}",
            expected,
            rgb.len()
        ));
    }
    if input_size == 0 {
        return Err(anyhow!("model input size must be > 0"));
    }

    let frame = RgbImage::from_raw(width, height, rgb.to_vec())
        .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", width, height))?;
    let square = if width == input_size && height == input_size {
        frame
    } else {
        imageops::resize(&frame, input_size, input_size, FilterType::Nearest)
    };

    let side = input_size as usize;
    let plane = side * side;
    let mut input = vec![0.0f32; plane * 3];
    for (x, y, px) in square.enumerate_pixels() {
        let idx = y as usize * side + x as usize;
        for channel in 0..3 {
            input[channel * plane + idx] = px[channel] as f32 / 255.0;
        }
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_layout_and_normalization() -> Result<()> {
        // 2x1 frame: red, blue
        let rgb = [255u8, 0, 0, 0, 0, 255];
        let input = to_model_input(&rgb, 2, 1, 2)?;
        assert_eq!(input.len(), 12);
        // R plane, first row
        assert_eq!(&input[0..2], &[1.0, 0.0]);
        // B plane, first row
        assert_eq!(&input[8..10], &[0.0, 1.0]);
        Ok(())
    }

    #[test]
    fn rejects_short_buffer() {
        assert!(to_model_input(&[0u8; 5], 2, 1, 4).is_err());
    }
}
