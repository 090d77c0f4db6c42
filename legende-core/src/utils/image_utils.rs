use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use image::DynamicImage;
use std::io::Cursor;

/// BLIP's vision tower input resolution.
pub const BLIP_IMAGE_SIZE: u32 = 384;

// CLIP normalization statistics, as used by the BLIP processor.
const IMAGE_MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
const IMAGE_STD: [f32; 3] = [0.26862954, 0.261_302_6, 0.275_777_1];

/// Decode raw uploaded bytes into a 3-channel RGB image.
///
/// The format is sniffed from the bytes; anything `image` cannot decode is
/// an error.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let img = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("Failed to sniff image format")?
        .decode()
        .context("Image decoding failed")?;
    Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
}

/// Convert an image into BLIP's expected input tensor.
///
/// Resize-to-fill to 384×384, channel-first, scaled to `[0, 1]` and
/// normalized with the CLIP mean/std. Shape `[3, 384, 384]`, f32.
pub fn to_blip_tensor(img: &DynamicImage, device: &Device) -> Result<Tensor> {
    let size = BLIP_IMAGE_SIZE;
    let img = img
        .resize_to_fill(size, size, image::imageops::FilterType::Triangle)
        .to_rgb8();
    let data = img.into_raw();

    let data = Tensor::from_vec(data, (size as usize, size as usize, 3), device)?
        .permute((2, 0, 1))?;
    let mean = Tensor::new(&IMAGE_MEAN, device)?.reshape((3, 1, 1))?;
    let std = Tensor::new(&IMAGE_STD, device)?.reshape((3, 1, 1))?;

    let tensor = (data.to_dtype(DType::F32)? / 255.)?
        .broadcast_sub(&mean)?
        .broadcast_div(&std)?;
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(width, height);
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decode_valid_png() {
        let img = decode_image(&png_bytes(4, 2)).unwrap();
        assert_eq!(img.color(), image::ColorType::Rgb8);
        assert_eq!((img.width(), img.height()), (4, 2));
    }

    #[test]
    fn decode_coerces_to_rgb() {
        // Grayscale-with-alpha source still comes out 3-channel.
        let src = DynamicImage::new_luma_a8(3, 3);
        let mut buf = Vec::new();
        src.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        let img = decode_image(&buf).unwrap();
        assert_eq!(img.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn decode_rejects_non_image_bytes() {
        assert!(decode_image(b"definitely not an image").is_err());
        assert!(decode_image(&[]).is_err());
    }

    #[test]
    fn blip_tensor_shape_and_dtype() {
        let img = DynamicImage::new_rgb8(64, 48);
        let tensor = to_blip_tensor(&img, &Device::Cpu).unwrap();
        assert_eq!(tensor.dims(), &[3, 384, 384]);
        assert_eq!(tensor.dtype(), DType::F32);
    }

    #[test]
    fn blip_tensor_is_normalized() {
        // An all-black image maps every channel to -mean/std.
        let img = DynamicImage::new_rgb8(8, 8);
        let tensor = to_blip_tensor(&img, &Device::Cpu).unwrap();
        let v: Vec<f32> = tensor.flatten_all().unwrap().to_vec1().unwrap();
        let expected = -IMAGE_MEAN[0] / IMAGE_STD[0];
        assert!((v[0] - expected).abs() < 1e-5);
    }
}
