//! 图像解码

use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use sl_core::{Result, SignLoomError};

/// 解码后的 RGB 图像
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// 原始编码格式
    pub format: ImageFormat,
    /// RGB8 像素
    pub rgb: RgbImage,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    /// 重新编码为 PNG，用于转发给外部检测器
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.rgb
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| SignLoomError::InvalidImage(format!("png encode failed: {e}")))?;
        Ok(buf.into_inner())
    }
}

/// 按内容识别格式并解码为 RGB8
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage> {
    if bytes.is_empty() {
        return Err(SignLoomError::InvalidImage("empty payload".to_string()));
    }

    let format = image::guess_format(bytes)
        .map_err(|e| SignLoomError::InvalidImage(format!("unknown image format: {e}")))?;
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| SignLoomError::InvalidImage(e.to_string()))?;

    Ok(DecodedImage {
        format,
        rgb: image.to_rgb8(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let decoded = decode_image(&png_bytes(8, 6)).unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
        assert_eq!(decoded.rgb.get_pixel(0, 0).0, [200, 120, 40]);
    }

    #[test]
    fn test_reencode_roundtrips_pixels() {
        let decoded = decode_image(&png_bytes(3, 3)).unwrap();
        let again = decode_image(&decoded.to_png().unwrap()).unwrap();
        assert_eq!(again.rgb, decoded.rgb);
    }

    #[test]
    fn test_rejects_empty_and_garbage() {
        assert!(matches!(decode_image(&[]), Err(SignLoomError::InvalidImage(_))));
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(SignLoomError::InvalidImage(_))
        ));
    }
}
