use crate::utils::error::SignError;
use crate::Result;
use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::path::Path;

/// 单张图像的最大字节数
pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

/// 允许的最大边长
pub const MAX_DIMENSION: u32 = 8192;

pub struct ImageLoader;

impl ImageLoader {
    /// 从base64字符串加载图像
    pub fn from_base64(base64_data: &str) -> Result<DynamicImage> {
        // 移除可能的数据URL前缀 (data:image/xxx;base64,)
        let base64_clean = if base64_data.starts_with("data:") {
            base64_data.split(',').nth(1).unwrap_or(base64_data)
        } else {
            base64_data
        };

        let image_bytes = base64::engine::general_purpose::STANDARD
            .decode(base64_clean.trim())
            .map_err(SignError::Base64)?;

        Self::from_bytes(&image_bytes)
    }

    /// 从字节流加载图像
    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(SignError::FileTooLarge(bytes.len(), MAX_IMAGE_BYTES));
        }

        match Self::detect_format(bytes) {
            Some(format) if !Self::is_supported_format(format) => {
                return Err(SignError::UnsupportedFormat(format!("{:?}", format)));
            }
            _ => {}
        }

        let image = image::load_from_memory(bytes).map_err(SignError::ImageDecode)?;
        Self::validate_dimensions(&image)?;

        Ok(image)
    }

    /// 从文件路径加载图像
    pub fn from_path(path: impl AsRef<Path>) -> Result<DynamicImage> {
        let bytes = std::fs::read(path.as_ref())?;
        tracing::debug!("Read {} bytes from {}", bytes.len(), path.as_ref().display());
        Self::from_bytes(&bytes)
    }

    /// 检测图像格式
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    /// 验证图像格式是否支持
    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Bmp
                | ImageFormat::Tiff
                | ImageFormat::WebP
                | ImageFormat::Gif
        )
    }

    /// 验证图像尺寸
    pub fn validate_dimensions(image: &DynamicImage) -> Result<()> {
        let (width, height) = image.dimensions();

        if width == 0 || height == 0 {
            return Err(SignError::InvalidInput(format!(
                "Image has no pixels: {}x{}",
                width, height
            )));
        }

        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(SignError::InvalidInput(format!(
                "Image too large: {}x{}, maximum {}x{}",
                width, height, MAX_DIMENSION, MAX_DIMENSION
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn loads_png_from_bytes() {
        let image = ImageLoader::from_bytes(&png_bytes(4, 3)).unwrap();
        assert_eq!(image.dimensions(), (4, 3));
    }

    #[test]
    fn loads_data_url() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(2, 2));
        let data_url = format!("data:image/png;base64,{}", encoded);
        let image = ImageLoader::from_base64(&data_url).unwrap();
        assert_eq!(image.dimensions(), (2, 2));
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = ImageLoader::from_base64("not base64 !!").unwrap_err();
        assert!(matches!(err, SignError::Base64(_)));
    }

    #[test]
    fn rejects_garbage_bytes() {
        let err = ImageLoader::from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, SignError::ImageDecode(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ImageLoader::from_path("/nonexistent/sign.png").unwrap_err();
        assert!(matches!(err, SignError::Io(_)));
    }
}
