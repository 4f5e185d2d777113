use crate::utils::error::SignError;
use crate::Result;
use image::{imageops, imageops::FilterType, DynamicImage, GenericImageView, RgbaImage};
use ndarray::Array3;

/// 每个像素在原始缓冲区中占用的字节数 (R, G, B, X)
const BYTES_PER_PIXEL: usize = 4;

/// 模型只使用前三个通道
const CHANNELS: usize = 3;

/// 拉伸缩放使用的重采样滤波器（单次双线性，不保持宽高比）
pub const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// 可以提供RGBA像素缓冲区的图像来源
///
/// 返回`None`表示该图像没有可用的位图数据。
pub trait PixelSource {
    fn size(&self) -> (u32, u32);

    fn rgba_pixels(&self) -> Option<RgbaImage>;
}

impl PixelSource for DynamicImage {
    fn size(&self) -> (u32, u32) {
        GenericImageView::dimensions(self)
    }

    fn rgba_pixels(&self) -> Option<RgbaImage> {
        let (width, height) = GenericImageView::dimensions(self);
        if width == 0 || height == 0 {
            return None;
        }
        Some(self.to_rgba8())
    }
}

impl PixelSource for RgbaImage {
    fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn rgba_pixels(&self) -> Option<RgbaImage> {
        if self.width() == 0 || self.height() == 0 {
            return None;
        }
        Some(self.clone())
    }
}

pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// 将图像转换为形状为 (3, width, height) 的平面张量
    ///
    /// 1. 缩放到目标尺寸（拉伸填充）
    /// 2. 按行优先读取RGBX字节
    /// 3. 归一化到 [-1, 1]
    /// 4. 拆分为R、G、B三个平面并依次拼接
    pub fn preprocess(
        source: &dyn PixelSource,
        target_width: u32,
        target_height: u32,
    ) -> Result<Array3<f32>> {
        if target_width == 0 || target_height == 0 {
            return Err(SignError::Preprocessing(format!(
                "Cannot allocate tensor of shape (3, {}, {})",
                target_width, target_height
            )));
        }

        let (src_w, src_h) = source.size();
        let mut pixels = source.rgba_pixels().ok_or_else(|| {
            SignError::Preprocessing(format!(
                "Image ({}x{}) has no pixel buffer",
                src_w, src_h
            ))
        })?;

        Self::flatten_alpha(&mut pixels);
        let resized = Self::resize(&pixels, target_width, target_height);

        let normalized: Vec<f32> = resized.as_raw().iter().map(|&b| Self::normalize(b)).collect();
        let planar = Self::deinterleave(&normalized);

        Array3::from_shape_vec((CHANNELS, target_width as usize, target_height as usize), planar)
            .map_err(|e| SignError::Preprocessing(format!("Tensor allocation failed: {}", e)))
    }

    /// 字节值映射到 [-1.0, 1.0]
    #[inline]
    pub fn normalize(byte: u8) -> f32 {
        (byte as f32 / 255.0 - 0.5) * 2.0
    }

    /// 合成到不透明黑色背景上，之后alpha字节只作为填充
    fn flatten_alpha(pixels: &mut RgbaImage) {
        for pixel in pixels.pixels_mut() {
            let alpha = pixel[3] as u16;
            if alpha == 255 {
                continue;
            }
            for c in 0..CHANNELS {
                pixel[c] = ((pixel[c] as u16 * alpha + 127) / 255) as u8;
            }
            pixel[3] = 255;
        }
    }

    fn resize(pixels: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        if pixels.dimensions() == (width, height) {
            return pixels.clone();
        }
        imageops::resize(pixels, width, height, RESIZE_FILTER)
    }

    /// 交错的 RGBX 序列 -> R平面 ++ G平面 ++ B平面，丢弃第四个字节
    fn deinterleave(interleaved: &[f32]) -> Vec<f32> {
        let mut planar = Vec::with_capacity(interleaved.len() / BYTES_PER_PIXEL * CHANNELS);
        for channel in 0..CHANNELS {
            planar.extend(
                interleaved
                    .iter()
                    .skip(channel)
                    .step_by(BYTES_PER_PIXEL)
                    .copied(),
            );
        }
        planar
    }
}
