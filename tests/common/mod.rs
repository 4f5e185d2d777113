#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use ndarray::Array3;
use onnx_sign::{Classifier, LabelTable, ModelManager, Result, SignError};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 返回固定得分的分类器
pub struct StubClassifier {
    scores: Vec<f32>,
    pub calls: AtomicUsize,
}

impl StubClassifier {
    pub fn new(scores: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            scores,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for StubClassifier {
    fn predict(&self, _tensor: &Array3<f32>) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scores.clone())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// 总是报错的分类器
pub struct BrokenClassifier(pub &'static str);

impl Classifier for BrokenClassifier {
    fn predict(&self, _tensor: &Array3<f32>) -> Result<Vec<f32>> {
        Err(SignError::Inference(self.0.to_string()))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

pub fn abc_labels() -> LabelTable {
    LabelTable::from_labels(vec!["A".into(), "B".into(), "C".into()])
}

pub fn manager(classifier: Arc<dyn Classifier>) -> Arc<ModelManager> {
    Arc::new(ModelManager::new(classifier, abc_labels()))
}

pub fn gray_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([128, 128, 128, 255]))
}

pub fn png_bytes(image: RgbaImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("encode png");
    buffer.into_inner()
}
