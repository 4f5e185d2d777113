mod common;

use common::{gray_image, manager, png_bytes, BrokenClassifier, StubClassifier};
use image::{Rgba, RgbaImage};
use onnx_sign::classify::{display_text, ClassifyOptions, CLASSIFYING_PLACEHOLDER};
use onnx_sign::image::PixelSource;
use onnx_sign::utils::error::PREPROCESSING_FAILURE_TEXT;
use onnx_sign::{ClassificationController, ClassificationPipeline, LabelTable, ModelManager};
use std::io::Write;
use std::sync::Arc;

struct Unreadable;

impl PixelSource for Unreadable {
    fn size(&self) -> (u32, u32) {
        (640, 480)
    }

    fn rgba_pixels(&self) -> Option<RgbaImage> {
        None
    }
}

#[tokio::test]
async fn mid_gray_sign_is_reported_as_percentage_and_label() {
    let pipeline = ClassificationPipeline::new(manager(StubClassifier::new(vec![0.1, 0.95, 0.05])));

    let prediction = pipeline.classify(gray_image(32, 32), None).await.unwrap();

    assert_eq!(prediction.display_text, "95% B");
    assert_eq!(prediction.label, "B");
    assert_eq!(prediction.scores, vec![0.1, 0.95, 0.05]);
}

#[tokio::test]
async fn repeated_maximum_picks_last_class() {
    let labels = LabelTable::from_labels(vec!["W".into(), "X".into(), "Y".into(), "Z".into()]);
    let manager = Arc::new(ModelManager::new(
        StubClassifier::new(vec![0.2, 0.9, 0.9, 0.1]),
        labels,
    ));
    let pipeline = ClassificationPipeline::new(manager);

    let prediction = pipeline.classify(gray_image(10, 20), None).await.unwrap();

    assert_eq!(prediction.class_index, 2);
    assert_eq!(prediction.display_text, "90% Y");
}

#[tokio::test]
async fn unreadable_image_never_reaches_classifier() {
    let stub = StubClassifier::new(vec![1.0]);
    let pipeline = ClassificationPipeline::new(manager(stub.clone()));

    let result = pipeline.classify(Unreadable, None).await;

    assert_eq!(display_text(&result), PREPROCESSING_FAILURE_TEXT);
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn classifier_error_message_is_displayed() {
    let pipeline = ClassificationPipeline::new(manager(Arc::new(BrokenClassifier(
        "Input tensor shape mismatch",
    ))));

    let result = pipeline.classify(gray_image(32, 32), None).await;

    assert_eq!(display_text(&result), "Input tensor shape mismatch");
}

#[tokio::test]
async fn encoded_bytes_are_decoded_and_ranked() {
    let pipeline = ClassificationPipeline::new(manager(StubClassifier::new(vec![0.3, 0.1, 0.6])));
    let bytes = png_bytes(RgbaImage::from_pixel(48, 48, Rgba([220, 30, 30, 255])));

    let options = ClassifyOptions {
        top_k: 2,
        include_scores: true,
    };

    let result = pipeline.classify_bytes(bytes, options, None).await.unwrap();

    assert_eq!(result.prediction.display_text, "60% C");
    let ranked: Vec<&str> = result.top_scores.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(ranked, vec!["C", "A"]);
    assert_eq!(result.scores, Some(vec![0.3, 0.1, 0.6]));
}

#[tokio::test]
async fn labels_loaded_from_csv_drive_the_output() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "ClassId,SignName").unwrap();
    writeln!(file, "0,Speed limit (20km/h)").unwrap();
    writeln!(file, "1,Stop").unwrap();

    let labels = LabelTable::load(file.path()).unwrap();
    let manager = Arc::new(ModelManager::new(StubClassifier::new(vec![0.25, 0.75]), labels));
    let pipeline = ClassificationPipeline::new(manager);

    let prediction = pipeline.classify(gray_image(32, 32), None).await.unwrap();
    assert_eq!(prediction.display_text, "75% Stop");
}

#[tokio::test]
async fn controller_shows_placeholder_before_result() {
    let controller = ClassificationController::new(ClassificationPipeline::new(manager(
        StubClassifier::new(vec![0.1, 0.95, 0.05]),
    )));
    let mut rx = controller.subscribe();

    let handle = controller.update_classifications(gray_image(32, 32));
    assert_eq!(*rx.borrow_and_update(), CLASSIFYING_PLACEHOLDER);

    handle.await.unwrap();
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), "95% B");
}
