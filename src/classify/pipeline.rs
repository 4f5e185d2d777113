use crate::{
    classify::{ClassifyOptions, ClassifyResult, ClassifyStage, ClassifyStatus, Prediction},
    image::{ImageLoader, ImagePreprocessor, PixelSource, ResultFormatter},
    models::ModelManager,
    utils::error::SignError,
    Result,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// 分类处理流水线：预处理 -> 推理 -> 选取最高分 -> 格式化
#[derive(Clone)]
pub struct ClassificationPipeline {
    manager: Arc<ModelManager>,
}

impl ClassificationPipeline {
    pub fn new(manager: Arc<ModelManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<ModelManager> {
        &self.manager
    }

    /// 在后台线程上对已解码的图像执行分类
    pub async fn classify<S>(
        &self,
        image: S,
        status_tx: Option<mpsc::UnboundedSender<ClassifyStatus>>,
    ) -> Result<Prediction>
    where
        S: PixelSource + Send + 'static,
    {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.classify_blocking(&image, status_tx.as_ref()))
            .await
            .map_err(|e| SignError::Internal(format!("Classification task failed: {}", e)))?
    }

    /// 处理字节流图像
    pub async fn classify_bytes(
        &self,
        bytes: Vec<u8>,
        options: ClassifyOptions,
        status_tx: Option<mpsc::UnboundedSender<ClassifyStatus>>,
    ) -> Result<ClassifyResult> {
        if let Some(ref tx) = status_tx {
            let _ = tx.send(ClassifyStatus::new(
                ClassifyStage::Preprocessing,
                0.0,
                "Decoding image from stream",
            ));
        }

        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || {
            let image = ImageLoader::from_bytes(&bytes)?;
            let prediction = pipeline.classify_blocking(&image, status_tx.as_ref())?;
            pipeline.with_top_scores(prediction, &options)
        })
        .await
        .map_err(|e| SignError::Internal(format!("Classification task failed: {}", e)))?
    }

    /// 处理base64图像
    pub async fn classify_base64(
        &self,
        base64_data: &str,
        options: ClassifyOptions,
        status_tx: Option<mpsc::UnboundedSender<ClassifyStatus>>,
    ) -> Result<ClassifyResult> {
        let image = ImageLoader::from_base64(base64_data)?;
        let prediction = self.classify(image, status_tx).await?;
        self.with_top_scores(prediction, &options)
    }

    /// 同步执行一次完整的分类请求
    pub fn classify_blocking(
        &self,
        image: &dyn PixelSource,
        status_tx: Option<&mpsc::UnboundedSender<ClassifyStatus>>,
    ) -> Result<Prediction> {
        let start_time = Instant::now();
        let report = |stage: ClassifyStage, progress: f32, message: &str| {
            if let Some(tx) = status_tx {
                let _ = tx.send(ClassifyStatus::new(stage, progress, message));
            }
        };

        report(ClassifyStage::Preprocessing, 0.1, "Preprocessing image");
        let (width, height) = self.manager.input_size();
        let tensor = ImagePreprocessor::preprocess(image, width, height)?;

        report(ClassifyStage::Inference, 0.4, "Running classifier");
        let classifier = self.manager.classifier();
        let scores = classifier.predict(&tensor).map_err(|e| match e {
            SignError::Inference(_) => e,
            other => SignError::Inference(other.to_string()),
        })?;

        report(ClassifyStage::Postprocessing, 0.9, "Selecting best class");
        let (class_index, confidence) = ResultFormatter::select_best(&scores)
            .ok_or_else(|| ResultFormatter::empty_scores_error(scores.len()))?;

        let labels = self.manager.labels();
        let label = labels.get(class_index)?.to_string();
        let display_text = ResultFormatter::format_display(confidence, &label);
        let processing_time = start_time.elapsed().as_secs_f32();

        report(ClassifyStage::Completed, 1.0, &display_text);

        tracing::info!(
            "Classification completed: class={}, label={:?}, confidence={:.4}, time={:.3}s",
            class_index,
            label,
            confidence,
            processing_time
        );

        Ok(Prediction {
            class_index,
            percentage: ResultFormatter::percentage(confidence),
            label,
            confidence,
            display_text,
            scores,
            processing_time,
        })
    }

    fn with_top_scores(&self, prediction: Prediction, options: &ClassifyOptions) -> Result<ClassifyResult> {
        let top_scores = if options.top_k > 0 {
            ResultFormatter::top_k(&prediction.scores, &self.manager.labels(), options.top_k)?
        } else {
            Vec::new()
        };

        let scores = options.include_scores.then(|| prediction.scores.clone());

        Ok(ClassifyResult {
            prediction,
            top_scores,
            scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::display_text;
    use crate::models::{Classifier, LabelTable};
    use crate::utils::error::PREPROCESSING_FAILURE_TEXT;
    use image::{Rgba, RgbaImage};
    use ndarray::Array3;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubClassifier {
        scores: Vec<f32>,
        calls: AtomicUsize,
    }

    impl StubClassifier {
        fn new(scores: Vec<f32>) -> Self {
            Self {
                scores,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Classifier for StubClassifier {
        fn predict(&self, tensor: &Array3<f32>) -> Result<Vec<f32>> {
            assert_eq!(tensor.shape(), &[3, 32, 32]);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.scores.clone())
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn predict(&self, _tensor: &Array3<f32>) -> Result<Vec<f32>> {
            Err(SignError::Inference("The model could not be evaluated".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct NoBitmap;

    impl PixelSource for NoBitmap {
        fn size(&self) -> (u32, u32) {
            (0, 0)
        }

        fn rgba_pixels(&self) -> Option<RgbaImage> {
            None
        }
    }

    fn labels() -> LabelTable {
        LabelTable::from_labels(vec!["A".into(), "B".into(), "C".into()])
    }

    fn gray() -> RgbaImage {
        RgbaImage::from_pixel(32, 32, Rgba([128, 128, 128, 255]))
    }

    #[test]
    fn mid_gray_image_reports_best_class() {
        let pipeline = ClassificationPipeline::new(Arc::new(ModelManager::new(
            Arc::new(StubClassifier::new(vec![0.1, 0.95, 0.05])),
            labels(),
        )));

        let prediction = pipeline.classify_blocking(&gray(), None).unwrap();
        assert_eq!(prediction.display_text, "95% B");
        assert_eq!(prediction.class_index, 1);
        assert_eq!(prediction.percentage, 95);
    }

    #[test]
    fn preprocessing_failure_skips_inference() {
        let stub = Arc::new(StubClassifier::new(vec![1.0]));
        let pipeline = ClassificationPipeline::new(Arc::new(ModelManager::new(stub.clone(), labels())));

        let result = pipeline.classify_blocking(&NoBitmap, None);
        assert_eq!(display_text(&result), PREPROCESSING_FAILURE_TEXT);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn inference_failure_surfaces_message() {
        let pipeline = ClassificationPipeline::new(Arc::new(ModelManager::new(
            Arc::new(FailingClassifier),
            labels(),
        )));

        let result = pipeline.classify_blocking(&gray(), None);
        assert_eq!(display_text(&result), "The model could not be evaluated");
    }

    #[test]
    fn index_beyond_label_table_is_an_error() {
        let pipeline = ClassificationPipeline::new(Arc::new(ModelManager::new(
            Arc::new(StubClassifier::new(vec![0.0, 0.1, 0.2, 0.9])),
            labels(),
        )));

        let err = pipeline.classify_blocking(&gray(), None).unwrap_err();
        assert!(matches!(err, SignError::LabelOutOfRange { index: 3, len: 3 }));
    }

    #[test]
    fn progress_is_reported_in_order() {
        let pipeline = ClassificationPipeline::new(Arc::new(ModelManager::new(
            Arc::new(StubClassifier::new(vec![0.5, 0.5])),
            labels(),
        )));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let prediction = pipeline.classify_blocking(&gray(), Some(&tx)).unwrap();
        assert_eq!(prediction.display_text, "50% B");

        let mut stages = Vec::new();
        while let Ok(status) = rx.try_recv() {
            stages.push(status.stage);
        }
        assert_eq!(
            stages,
            vec![
                ClassifyStage::Preprocessing,
                ClassifyStage::Inference,
                ClassifyStage::Postprocessing,
                ClassifyStage::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn async_classification_runs_off_thread() {
        let pipeline = ClassificationPipeline::new(Arc::new(ModelManager::new(
            Arc::new(StubClassifier::new(vec![0.7, 0.2, 0.1])),
            labels(),
        )));

        let prediction = pipeline.classify(gray(), None).await.unwrap();
        assert_eq!(prediction.display_text, "70% A");
    }
}
