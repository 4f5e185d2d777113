use crate::config::MODEL_INPUT_SIZE;
use crate::models::{Classifier, LabelTable, OnnxClassifier};
use crate::utils::error::SignError;
use crate::{Config, Result};
use ndarray::Array3;
use std::sync::Arc;

/// 模型管理器：持有分类器和标签表，进程生命周期内只读共享
pub struct ModelManager {
    classifier: Arc<dyn Classifier>,
    labels: Arc<LabelTable>,
    input_size: (u32, u32),
    optimization_level: i32,
    intra_threads: usize,
}

impl ModelManager {
    /// 按配置加载ONNX模型和标签表
    pub fn load(config: &Config) -> Result<Self> {
        tracing::info!("Initializing model manager...");

        let labels = LabelTable::load(config.labels_path())?;
        let classifier = OnnxClassifier::new(config)?;

        tracing::info!(
            "Model manager initialized: model={}, classes={}",
            classifier.name(),
            labels.len()
        );

        let manager = Self {
            classifier: Arc::new(classifier),
            labels: Arc::new(labels),
            input_size: config.input_size(),
            optimization_level: config.onnx_config.optimization_level,
            intra_threads: config.onnx_config.intra_threads,
        };
        manager.health_check()?;

        Ok(manager)
    }

    /// 使用任意分类器实现（测试替身或其他推理引擎）
    pub fn new(classifier: Arc<dyn Classifier>, labels: LabelTable) -> Self {
        Self {
            classifier,
            labels: Arc::new(labels),
            input_size: MODEL_INPUT_SIZE,
            optimization_level: 0,
            intra_threads: 0,
        }
    }

    pub fn classifier(&self) -> Arc<dyn Classifier> {
        Arc::clone(&self.classifier)
    }

    pub fn labels(&self) -> Arc<LabelTable> {
        Arc::clone(&self.labels)
    }

    pub fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    /// 模型健康检查：用全零张量跑一次推理，确认输出宽度不超过标签表长度
    pub fn health_check(&self) -> Result<()> {
        let (width, height) = self.input_size;
        let zeros = Array3::<f32>::zeros((3, width as usize, height as usize));

        let scores = self.classifier.predict(&zeros).map_err(|e| match e {
            SignError::Inference(_) => e,
            other => SignError::Inference(other.to_string()),
        })?;

        if scores.is_empty() {
            return Err(SignError::Inference(
                "Classifier produced no scores".to_string(),
            ));
        }

        if scores.len() > self.labels.len() {
            return Err(SignError::LabelOutOfRange {
                index: scores.len() - 1,
                len: self.labels.len(),
            });
        }

        tracing::debug!(
            "Model health check passed: outputs={}, labels={}",
            scores.len(),
            self.labels.len()
        );
        Ok(())
    }

    /// 获取模型统计信息
    pub fn get_stats(&self) -> ModelStats {
        ModelStats {
            model_name: self.classifier.name().to_string(),
            num_labels: self.labels.len(),
            input_width: self.input_size.0,
            input_height: self.input_size.1,
            intra_threads: self.intra_threads,
            optimization_level: self.optimization_level,
        }
    }
}

/// 模型统计信息
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelStats {
    pub model_name: String,
    pub num_labels: usize,
    pub input_width: u32,
    pub input_height: u32,
    pub intra_threads: usize,
    pub optimization_level: i32,
}
