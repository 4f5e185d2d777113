use crate::utils::error::SignError;
use crate::{Config, Result};
use ndarray::{Array3, Axis};
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::path::Path;

/// 图像分类器：输入平面张量，输出每个类别的得分
///
/// 运行时错误通过 `SignError::Inference` 返回，错误信息会直接展示给用户。
pub trait Classifier: Send + Sync {
    fn predict(&self, tensor: &Array3<f32>) -> Result<Vec<f32>>;

    fn name(&self) -> &str;
}

pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,  // 动态发现的输入名称
    output_name: String, // 动态发现的输出名称
    name: String,
}

impl OnnxClassifier {
    pub fn new(config: &Config) -> Result<Self> {
        Self::from_file(
            &config.model_path(),
            config.onnx_config.intra_threads,
            config.onnx_config.optimization_level,
        )
    }

    pub fn from_file(model_path: &Path, intra_threads: usize, optimization_level: i32) -> Result<Self> {
        if !model_path.exists() {
            return Err(SignError::ModelLoad(format!(
                "Classification model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading classification model from: {}", model_path.display());

        let session = Session::builder()
            .map_err(|e| SignError::ModelLoad(e.to_string()))?
            .with_optimization_level(Self::optimization_level(optimization_level))
            .map_err(|e| SignError::ModelLoad(e.to_string()))?
            .with_intra_threads(intra_threads)
            .map_err(|e| SignError::ModelLoad(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| SignError::ModelLoad(e.to_string()))?;

        let input_name = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => {
                return Err(SignError::ModelLoad(
                    "Classification model has no inputs".to_string(),
                ))
            }
        };

        let output_name = match session.outputs.first() {
            Some(output) => output.name.clone(),
            None => {
                return Err(SignError::ModelLoad(
                    "Classification model has no outputs".to_string(),
                ))
            }
        };

        tracing::info!(
            "Classification model input: '{}', output: '{}'",
            input_name,
            output_name
        );
        for (i, output) in session.outputs.iter().enumerate() {
            tracing::debug!("Classification output[{}]: '{}'", i, output.name);
        }

        let name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            name,
        })
    }

    fn optimization_level(level: i32) -> GraphOptimizationLevel {
        match level {
            i32::MIN..=0 => GraphOptimizationLevel::Disable,
            1 => GraphOptimizationLevel::Level1,
            2 => GraphOptimizationLevel::Level2,
            _ => GraphOptimizationLevel::Level3,
        }
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, tensor: &Array3<f32>) -> Result<Vec<f32>> {
        // 添加batch维度: (1, 3, W, H)
        let batch = tensor.clone().insert_axis(Axis(0));
        let input = Tensor::from_array(batch).map_err(|e| SignError::Inference(e.to_string()))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(inputs![self.input_name.as_str() => input])
            .map_err(|e| SignError::Inference(e.to_string()))?;

        match outputs.get(self.output_name.as_str()) {
            Some(output) => {
                let scores = output
                    .try_extract_array::<f32>()
                    .map_err(|e| SignError::Inference(e.to_string()))?;
                Ok(scores.iter().copied().collect())
            }
            None => {
                let available: Vec<String> = outputs.keys().map(|s| s.to_string()).collect();
                Err(SignError::Inference(format!(
                    "Classification output '{}' not found. Available outputs: {:?}",
                    self.output_name, available
                )))
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_file_is_a_load_error() {
        let err = OnnxClassifier::from_file(Path::new("/nonexistent/model.onnx"), 1, 3)
            .err()
            .unwrap();
        assert!(matches!(err, SignError::ModelLoad(_)));
    }

    #[test]
    fn optimization_level_mapping_saturates() {
        assert!(matches!(
            OnnxClassifier::optimization_level(-1),
            GraphOptimizationLevel::Disable
        ));
        assert!(matches!(
            OnnxClassifier::optimization_level(9),
            GraphOptimizationLevel::Level3
        ));
    }
}
