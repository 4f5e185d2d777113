use crate::image::ClassScore;
use crate::Result;
use serde::Serialize;

/// 后台任务运行期间展示的占位文本
pub const CLASSIFYING_PLACEHOLDER: &str = "Classifying...";

/// 单次分类结果
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// 选中的类别索引（最高分，并列取最后一个）
    pub class_index: usize,
    /// 类别名称
    pub label: String,
    /// 最高得分
    pub confidence: f32,
    /// 截断后的整数百分比
    pub percentage: i64,
    /// 展示文本 "<百分比>% <标签>"
    pub display_text: String,
    /// 分类器输出的原始得分
    #[serde(skip)]
    pub scores: Vec<f32>,
    /// 处理耗时（秒）
    pub processing_time: f32,
}

/// 将一次请求的结果转换为展示文本
pub fn display_text(result: &Result<Prediction>) -> String {
    match result {
        Ok(prediction) => prediction.display_text.clone(),
        Err(e) => e.display_text(),
    }
}

/// 分类处理选项
#[derive(Debug, Clone, Default)]
pub struct ClassifyOptions {
    /// 返回前k个类别的得分，0表示不返回
    pub top_k: usize,
    /// 是否附带分类器的原始得分向量
    pub include_scores: bool,
}

/// 分类处理阶段
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassifyStage {
    Preprocessing,
    Inference,
    Postprocessing,
    Completed,
}

/// 分类处理状态
#[derive(Debug, Clone)]
pub struct ClassifyStatus {
    pub stage: ClassifyStage,
    /// 进度 (0.0 - 1.0)
    pub progress: f32,
    pub message: String,
}

impl ClassifyStatus {
    pub fn new(stage: ClassifyStage, progress: f32, message: &str) -> Self {
        Self {
            stage,
            progress,
            message: message.to_string(),
        }
    }
}

/// 带可选前k项得分的结果
#[derive(Debug, Clone, Serialize)]
pub struct ClassifyResult {
    #[serde(flatten)]
    pub prediction: Prediction,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_scores: Vec<ClassScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<f32>>,
}
