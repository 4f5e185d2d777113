use crate::models::LabelTable;
use crate::utils::error::SignError;
use crate::Result;
use serde::Serialize;

/// 单个类别的得分
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScore {
    pub class_index: usize,
    pub label: String,
    pub score: f32,
}

/// 结果格式化器
pub struct ResultFormatter;

impl ResultFormatter {
    /// 选出得分最高的类别；并列时取最后一个
    ///
    /// NaN 会被跳过，空向量或全 NaN 返回 `None`。
    pub fn select_best(scores: &[f32]) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;

        for (index, &score) in scores.iter().enumerate() {
            if score.is_nan() {
                continue;
            }
            match best {
                Some((_, best_score)) if score < best_score => {}
                _ => best = Some((index, score)),
            }
        }

        best
    }

    /// 置信度转为整数百分比（截断）
    pub fn percentage(score: f32) -> i64 {
        (score * 100.0) as i64
    }

    /// 格式化为 "<百分比>% <标签>"
    pub fn format_display(score: f32, label: &str) -> String {
        format!("{}% {}", Self::percentage(score), label)
    }

    /// 按得分降序取前k个类别
    pub fn top_k(scores: &[f32], labels: &LabelTable, k: usize) -> Result<Vec<ClassScore>> {
        let mut indexed: Vec<(usize, f32)> = scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, score)| !score.is_nan())
            .collect();

        // 稳定排序，得分相同时索引大的排前面，与select_best一致
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1).then(b.0.cmp(&a.0)));

        indexed
            .into_iter()
            .take(k)
            .map(|(class_index, score)| {
                Ok(ClassScore {
                    class_index,
                    label: labels.get(class_index)?.to_string(),
                    score,
                })
            })
            .collect()
    }

    /// 没有可选类别时的推理错误
    pub fn empty_scores_error(len: usize) -> SignError {
        SignError::Inference(format!(
            "Classifier returned no usable scores ({} values)",
            len
        ))
    }
}
