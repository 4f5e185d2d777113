use crate::utils::error::SignError;
use crate::Result;
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

/// 类别名称表，按类别索引排列，加载后只读
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// 从CSV文件加载（首行为表头，第二列为类别名称）
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SignError::Labels(format!(
                "Label file not found: {}",
                path.display()
            )));
        }

        tracing::info!("Loading label table from: {}", path.display());

        let file = std::fs::File::open(path).map_err(|e| {
            SignError::Labels(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let table = Self::from_reader(file)?;
        tracing::info!("Loaded {} class labels", table.len());
        tracing::debug!("First labels: {:?}", table.labels.iter().take(5).collect::<Vec<_>>());

        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut labels = Vec::new();

        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(|e| SignError::Labels(format!("Malformed CSV: {}", e)))?;

            let label = record.get(1).ok_or_else(|| {
                SignError::Labels(format!(
                    "Row {} has {} column(s), expected at least 2",
                    row + 1,
                    record.len()
                ))
            })?;

            // 第一列通常是ClassId，只用于检查顺序
            if let Some(class_id) = record.get(0).and_then(|v| v.trim().parse::<usize>().ok()) {
                if class_id != row {
                    tracing::warn!(
                        "Label row {} declares class id {}, labels are indexed by row order",
                        row + 1,
                        class_id
                    );
                }
            }

            labels.push(label.to_string());
        }

        if labels.is_empty() {
            return Err(SignError::Labels("Label file contains no rows".to_string()));
        }

        Ok(Self { labels })
    }

    pub fn from_labels(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// 按类别索引取标签，越界返回错误
    pub fn get(&self, index: usize) -> Result<&str> {
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or(SignError::LabelOutOfRange {
                index,
                len: self.labels.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
