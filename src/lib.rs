pub mod classify;
pub mod config;
pub mod image;
pub mod models;
pub mod utils;
pub mod web;

// 重新导出主要类型
pub use classify::{ClassificationController, ClassificationPipeline, Prediction};
pub use config::Config;
pub use models::{Classifier, LabelTable, ModelManager};
pub use utils::error::SignError;

pub type Result<T> = std::result::Result<T, SignError>;
