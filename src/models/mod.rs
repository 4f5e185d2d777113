pub mod classifier;
pub mod labels;
pub mod manager;

pub use classifier::{Classifier, OnnxClassifier};
pub use labels::LabelTable;
pub use manager::{ModelManager, ModelStats};
