pub mod controller;
pub mod pipeline;
pub mod types;

pub use controller::ClassificationController;
pub use pipeline::ClassificationPipeline;
pub use types::{
    display_text, ClassifyOptions, ClassifyResult, ClassifyStage, ClassifyStatus, Prediction,
    CLASSIFYING_PLACEHOLDER,
};
