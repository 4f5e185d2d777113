use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// 预处理失败时展示给用户的固定文案
pub const PREPROCESSING_FAILURE_TEXT: &str = "Can't convert image to tensor";

#[derive(Error, Debug)]
pub enum SignError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Label table loading failed: {0}")]
    Labels(String),

    #[error("Image preprocessing failed: {0}")]
    Preprocessing(String),

    #[error("{0}")]
    Inference(String),

    #[error("Class index {index} out of range for label table of length {len}")]
    LabelOutOfRange { index: usize, len: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0} bytes, max allowed: {1} bytes")]
    FileTooLarge(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl SignError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SignError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SignError::FileTooLarge(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            SignError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            SignError::Base64(_) => StatusCode::BAD_REQUEST,
            SignError::ImageDecode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SignError::Preprocessing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SignError::ModelLoad(_) | SignError::Labels(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            SignError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            SignError::Labels(_) => "LABELS_ERROR",
            SignError::Preprocessing(_) => "PREPROCESSING_ERROR",
            SignError::Inference(_) => "INFERENCE_ERROR",
            SignError::LabelOutOfRange { .. } => "LABEL_OUT_OF_RANGE",
            SignError::InvalidInput(_) => "INVALID_INPUT",
            SignError::FileTooLarge(_, _) => "FILE_TOO_LARGE",
            SignError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            SignError::Config(_) => "CONFIG_ERROR",
            SignError::Io(_) => "IO_ERROR",
            SignError::Base64(_) => "BASE64_DECODE_ERROR",
            SignError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            SignError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 用户可见的文本：预处理失败为固定文案，推理失败为原始错误信息
    pub fn display_text(&self) -> String {
        match self {
            SignError::Preprocessing(_) => PREPROCESSING_FAILURE_TEXT.to_string(),
            SignError::Inference(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for SignError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.display_text(),
            }
        });

        tracing::error!("Request failed: {} ({})", self, status);

        (status, axum::Json(error_response)).into_response()
    }
}
