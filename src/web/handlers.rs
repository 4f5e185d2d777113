use crate::{
    classify::{ClassifyOptions, ClassifyResult, ClassifyStatus},
    utils::error::SignError,
    web::{
        extractors::{RequestId, ValidatedJson, MAX_TOP_K},
        AppState,
    },
    Result,
};
use axum::{
    extract::{multipart::Field, Multipart, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::mpsc;

/// JSON请求体（base64模式）
#[derive(Debug, Deserialize)]
pub struct ClassifyJsonRequest {
    /// Base64编码的图像数据，可带 data URL 前缀
    pub image: String,

    /// 返回前k个候选类别
    #[serde(default)]
    pub top_k: Option<usize>,

    /// 是否返回原始得分向量
    #[serde(default)]
    pub include_scores: bool,
}

/// JSON响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: String,
    pub request_id: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, request_id: String) -> Self {
        Self {
            success: true,
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id,
        }
    }
}

/// JSON base64上传处理器
pub async fn classify_json_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    ValidatedJson(request): ValidatedJson<ClassifyJsonRequest>,
) -> Result<Json<ApiResponse<ClassifyResult>>> {
    let start_time = Instant::now();

    tracing::info!(
        "Processing JSON classify request: request_id={}, top_k={:?}, include_scores={}",
        request_id,
        request.top_k,
        request.include_scores
    );

    let options = ClassifyOptions {
        top_k: request.top_k.unwrap_or(0),
        include_scores: request.include_scores,
    };

    let status_tx = progress_monitor(&state, &request_id);
    let result = state
        .pipeline
        .classify_base64(&request.image, options, status_tx)
        .await?;

    tracing::info!(
        "JSON classify completed: request_id={}, result={:?}, time={:.3}s",
        request_id,
        result.prediction.display_text,
        start_time.elapsed().as_secs_f32()
    );

    Ok(Json(ApiResponse::success(result, request_id)))
}

/// Multipart文件上传处理器
pub async fn classify_upload_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ClassifyResult>>> {
    let start_time = Instant::now();

    tracing::info!("Processing multipart classify request: request_id={}", request_id);

    let mut image_data: Option<Vec<u8>> = None;
    let mut options = ClassifyOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        SignError::InvalidInput(format!("Failed to read multipart field: {}", e))
    })? {
        let field_name = field.name().unwrap_or("unknown").to_string();

        match field_name.as_str() {
            "file" => {
                if let Some(content_type) = field.content_type() {
                    if !content_type.starts_with("image/") && content_type != "application/octet-stream" {
                        return Err(SignError::UnsupportedFormat(content_type.to_string()));
                    }
                }

                let data = field.bytes().await.map_err(|e| {
                    SignError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;

                if data.is_empty() {
                    return Err(SignError::InvalidInput("Empty file".to_string()));
                }

                tracing::debug!("Received file: {} bytes", data.len());
                image_data = Some(data.to_vec());
            }
            "top_k" => {
                let value = field_text(field).await?;
                let top_k: usize = value.trim().parse().map_err(|_| {
                    SignError::InvalidInput(format!("Invalid top_k value: {:?}", value))
                })?;
                if top_k > MAX_TOP_K {
                    return Err(SignError::InvalidInput(format!(
                        "top_k must be at most {}",
                        MAX_TOP_K
                    )));
                }
                options.top_k = top_k;
            }
            "include_scores" => {
                let value = field_text(field).await?;
                options.include_scores = match value.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "on" => true,
                    "false" | "0" | "off" | "" => false,
                    _ => {
                        return Err(SignError::InvalidInput(format!(
                            "Invalid include_scores value: {:?}",
                            value
                        )))
                    }
                };
            }
            _ => {
                tracing::debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let image_data =
        image_data.ok_or_else(|| SignError::InvalidInput("No image file provided".to_string()))?;

    let status_tx = progress_monitor(&state, &request_id);
    let result = state
        .pipeline
        .classify_bytes(image_data, options, status_tx)
        .await?;

    tracing::info!(
        "Upload classify completed: request_id={}, result={:?}, time={:.3}s",
        request_id,
        result.prediction.display_text,
        start_time.elapsed().as_secs_f32()
    );

    Ok(Json(ApiResponse::success(result, request_id)))
}

async fn field_text(field: Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| SignError::InvalidInput(format!("Failed to read multipart field: {}", e)))
}

/// 开发模式下在后台打印处理进度
fn progress_monitor(state: &AppState, request_id: &str) -> Option<mpsc::UnboundedSender<ClassifyStatus>> {
    if !state.config.dev_mode {
        return None;
    }

    let (status_tx, mut status_rx) = mpsc::unbounded_channel::<ClassifyStatus>();
    let request_id = request_id.to_string();

    tokio::spawn(async move {
        while let Some(status) = status_rx.recv().await {
            tracing::debug!(
                "Classify progress [{}]: {:?} - {:.1}% - {}",
                request_id,
                status.stage,
                status.progress * 100.0,
                status.message
            );
        }
    });

    Some(status_tx)
}
