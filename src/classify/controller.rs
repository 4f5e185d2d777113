use crate::classify::{display_text, ClassificationPipeline, CLASSIFYING_PLACEHOLDER};
use crate::image::PixelSource;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// 分类结果展示控制器
///
/// 每次请求立即把展示文本设为 "Classifying..."，在后台完成分类后再写入结果。
/// 请求可以重叠：只有最后发起的请求能写入结果，较早请求的结果被丢弃。
pub struct ClassificationController {
    pipeline: ClassificationPipeline,
    generation: Arc<AtomicU64>,
    text_tx: Arc<watch::Sender<String>>,
}

impl ClassificationController {
    pub fn new(pipeline: ClassificationPipeline) -> Self {
        let (text_tx, _) = watch::channel(String::new());
        Self {
            pipeline,
            generation: Arc::new(AtomicU64::new(0)),
            text_tx: Arc::new(text_tx),
        }
    }

    /// 订阅展示文本的变化
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.text_tx.subscribe()
    }

    /// 当前展示文本
    pub fn current_text(&self) -> String {
        self.text_tx.borrow().clone()
    }

    /// 发起一次分类，返回后台任务句柄
    pub fn update_classifications<S>(&self, image: S) -> JoinHandle<()>
    where
        S: PixelSource + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.text_tx.send_replace(CLASSIFYING_PLACEHOLDER.to_string());

        let pipeline = self.pipeline.clone();
        let latest = Arc::clone(&self.generation);
        let text_tx = Arc::clone(&self.text_tx);

        tokio::spawn(async move {
            let result = pipeline.classify(image, None).await;
            if let Err(ref e) = result {
                tracing::warn!("Failed to perform classification: {}", e);
            }

            let text = display_text(&result);
            // 在发送锁内比较代数，避免覆盖新请求写入的占位文本
            let published = text_tx.send_if_modified(|current| {
                if latest.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *current = text.clone();
                true
            });

            if !published {
                tracing::debug!(
                    "Discarding result of superseded request #{} ({})",
                    generation,
                    text
                );
            }
        })
    }
}
