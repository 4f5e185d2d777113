use anyhow::Result;
use std::path::PathBuf;

/// 模型要求的输入分辨率（宽, 高）
pub const MODEL_INPUT_SIZE: (u32, u32) = (32, 32);

/// 默认模型文件名
pub const DEFAULT_MODEL_FILE: &str = "squeezenet_tsr.onnx";

/// 默认标签文件名
pub const DEFAULT_LABELS_FILE: &str = "signnames.csv";

#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器绑定地址
    pub bind_addr: String,

    /// 模型文件目录
    pub models_dir: PathBuf,

    /// 显式指定的模型路径（覆盖models_dir）
    pub model_override: Option<PathBuf>,

    /// 显式指定的标签路径（覆盖models_dir）
    pub labels_override: Option<PathBuf>,

    /// 工作线程数量
    pub workers: usize,

    /// 开发模式
    pub dev_mode: bool,

    /// ONNX Runtime配置
    pub onnx_config: OnnxConfig,

    /// 服务器配置
    pub server_config: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU线程数
    pub intra_threads: usize,

    /// 优化级别 (0-3)
    pub optimization_level: i32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 请求超时时间（秒）
    pub request_timeout: u64,

    /// 最大请求体大小（字节）
    pub max_request_size: usize,
}

impl Config {
    pub fn new(
        bind_addr: String,
        models_dir: String,
        workers: Option<usize>,
        dev_mode: bool,
    ) -> Result<Self> {
        let cpu_cores = num_cpus::get();
        let workers = workers.unwrap_or(cpu_cores);

        if workers == 0 {
            anyhow::bail!("Worker count must be at least 1");
        }

        // 32x32的小模型不需要太多线程
        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores / 2).clamp(1, 4),
            optimization_level: 3,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 },
            max_request_size: 50 * 1024 * 1024, // 50MB
        };

        Ok(Self {
            bind_addr,
            models_dir: PathBuf::from(models_dir),
            model_override: None,
            labels_override: None,
            workers,
            dev_mode,
            onnx_config,
            server_config,
        })
    }

    pub fn with_model_path(mut self, path: Option<PathBuf>) -> Self {
        self.model_override = path;
        self
    }

    pub fn with_labels_path(mut self, path: Option<PathBuf>) -> Self {
        self.labels_override = path;
        self
    }

    /// 获取分类模型路径
    pub fn model_path(&self) -> PathBuf {
        self.model_override
            .clone()
            .unwrap_or_else(|| self.models_dir.join(DEFAULT_MODEL_FILE))
    }

    /// 获取标签文件路径
    pub fn labels_path(&self) -> PathBuf {
        self.labels_override
            .clone()
            .unwrap_or_else(|| self.models_dir.join(DEFAULT_LABELS_FILE))
    }

    /// 模型输入尺寸（宽, 高）
    pub fn input_size(&self) -> (u32, u32) {
        MODEL_INPUT_SIZE
    }
}
