use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use onnx_sign::{
    classify::{display_text, ClassificationPipeline},
    config::Config,
    image::ImageLoader,
    web::serve,
    ModelManager,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "onnx-sign")]
#[command(about = "ONNX-powered traffic sign classification")]
struct Cli {
    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP classification service
    Serve {
        /// Server bind address
        #[arg(long, default_value = "0.0.0.0:5005")]
        bind: String,

        /// Number of worker threads
        #[arg(long)]
        workers: Option<usize>,

        /// Enable development mode
        #[arg(long)]
        dev: bool,

        #[command(flatten)]
        models: ModelArgs,
    },
    /// Classify a single image file and print the result
    Classify {
        /// Image to classify
        image: PathBuf,

        #[command(flatten)]
        models: ModelArgs,
    },
}

#[derive(Args)]
struct ModelArgs {
    /// Model directory path
    #[arg(long, default_value = "models")]
    models_dir: String,

    /// Explicit ONNX model path
    #[arg(long)]
    model: Option<PathBuf>,

    /// Explicit label CSV path
    #[arg(long)]
    labels: Option<PathBuf>,
}

impl ModelArgs {
    fn into_config(self, bind: String, workers: Option<usize>, dev: bool) -> Result<Config> {
        Ok(Config::new(bind, self.models_dir, workers, dev)?
            .with_model_path(self.model)
            .with_labels_path(self.labels))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志系统
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Command::Serve {
            bind,
            workers,
            dev,
            models,
        } => {
            let config = models.into_config(bind, workers, dev)?;

            tracing::info!("Starting ONNX sign classification service...");
            tracing::info!("Bind address: {}", config.bind_addr);
            tracing::info!("Model: {}", config.model_path().display());
            tracing::info!("Labels: {}", config.labels_path().display());

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(config.workers)
                .enable_all()
                .build()
                .context("Failed to build tokio runtime")?;

            runtime.block_on(serve(config))?;
        }
        Command::Classify { image, models } => {
            let config = models.into_config(String::new(), Some(1), false)?;
            let manager = ModelManager::load(&config)
                .with_context(|| format!("Failed to initialize from {}", config.models_dir.display()))?;
            let pipeline = ClassificationPipeline::new(Arc::new(manager));

            let result = ImageLoader::from_path(&image)
                .and_then(|img| pipeline.classify_blocking(&img, None));
            println!("{}", display_text(&result));

            if result.is_err() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
