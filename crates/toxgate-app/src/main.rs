//! Toxgate - chat toxicity analysis service.
//!
//! This is the main binary that runs the Toxgate HTTP API:
//! - fetches the toxic-bert model and ONNX Runtime on first run
//! - loads the classifier once at startup
//! - serves POST /analyze_chat until shutdown

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use directories::ProjectDirs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use toxgate_core::classifier::{ToxicBertClassifier, ToxicBertConfig};
use toxgate_core::model_downloader::{DownloadProgress, ModelDownloader, ProgressCallback};
use toxgate_server::{AppState, ClassifierSlot, Server, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};

/// Toxgate - chat toxicity analysis service
#[derive(Parser, Debug)]
#[command(name = "toxgate", version, about)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Path to the toxic-bert ONNX model (defaults to the managed data dir)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Path to the tokenizer.json file (defaults to the managed data dir)
    #[arg(long)]
    tokenizer: Option<PathBuf>,

    /// Do not download missing model files on startup
    #[arg(long)]
    no_download: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "toxgate", "Toxgate").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging to console plus a daily-rotated file.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "toxgate_core={level},toxgate_server={level},toxgate_app={level},warn",
            level = log_level
        ))
    });

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("toxgate")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stdout))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

/// Resolve model file paths, fetching managed files when missing.
///
/// Explicit `--model`/`--tokenizer` paths are used as-is; the ONNX
/// Runtime library is still fetched for them since the dynamic loader
/// needs it either way.
async fn prepare_model_files(args: &Args) -> (PathBuf, PathBuf) {
    let Some(downloader) = ModelDownloader::new() else {
        tracing::warn!("No data directory available, using relative model paths");
        let config = ToxicBertConfig::default();
        return (
            args.model
                .clone()
                .unwrap_or_else(|| PathBuf::from(config.model_path)),
            args.tokenizer
                .clone()
                .unwrap_or_else(|| PathBuf::from(config.tokenizer_path)),
        );
    };

    let model_path = args.model.clone().unwrap_or_else(|| downloader.model_path());
    let tokenizer_path = args
        .tokenizer
        .clone()
        .unwrap_or_else(|| downloader.tokenizer_path());

    if !args.no_download {
        let progress: ProgressCallback = Arc::new(|update: DownloadProgress| {
            match update.percentage() {
                Some(pct) => tracing::info!("{} ({}%)", update.step, pct),
                None => tracing::info!("{}", update.step),
            }
        });

        let result = if args.model.is_none() || args.tokenizer.is_none() {
            downloader.ensure_all(Some(progress)).await
        } else {
            downloader
                .ensure_onnx_runtime(Some(progress))
                .await
                .map(|_| ())
        };

        if let Err(e) = result {
            tracing::warn!("Model download failed: {}", e);
        }
    }

    downloader.setup_environment();

    (model_path, tokenizer_path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _guard = init_logging(&args);

    let (model_path, tokenizer_path) = prepare_model_files(&args).await;

    let config = ToxicBertConfig {
        model_path: model_path.to_string_lossy().into_owned(),
        tokenizer_path: tokenizer_path.to_string_lossy().into_owned(),
        ..ToxicBertConfig::default()
    };

    // A failed load is captured in the slot, not fatal: the server still
    // runs and reports the model as not loaded on every request.
    let slot = match ToxicBertClassifier::new(config) {
        Ok(classifier) => {
            tracing::info!("NLP model loaded successfully on the CPU");
            ClassifierSlot::ready(classifier)
        }
        Err(e) => {
            tracing::error!("Failed to load NLP model: {}", e);
            ClassifierSlot::Unavailable
        }
    };

    let server_config = ServerConfig {
        host: args.host.clone(),
        port: args.port,
    };
    let server =
        Server::new(server_config, AppState::new(slot)).context("failed to create API server")?;

    tracing::info!("Toxgate listening on {}", server.addr());
    server.run().await.context("server exited with error")?;

    Ok(())
}
