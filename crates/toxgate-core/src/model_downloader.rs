//! ML model and runtime downloader.
//!
//! Downloads ONNX Runtime and the toxic-bert model files on first run.
//! Supports progress reporting for startup logging.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;

/// Download progress callback type (uses Arc for Clone support).
pub type ProgressCallback = Arc<dyn Fn(DownloadProgress) + Send + Sync>;

/// Download progress information.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    /// Current step description.
    pub step: String,
    /// Bytes downloaded so far.
    pub downloaded: u64,
    /// Total bytes to download (if known).
    pub total: Option<u64>,
    /// Whether the step is complete.
    pub complete: bool,
}

impl DownloadProgress {
    /// Creates a new progress update.
    pub fn new(step: &str, downloaded: u64, total: Option<u64>) -> Self {
        Self {
            step: step.to_string(),
            downloaded,
            total,
            complete: false,
        }
    }

    /// Creates a completion progress.
    pub fn complete(step: &str) -> Self {
        Self {
            step: step.to_string(),
            downloaded: 0,
            total: None,
            complete: true,
        }
    }

    /// Returns progress as a percentage (0-100).
    pub fn percentage(&self) -> Option<u8> {
        self.total.map(|t| {
            if t == 0 {
                100
            } else {
                ((self.downloaded as f64 / t as f64) * 100.0).min(100.0) as u8
            }
        })
    }
}

/// Error types for model downloading.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive extraction error: {0}")]
    Archive(String),

    #[error("Download not available: {0}")]
    NotFound(String),
}

/// ONNX Runtime version to download.
const ONNX_RUNTIME_VERSION: &str = "1.23.2";

/// ONNX Runtime download URL for Windows x64.
#[cfg(all(target_os = "windows", target_arch = "x86_64"))]
const ONNX_RUNTIME_URL: &str = "https://github.com/microsoft/onnxruntime/releases/download/v1.23.2/onnxruntime-win-x64-1.23.2.zip";

/// ONNX Runtime download URL for Linux x64.
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
const ONNX_RUNTIME_URL: &str = "https://github.com/microsoft/onnxruntime/releases/download/v1.23.2/onnxruntime-linux-x64-1.23.2.tgz";

/// ONNX Runtime download URL for macOS x64.
#[cfg(all(target_os = "macos", target_arch = "x86_64"))]
const ONNX_RUNTIME_URL: &str = "https://github.com/microsoft/onnxruntime/releases/download/v1.23.2/onnxruntime-osx-x86_64-1.23.2.tgz";

/// ONNX Runtime download URL for macOS ARM64.
#[cfg(all(target_os = "macos", target_arch = "aarch64"))]
const ONNX_RUNTIME_URL: &str = "https://github.com/microsoft/onnxruntime/releases/download/v1.23.2/onnxruntime-osx-arm64-1.23.2.tgz";

/// Fallback for unsupported platforms.
#[cfg(not(any(
    all(target_os = "windows", target_arch = "x86_64"),
    all(target_os = "linux", target_arch = "x86_64"),
    all(target_os = "macos", target_arch = "x86_64"),
    all(target_os = "macos", target_arch = "aarch64"),
)))]
const ONNX_RUNTIME_URL: &str = "";

/// Toxic-bert ONNX export from Hugging Face (unitary/toxic-bert).
const TOXIC_BERT_MODEL_URL: &str =
    "https://huggingface.co/unitary/toxic-bert/resolve/main/model.onnx";

/// Tokenizer for toxic-bert (bert-base-uncased vocabulary).
const TOXIC_BERT_TOKENIZER_URL: &str =
    "https://huggingface.co/unitary/toxic-bert/resolve/main/tokenizer.json";

/// Downloader for ONNX Runtime and the toxic-bert model files.
pub struct ModelDownloader {
    /// Directory to store downloaded files.
    data_dir: PathBuf,
    /// Directory for models.
    models_dir: PathBuf,
    /// Directory for runtime libraries.
    lib_dir: PathBuf,
}

impl ModelDownloader {
    /// Creates a new model downloader rooted at the project data dir.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "toxgate", "Toxgate")?;
        let data_dir = project_dirs.data_dir().to_path_buf();
        let models_dir = data_dir.join("models");
        let lib_dir = data_dir.join("lib");

        Some(Self {
            data_dir,
            models_dir,
            lib_dir,
        })
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the models directory path.
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Returns the lib directory path.
    pub fn lib_dir(&self) -> &Path {
        &self.lib_dir
    }

    /// Returns the path to the ONNX Runtime library.
    #[cfg(target_os = "windows")]
    pub fn onnx_runtime_path(&self) -> PathBuf {
        self.lib_dir.join("onnxruntime.dll")
    }

    #[cfg(target_os = "linux")]
    pub fn onnx_runtime_path(&self) -> PathBuf {
        self.lib_dir.join("libonnxruntime.so")
    }

    #[cfg(target_os = "macos")]
    pub fn onnx_runtime_path(&self) -> PathBuf {
        self.lib_dir.join("libonnxruntime.dylib")
    }

    /// Returns the path to the toxic-bert model.
    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join("toxic_bert.onnx")
    }

    /// Returns the path to the tokenizer file.
    pub fn tokenizer_path(&self) -> PathBuf {
        self.models_dir.join("tokenizer.json")
    }

    /// Checks if ONNX Runtime is installed.
    pub fn is_onnx_runtime_installed(&self) -> bool {
        self.onnx_runtime_path().exists()
    }

    /// Checks if the model and tokenizer are installed.
    pub fn is_model_installed(&self) -> bool {
        self.model_path().exists() && self.tokenizer_path().exists()
    }

    /// Checks if all ML dependencies are installed.
    pub fn is_ready(&self) -> bool {
        self.is_onnx_runtime_installed() && self.is_model_installed()
    }

    /// Downloads ONNX Runtime if not already installed.
    pub async fn ensure_onnx_runtime(
        &self,
        progress: Option<ProgressCallback>,
    ) -> Result<PathBuf, DownloadError> {
        if self.is_onnx_runtime_installed() {
            if let Some(ref cb) = progress {
                cb(DownloadProgress::complete("ONNX Runtime already installed"));
            }
            return Ok(self.onnx_runtime_path());
        }

        if ONNX_RUNTIME_URL.is_empty() {
            return Err(DownloadError::NotFound(
                "ONNX Runtime not available for this platform".to_string(),
            ));
        }

        fs::create_dir_all(&self.lib_dir)?;

        let step = format!("Downloading ONNX Runtime v{}...", ONNX_RUNTIME_VERSION);
        let bytes = fetch(ONNX_RUNTIME_URL, &step, &progress).await?;

        if let Some(ref cb) = progress {
            cb(DownloadProgress::new(
                "Extracting ONNX Runtime...",
                bytes.len() as u64,
                None,
            ));
        }

        #[cfg(target_os = "windows")]
        self.extract_zip(&bytes, "onnxruntime.dll")?;

        #[cfg(not(target_os = "windows"))]
        self.extract_tgz(&bytes)?;

        if let Some(ref cb) = progress {
            cb(DownloadProgress::complete("ONNX Runtime installed"));
        }

        Ok(self.onnx_runtime_path())
    }

    /// Downloads the model and tokenizer if not already installed.
    pub async fn ensure_model(
        &self,
        progress: Option<ProgressCallback>,
    ) -> Result<PathBuf, DownloadError> {
        if self.is_model_installed() {
            if let Some(ref cb) = progress {
                cb(DownloadProgress::complete("Toxicity model already installed"));
            }
            return Ok(self.model_path());
        }

        fs::create_dir_all(&self.models_dir)?;

        if !self.model_path().exists() {
            let bytes = fetch(
                TOXIC_BERT_MODEL_URL,
                "Downloading toxicity model...",
                &progress,
            )
            .await?;
            save(&self.model_path(), &bytes)?;
        }

        if !self.tokenizer_path().exists() {
            let bytes = fetch(
                TOXIC_BERT_TOKENIZER_URL,
                "Downloading tokenizer...",
                &progress,
            )
            .await?;
            save(&self.tokenizer_path(), &bytes)?;
        }

        if let Some(ref cb) = progress {
            cb(DownloadProgress::complete("Toxicity model installed"));
        }

        Ok(self.model_path())
    }

    /// Ensures all ML dependencies are installed.
    pub async fn ensure_all(
        &self,
        progress: Option<ProgressCallback>,
    ) -> Result<(), DownloadError> {
        self.ensure_onnx_runtime(progress.clone()).await?;
        self.ensure_model(progress).await?;
        Ok(())
    }

    /// Extracts the runtime DLL from a ZIP archive (Windows).
    #[cfg(target_os = "windows")]
    fn extract_zip(&self, data: &[u8], dll_name: &str) -> Result<(), DownloadError> {
        use std::io::{Cursor, Read};
        use zip::ZipArchive;

        let cursor = Cursor::new(data);
        let mut archive =
            ZipArchive::new(cursor).map_err(|e| DownloadError::Archive(e.to_string()))?;

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| DownloadError::Archive(e.to_string()))?;
            let name = file.name().to_string();

            if name.ends_with(dll_name) {
                let dest_path = self.lib_dir.join(dll_name);
                let mut dest_file = File::create(&dest_path)?;
                let mut buffer = Vec::new();
                file.read_to_end(&mut buffer)?;
                dest_file.write_all(&buffer)?;
                return Ok(());
            }
        }

        Err(DownloadError::Archive(format!(
            "{} not found in archive",
            dll_name
        )))
    }

    /// Extracts the runtime library from a tar.gz archive (Linux/macOS).
    #[cfg(not(target_os = "windows"))]
    fn extract_tgz(&self, data: &[u8]) -> Result<(), DownloadError> {
        use flate2::read::GzDecoder;
        use std::io::Cursor;
        use tar::Archive;

        let cursor = Cursor::new(data);
        let decoder = GzDecoder::new(cursor);
        let mut archive = Archive::new(decoder);

        #[cfg(target_os = "linux")]
        let lib_name = "libonnxruntime.so";
        #[cfg(target_os = "macos")]
        let lib_name = "libonnxruntime.dylib";

        for entry in archive
            .entries()
            .map_err(|e| DownloadError::Archive(e.to_string()))?
        {
            let mut entry = entry.map_err(|e| DownloadError::Archive(e.to_string()))?;
            let path = entry
                .path()
                .map_err(|e| DownloadError::Archive(e.to_string()))?;

            if path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with(lib_name))
                .unwrap_or(false)
            {
                let dest_path = self.lib_dir.join(lib_name);
                let mut dest_file = File::create(&dest_path)?;
                std::io::copy(&mut entry, &mut dest_file)?;
                return Ok(());
            }
        }

        Err(DownloadError::Archive(format!(
            "{} not found in archive",
            lib_name
        )))
    }

    /// Gets the environment variable name for the ONNX Runtime library path.
    pub fn onnx_lib_env_var() -> &'static str {
        "ORT_DYLIB_PATH"
    }

    /// Points the dynamic ONNX Runtime loader at the managed library.
    pub fn setup_environment(&self) -> bool {
        if self.is_onnx_runtime_installed() {
            let lib_path = self.onnx_runtime_path();
            std::env::set_var(Self::onnx_lib_env_var(), &lib_path);
            tracing::info!("Set {} to {:?}", Self::onnx_lib_env_var(), lib_path);
            true
        } else {
            false
        }
    }
}

/// Fetches a URL into memory, reporting step progress.
async fn fetch(
    url: &str,
    step: &str,
    progress: &Option<ProgressCallback>,
) -> Result<Vec<u8>, DownloadError> {
    if let Some(cb) = progress {
        cb(DownloadProgress::new(step, 0, None));
    }

    let response = reqwest::get(url)
        .await
        .map_err(|e| DownloadError::Network(e.to_string()))?;

    if !response.status().is_success() {
        return Err(DownloadError::Network(format!(
            "HTTP error: {}",
            response.status()
        )));
    }

    let total = response.content_length();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| DownloadError::Network(e.to_string()))?;

    if let Some(cb) = progress {
        cb(DownloadProgress::new(step, bytes.len() as u64, total));
    }

    Ok(bytes.to_vec())
}

/// Writes downloaded bytes to disk.
fn save(path: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_progress_percentage() {
        let p = DownloadProgress::new("test", 50, Some(100));
        assert_eq!(p.percentage(), Some(50));

        let p = DownloadProgress::new("test", 0, Some(100));
        assert_eq!(p.percentage(), Some(0));

        let p = DownloadProgress::new("test", 100, Some(100));
        assert_eq!(p.percentage(), Some(100));

        let p = DownloadProgress::new("test", 50, None);
        assert_eq!(p.percentage(), None);
    }

    #[test]
    fn download_progress_complete() {
        let p = DownloadProgress::complete("done");
        assert!(p.complete);
        assert_eq!(p.step, "done");
    }

    #[test]
    fn model_downloader_paths() {
        if let Some(downloader) = ModelDownloader::new() {
            assert!(downloader.models_dir().ends_with("models"));
            assert!(downloader.lib_dir().ends_with("lib"));
            assert!(downloader
                .model_path()
                .to_string_lossy()
                .ends_with("toxic_bert.onnx"));
            assert!(downloader
                .tokenizer_path()
                .to_string_lossy()
                .ends_with("tokenizer.json"));
        }
    }

    #[test]
    fn onnx_lib_env_var_name() {
        assert_eq!(ModelDownloader::onnx_lib_env_var(), "ORT_DYLIB_PATH");
    }
}
