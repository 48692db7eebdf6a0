use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{Config, TranslationProvider};
use crate::extraction::{OcrEngine, TesseractCli};
use crate::file_utils::{FileManager, FileType};
use crate::pipeline::{
    CancellationToken, DocumentPipeline, PipelineConfig, PipelinePhase, PipelineProgress, TranslationReport,
};
use crate::providers::TranslationBackend;
use crate::providers::libretranslate::LibreTranslate;
use crate::providers::ollama::Ollama;
use crate::translation::TranslationAdapter;

// @module: Application controller for document translation

/// Default ports used when an endpoint omits one
const LIBRETRANSLATE_PORT: u16 = 5000;
const OLLAMA_PORT: u16 = 11434;

/// What happened to one input file
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub input_path: PathBuf,
    /// Written document, absent when the run failed
    pub output_path: Option<PathBuf>,
    pub report_path: PathBuf,
    pub report: TranslationReport,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }
}

/// Main application controller for document translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Backend used instead of the configured one
    backend_override: Option<Arc<dyn TranslationBackend>>,
    // @field: OCR engine used instead of the configured one
    ocr_override: Option<Arc<dyn OcrEngine>>,
    cancel: CancellationToken,
    // @field: Draw progress bars
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self {
            config,
            backend_override: None,
            ocr_override: None,
            cancel: CancellationToken::new(),
            show_progress: true,
        })
    }

    /// Use a specific translation backend instead of the configured provider
    pub fn with_backend(mut self, backend: Arc<dyn TranslationBackend>) -> Self {
        self.backend_override = Some(backend);
        self
    }

    /// Use a specific OCR engine instead of the configured one
    pub fn with_ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr_override = Some(engine);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token that stops new pages from starting
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Create the backend for the configured provider
    pub fn create_backend(&self) -> Arc<dyn TranslationBackend> {
        if let Some(backend) = &self.backend_override {
            return backend.clone();
        }

        let translation = &self.config.translation;
        let endpoint = translation.get_endpoint();
        match translation.provider {
            TranslationProvider::LibreTranslate => {
                Arc::new(LibreTranslate::new(&endpoint, LIBRETRANSLATE_PORT, translation.get_api_key()))
            }
            TranslationProvider::Ollama => Arc::new(Ollama::new(
                &endpoint,
                OLLAMA_PORT,
                translation.get_model(),
                translation.common.temperature,
            )),
        }
    }

    /// Create the OCR engine, if OCR is enabled
    pub fn create_ocr_engine(&self) -> Option<Arc<dyn OcrEngine>> {
        if let Some(engine) = &self.ocr_override {
            return Some(engine.clone());
        }
        let ocr = &self.config.ocr;
        if !ocr.enabled {
            return None;
        }
        let mut engine = TesseractCli::new(
            &ocr.tesseract_binary,
            ocr.tessdata_dir.as_ref().map(PathBuf::from),
            ocr.languages.clone(),
        );
        engine.timeout = Duration::from_secs(ocr.timeout_secs);
        Some(Arc::new(engine))
    }

    /// Build a pipeline for one document
    ///
    /// Each document gets its own adapter so the translation cache never
    /// outlives the document it was filled for.
    pub fn create_pipeline(&self) -> DocumentPipeline {
        let adapter = Arc::new(TranslationAdapter::new(self.create_backend(), self.config.adapter_options()));

        let mut config = PipelineConfig::new(&self.config.target_language)
            .with_source_language(self.config.source_language.as_deref())
            .with_layout(self.config.layout.clone());
        if let Some(workers) = self.config.workers {
            config = config.with_workers(workers);
        }

        let mut pipeline = DocumentPipeline::new(config, adapter).with_cancellation(self.cancel.clone());
        if let Some(engine) = self.create_ocr_engine() {
            pipeline = pipeline.with_ocr(engine);
        }
        pipeline
    }

    /// Check the configured backend answers before starting a long run
    pub async fn test_connection(&self) -> Result<()> {
        let backend = self.create_backend();
        backend
            .test_connection()
            .await
            .map_err(|e| anyhow!("{} is not reachable: {}", backend.name(), e))
    }

    /// Run the main workflow with one input document and an output directory
    ///
    /// Returns `None` when the file was skipped because its output exists.
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<Option<FileOutcome>> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(&input_file, &output_dir, &multi_progress, force_overwrite)
            .await
    }

    /// Run the controller with progress reporting
    async fn run_with_progress(
        &self,
        input_file: &Path,
        output_dir: &Path,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<Option<FileOutcome>> {
        let start_time = std::time::Instant::now();

        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        FileManager::ensure_dir(output_dir)?;

        let target = &self.config.target_language;
        let file_type = FileManager::detect_file_type(input_file)?;
        let output_path =
            FileManager::generate_output_path(input_file, output_dir, target, file_type.output_extension());
        let report_path = FileManager::generate_report_path(input_file, output_dir, target);
        if output_path.exists() && !force_overwrite {
            warn!(
                "Skipping {:?}, translation already exists (use -f to force overwrite)",
                input_file
            );
            return Ok(None);
        }

        if file_type == FileType::Unknown {
            warn!("{:?} has no recognized document signature", input_file);
        }

        let bytes = FileManager::read_bytes(input_file)?;
        let pipeline = self.create_pipeline();

        let progress_bar = if self.show_progress {
            let pb = multi_progress.add(ProgressBar::new(100));
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
                .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {percent}% {msg}"))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            pb.set_style(style.progress_chars("█▓▒░"));
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        let on_progress = |progress: PipelineProgress| {
            if let Some(pb) = &progress_bar {
                pb.set_position((progress.overall() * 100.0).round() as u64);
                pb.set_message(Self::describe_progress(&progress));
            }
        };

        let (output, report) = pipeline.translate_bytes(&bytes, Some(&on_progress)).await;

        if let Some(pb) = &progress_bar {
            pb.finish_and_clear();
        }

        let written = match output {
            Some(encoded) => {
                FileManager::write_bytes(&output_path, &encoded)?;
                Some(output_path)
            }
            None => None,
        };
        report
            .write_to(&report_path)
            .with_context(|| format!("Failed to save report for {:?}", input_file))?;

        if report.is_success() {
            info!(
                "Translated {:?} in {}: {}",
                input_file,
                Self::format_duration(start_time.elapsed()),
                report.summary()
            );
        } else {
            error!("Translation of {:?} failed: {}", input_file, report.summary());
        }

        Ok(Some(FileOutcome {
            input_path: input_file.to_path_buf(),
            output_path: written,
            report_path,
            report,
        }))
    }

    fn describe_progress(progress: &PipelineProgress) -> String {
        match progress.phase {
            PipelinePhase::Extraction => "extracting".to_string(),
            PipelinePhase::Analysis => format!("analyzing {}/{} pages", progress.pages_done, progress.total_pages),
            PipelinePhase::Rendering => format!("translating {}/{} pages", progress.pages_done, progress.total_pages),
            PipelinePhase::Done => "done".to_string(),
        }
    }

    // @formats: Duration as a short human string
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Run the workflow in folder mode, translating every document under
    /// `input_dir`. Outputs are written next to their inputs, or under
    /// `output_dir` mirroring the input tree when one is given.
    pub async fn run_folder(
        &self,
        input_dir: PathBuf,
        output_dir: Option<PathBuf>,
        force_overwrite: bool,
    ) -> Result<Vec<FileOutcome>> {
        let start_time = std::time::Instant::now();

        let files = FileManager::find_documents(&input_dir)?;
        if files.is_empty() {
            warn!("No .dtl or .pdf documents found in {:?}", input_dir);
            return Ok(Vec::new());
        }
        info!("Found {} document(s) in {:?}", files.len(), input_dir);

        let multi_progress = MultiProgress::new();
        let folder_pb = if self.show_progress {
            let pb = multi_progress.add(ProgressBar::new(files.len() as u64));
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
                .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            pb.set_style(style.progress_chars("█▓▒░"));
            Some(pb)
        } else {
            None
        };

        let mut outcomes = Vec::new();
        for file in files {
            if self.cancel.is_cancelled() {
                warn!("Cancelled; {:?} and later files were not started", file);
                break;
            }
            if let Some(pb) = &folder_pb {
                pb.set_message(file.file_name().unwrap_or_default().to_string_lossy().to_string());
            }

            let parent = file.parent().unwrap_or(Path::new("."));
            let output_dir = match &output_dir {
                Some(root) => root.join(parent.strip_prefix(&input_dir).unwrap_or(Path::new(""))),
                None => parent.to_path_buf(),
            };
            match self
                .run_with_progress(&file, &output_dir, &multi_progress, force_overwrite)
                .await
            {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(e) => error!("Error processing {:?}: {:#}", file, e),
            }

            if let Some(pb) = &folder_pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = &folder_pb {
            pb.finish_and_clear();
        }

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            "Finished {} document(s), {} failed, in {}",
            outcomes.len(),
            failed,
            Self::format_duration(start_time.elapsed())
        );

        Ok(outcomes)
    }
}
