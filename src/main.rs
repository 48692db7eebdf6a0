// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use doctrans::app_config::{self, Config, TranslationProvider};
use doctrans::app_controller::{Controller, FileOutcome};
use doctrans::language_utils;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    #[value(name = "libretranslate")]
    LibreTranslate,
    Ollama,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::LibreTranslate => TranslationProvider::LibreTranslate,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate documents while preserving their layout (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for doctrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug, Clone)]
struct TranslateArgs {
    /// Input document or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Directory for the translated document and its report (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for LLM providers
    #[arg(short, long)]
    model: Option<String>,

    /// Provider endpoint URL
    #[arg(long, env = "DOCTRANS_ENDPOINT")]
    endpoint: Option<String>,

    /// Source language override (code or English name); detected when absent
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language (code or English name, e.g. 'hi', 'Tamil')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Largest allowed box height growth before text overflows
    #[arg(long)]
    max_expansion_ratio: Option<f32>,

    /// Maximum number of concurrent backend calls
    #[arg(long)]
    backend_concurrency_limit: Option<usize>,

    /// Pages processed in parallel
    #[arg(long)]
    workers: Option<usize>,

    /// Skip OCR of scanned pages
    #[arg(long)]
    no_ocr: bool,

    /// Tesseract data directory
    #[arg(long)]
    tessdata_dir: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// doctrans - layout-preserving document translation
#[derive(Parser, Debug)]
#[command(name = "doctrans")]
#[command(version)]
#[command(about = "Layout-preserving document translation")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "doctrans translates the text of layout documents (.dtl) and PDFs while keeping every \
block where it was: translated text is refitted into the original boxes, images are copied \
through untouched, and a JSON report lists every degradation.

EXAMPLES:
    doctrans book.dtl -t hi                     # Translate to Hindi using conf.json
    doctrans -s en -t ta book.dtl               # Force English as the source language
    doctrans -t hi -o out/ report.pdf           # Translate a PDF into out/
    doctrans -p ollama -m llama3.2:3b scans/    # Process a directory with Ollama
    doctrans --max-expansion-ratio 1.2 book.dtl # Allow less box growth
    doctrans completions bash > doctrans.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created automatically.

EXIT STATUS:
    Non-zero only when a document could not be translated at all, or when the
    configuration is invalid.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: Option<TranslateArgs>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI color for a log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, color) = Self::decoration(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                emoji,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The level is lowered or raised once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    let args = match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "doctrans", &mut std::io::stdout());
            return Ok(());
        }
        Some(Commands::Translate(args)) => args,
        None => cli
            .translate
            .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?,
    };

    let outcomes = run_translate(args).await?;
    if outcomes.iter().any(|o| !o.is_success()) {
        std::process::exit(1);
    }
    Ok(())
}

/// Load the config file, or create it with defaults when missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        Config::from_file(config_path)
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        config.save(config_path)?;
        Ok(config)
    }
}

/// Override config with CLI options if provided
fn apply_overrides(config: &mut Config, options: &TranslateArgs) -> Result<()> {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }
    if let Some(endpoint) = &options.endpoint {
        config.translation.active_provider_config_mut().endpoint = endpoint.clone();
    }
    if let Some(source) = &options.source_language {
        let code = language_utils::resolve_language(source)
            .with_context(|| format!("Unknown source language '{}'", source))?;
        config.source_language = Some(code);
    }
    if let Some(target) = &options.target_language {
        config.target_language = language_utils::resolve_language(target)
            .with_context(|| format!("Unknown target language '{}'", target))?;
    }
    if let Some(ratio) = options.max_expansion_ratio {
        config.layout.max_expansion_ratio = ratio;
    }
    if let Some(limit) = options.backend_concurrency_limit {
        config.translation.common.backend_concurrency_limit = Some(limit);
    }
    if let Some(workers) = options.workers {
        config.workers = Some(workers);
    }
    if options.no_ocr {
        config.ocr.enabled = false;
    }
    if let Some(dir) = &options.tessdata_dir {
        config.ocr.tessdata_dir = Some(dir.clone());
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
    Ok(())
}

async fn run_translate(options: TranslateArgs) -> Result<Vec<FileOutcome>> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = load_or_create_config(&options.config_path)?;
    apply_overrides(&mut config, &options)?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;

    if let Err(e) = controller.test_connection().await {
        warn!("{}; blocks will pass through untranslated if it stays down", e);
    }

    let token = controller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted: letting in-flight calls finish, no new pages will start");
            token.cancel();
        }
    });

    let outcomes = if options.input_path.is_file() {
        let output_dir = match &options.output_dir {
            Some(dir) => dir.clone(),
            None => options.input_path.parent().unwrap_or(Path::new(".")).to_path_buf(),
        };
        controller
            .run(options.input_path.clone(), output_dir, options.force_overwrite)
            .await?
            .into_iter()
            .collect()
    } else if options.input_path.is_dir() {
        controller
            .run_folder(options.input_path.clone(), options.output_dir.clone(), options.force_overwrite)
            .await?
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", options.input_path));
    };

    for outcome in &outcomes {
        match &outcome.output_path {
            Some(path) => info!("Success: {:?} (report: {:?})", path, outcome.report_path),
            None => error!("No output for {:?} (report: {:?})", outcome.input_path, outcome.report_path),
        }
    }

    Ok(outcomes)
}
