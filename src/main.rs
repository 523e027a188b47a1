// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow, Context};
use log::{error, warn, info, debug, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::{Path, PathBuf};
use std::io::Write;
use std::sync::Arc;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use walkdir::WalkDir;

use persian_rtl::app_config::{self, Config};
use persian_rtl::dom::Document;
use persian_rtl::engine::RtlEngine;
use persian_rtl::script::{ScriptClassifier, ScriptRangeSet};
use persian_rtl::settings::{JsonFileStore, MemoryStore, SettingsStore};

/// Suffix of produced files; such files are never used as input
const OUTPUT_SUFFIX: &str = ".rtl.html";

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

/// CLI Wrapper for ScriptRangeSet to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliRangeSet {
    Core,
    Extended,
}

impl From<CliRangeSet> for ScriptRangeSet {
    fn from(cli_ranges: CliRangeSet) -> Self {
        match cli_ranges {
            CliRangeSet::Core => ScriptRangeSet::Core,
            CliRangeSet::Extended => ScriptRangeSet::Extended,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Annotate HTML documents for right-to-left Persian text (default command)
    Annotate(AnnotateArgs),

    /// Print `rtl` or `ltr` for each text argument
    Classify {
        /// Texts to classify
        #[arg(value_name = "TEXT", required = true)]
        texts: Vec<String>,

        /// Unicode ranges counted as Persian/Arabic script
        #[arg(short, long, value_enum, default_value = "extended")]
        ranges: CliRangeSet,
    },

    /// Generate shell completions for persian-rtl
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct AnnotateArgs {
    /// Input HTML file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output file (single input file only)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Settings JSON file (enabled, selectedFont, customFont, fontSize)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// persian-rtl - right-to-left annotation for Persian text in HTML
#[derive(Parser, Debug)]
#[command(name = "persian-rtl")]
#[command(version)]
#[command(about = "Right-to-left annotation for Persian and Arabic text in HTML documents")]
#[command(long_about = "persian-rtl marks Persian/Arabic paragraphs of HTML documents as right-to-left,
applies a Persian typeface, mirrors lists and leaves code blocks untouched.

EXAMPLES:
    persian-rtl chat.html                          # Writes chat.rtl.html
    persian-rtl -f chat.html                       # Force overwrite existing output
    persian-rtl annotate -o out.html chat.html     # Choose the output file
    persian-rtl annotate -s settings.json pages/   # Process a whole directory
    persian-rtl classify 'Hello' 'سلام'            # Prints ltr, rtl
    persian-rtl completions bash > persian-rtl.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SETTINGS:
    Typeface settings are read from --settings, otherwise from
    <config dir>/persian-rtl/settings.json, otherwise defaults apply.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input HTML file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Settings JSON file
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
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

    // @returns: Emoji and ANSI colour for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
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
            let (emoji, colour) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                colour, now, emoji, record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with trace level; the effective level is
    // lowered with set_max_level after the config is loaded
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "persian-rtl", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Classify { texts, ranges }) => {
            let classifier = ScriptClassifier::new(ranges.into());
            for text in texts {
                let direction = if classifier.is_target(&text) { "rtl" } else { "ltr" };
                println!("{}", direction);
            }
            Ok(())
        }
        Some(Commands::Annotate(args)) => run_annotate(args).await,
        None => {
            // Default behavior - use top-level args
            let input_path = cli.input_path.ok_or_else(|| {
                anyhow!("INPUT_PATH is required when no subcommand is specified")
            })?;

            let annotate_args = AnnotateArgs {
                input_path,
                output: None,
                force_overwrite: cli.force_overwrite,
                settings: cli.settings,
                config_path: cli.config_path,
                log_level: cli.log_level,
            };
            run_annotate(annotate_args).await
        }
    }
}

async fn run_annotate(options: AnnotateArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(Path::new(&options.config_path))?;
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate()
        .context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let store = settings_store(options.settings.as_deref());
    debug!("Settings store: {:?}", store);

    if options.input_path.is_file() {
        let output = match &options.output {
            Some(output) => output.clone(),
            None => output_path_for(&options.input_path)?,
        };
        annotate_file(&options.input_path, &output, &config, store, options.force_overwrite).await?;
    } else if options.input_path.is_dir() {
        if options.output.is_some() {
            return Err(anyhow!("--output can only be used with a single input file"));
        }
        annotate_folder(&options.input_path, &config, store, options.force_overwrite).await?;
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", options.input_path));
    }

    Ok(())
}

fn settings_store(explicit: Option<&Path>) -> Arc<dyn SettingsStore> {
    match explicit {
        Some(path) => Arc::new(JsonFileStore::new(path)),
        None => match JsonFileStore::default_location() {
            Some(store) => Arc::new(store),
            None => Arc::new(MemoryStore::new()),
        },
    }
}

fn output_path_for(input: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| anyhow!("Input file has no name: {:?}", input))?
        .to_string_lossy();
    let dir = input.parent().unwrap_or(Path::new("."));
    Ok(dir.join(format!("{}{}", stem, OUTPUT_SUFFIX)))
}

fn is_html_input(path: &Path) -> bool {
    let name = path.file_name().map(|name| name.to_string_lossy().to_lowercase()).unwrap_or_default();
    if name.ends_with(OUTPUT_SUFFIX) {
        return false;
    }
    matches!(
        path.extension().map(|ext| ext.to_string_lossy().to_lowercase()).as_deref(),
        Some("html") | Some("htm")
    )
}

async fn annotate_file(
    input: &Path,
    output: &Path,
    config: &Config,
    store: Arc<dyn SettingsStore>,
    force_overwrite: bool,
) -> Result<bool> {
    if output.exists() && !force_overwrite {
        warn!("Output file already exists: {:?}. Use -f to force overwrite.", output);
        return Ok(false);
    }

    info!("Annotating: {:?}", input);
    let source = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read input file: {:?}", input))?;

    let document = Document::parse_html(&source).into_shared();
    let mut engine = RtlEngine::new(Arc::clone(&document), config.clone(), store)?;
    let stats = engine.settle().await;
    debug!(
        "{} root(s) annotated, {} failed, {} input(s) wired",
        stats.roots_annotated, stats.roots_failed, stats.inputs_wired
    );

    let mut html = document.lock().to_html();
    if source.trim_start().to_ascii_lowercase().starts_with("<!doctype html") {
        html.insert_str(0, "<!DOCTYPE html>\n");
    }
    tokio::fs::write(output, html)
        .await
        .with_context(|| format!("Failed to write output file: {:?}", output))?;

    info!("Success: {:?}", output);
    Ok(true)
}

async fn annotate_folder(
    input_dir: &Path,
    config: &Config,
    store: Arc<dyn SettingsStore>,
    force_overwrite: bool,
) -> Result<()> {
    info!("Annotating HTML files in directory: {:?}", input_dir);

    let mut processed_count = 0;
    for entry in WalkDir::new(input_dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() || !is_html_input(path) {
            continue;
        }

        let output = output_path_for(path)?;
        match annotate_file(path, &output, config, Arc::clone(&store), force_overwrite).await {
            Ok(true) => processed_count += 1,
            Ok(false) => {}
            Err(e) => error!("Error processing file {:?}: {}", path, e),
        }
    }

    info!("Finished processing {} files", processed_count);
    Ok(())
}
