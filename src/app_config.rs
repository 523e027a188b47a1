use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;

use crate::dom::SimpleSelector;
use crate::script::ScriptRangeSet;

/// Engine configuration module
/// This module handles the engine configuration including loading,
/// validating and saving configuration settings.
/// Represents the engine configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// How annotations are written onto the document
    #[serde(default)]
    pub annotation: AnnotationConfig,

    /// Which elements are never annotated
    #[serde(default)]
    pub exclusion: ExclusionConfig,

    /// Script detection settings
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Debounce timings of the reactive scheduler
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Value written to the `unicode-bidi` property of RTL elements
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UnicodeBidi {
    /// Do not write the property
    Normal,
    #[default]
    Isolate,
    BidiOverride,
}

impl UnicodeBidi {
    /// CSS value, `None` when nothing should be written
    pub fn css_value(self) -> Option<&'static str> {
        match self {
            Self::Normal => None,
            Self::Isolate => Some("isolate"),
            Self::BidiOverride => Some("bidi-override"),
        }
    }
}

/// How descendants of an RTL element are treated
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InlinePolicy {
    /// Inline descendants are explicitly marked with the container's direction
    #[default]
    Inherit,
    /// Every descendant decides from its own text
    Independent,
}

/// Annotation output settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnnotationConfig {
    /// Class carrying the typeface rule
    #[serde(default = "default_typeface_class")]
    pub typeface_class: String,

    /// Attribute marking nodes the engine has decided a direction for
    #[serde(default = "default_processed_attribute")]
    pub processed_attribute: String,

    /// Attribute marking wired live inputs
    #[serde(default = "default_input_wired_attribute")]
    pub input_wired_attribute: String,

    /// Attribute marking mirrored list containers
    #[serde(default = "default_list_attribute")]
    pub list_attribute: String,

    /// Language tag written to RTL nodes (ISO 639)
    #[serde(default = "default_language_tag")]
    pub language_tag: String,

    #[serde(default)]
    pub unicode_bidi: UnicodeBidi,

    #[serde(default)]
    pub inline_policy: InlinePolicy,

    /// Padding given to the reading-start side of mirrored lists without inline padding
    #[serde(default = "default_list_indent")]
    pub list_indent: String,

    /// Restrict annotation to these containers; empty means the whole document
    #[serde(default)]
    pub containers: Vec<String>,

    /// Id of the global stylesheet element
    #[serde(default = "default_stylesheet_id")]
    pub stylesheet_id: String,

    /// Id of the font stylesheet link element
    #[serde(default = "default_font_link_id")]
    pub font_link_id: String,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            typeface_class: default_typeface_class(),
            processed_attribute: default_processed_attribute(),
            input_wired_attribute: default_input_wired_attribute(),
            list_attribute: default_list_attribute(),
            language_tag: default_language_tag(),
            unicode_bidi: UnicodeBidi::default(),
            inline_policy: InlinePolicy::default(),
            list_indent: default_list_indent(),
            containers: Vec::new(),
            stylesheet_id: default_stylesheet_id(),
            font_link_id: default_font_link_id(),
        }
    }
}

impl AnnotationConfig {
    /// Parse the configured container selectors
    pub fn container_selectors(&self) -> Result<Vec<SimpleSelector>> {
        self.containers
            .iter()
            .map(|selector| SimpleSelector::parse(selector))
            .collect()
    }
}

/// Elements excluded from annotation
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExclusionConfig {
    /// Structural tags, matched exactly
    #[serde(default = "default_skip_tags")]
    pub skip_tags: Vec<String>,

    /// Verbatim/code tags, matched exactly
    #[serde(default = "default_verbatim_tags")]
    pub verbatim_tags: Vec<String>,

    /// Verbatim/code class markers, matched as a substring of any class name
    #[serde(default = "default_verbatim_class_markers")]
    pub verbatim_class_markers: Vec<String>,
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            skip_tags: default_skip_tags(),
            verbatim_tags: default_verbatim_tags(),
            verbatim_class_markers: default_verbatim_class_markers(),
        }
    }
}

/// Script detection settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub ranges: ScriptRangeSet,
}

/// Reactive scheduler timings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// Quiet period after the last mutation before a pass runs
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Delay before the first full pass after start
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_typeface_class() -> String {
    "rtl-persian".to_string()
}

fn default_processed_attribute() -> String {
    "data-rtl-processed".to_string()
}

fn default_input_wired_attribute() -> String {
    "data-rtl-input-wired".to_string()
}

fn default_list_attribute() -> String {
    "data-rtl-list".to_string()
}

fn default_language_tag() -> String {
    "fa".to_string()
}

fn default_list_indent() -> String {
    "2rem".to_string()
}

fn default_stylesheet_id() -> String {
    "rtl-persian-style".to_string()
}

fn default_font_link_id() -> String {
    "rtl-persian-font".to_string()
}

fn default_skip_tags() -> Vec<String> {
    ["script", "style", "link", "meta", "head", "title", "noscript", "template", "svg", "math"]
        .iter()
        .map(|tag| tag.to_string())
        .collect()
}

fn default_verbatim_tags() -> Vec<String> {
    ["pre", "code", "kbd", "samp", "tt"]
        .iter()
        .map(|tag| tag.to_string())
        .collect()
}

// Short tag names are never used here: `pre` would match `whitespace-pre-wrap`
fn default_verbatim_class_markers() -> Vec<String> {
    ["code-block", "codeblock", "hljs", "highlight", "language-"]
        .iter()
        .map(|marker| marker.to_string())
        .collect()
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_initial_delay_ms() -> u64 {
    1000
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let annotation = &self.annotation;

        crate::language_utils::normalize_language_tag(&annotation.language_tag)
            .context("Invalid annotation language tag")?;
        if !crate::language_utils::is_arabic_script_language(&annotation.language_tag) {
            warn!(
                "Annotation language tag '{}' is not an Arabic-script language",
                annotation.language_tag
            );
        }

        let names = [
            ("typeface_class", &annotation.typeface_class),
            ("processed_attribute", &annotation.processed_attribute),
            ("input_wired_attribute", &annotation.input_wired_attribute),
            ("list_attribute", &annotation.list_attribute),
            ("stylesheet_id", &annotation.stylesheet_id),
            ("font_link_id", &annotation.font_link_id),
        ];
        for (field, value) in names {
            if value.trim().is_empty() || value.chars().any(char::is_whitespace) {
                return Err(anyhow!("Annotation {} must be a single non-empty name", field));
            }
        }

        annotation
            .container_selectors()
            .context("Invalid container selector")?;

        if self.scheduler.debounce_ms == 0 {
            return Err(anyhow!("Scheduler debounce_ms must be greater than zero"));
        }

        Ok(())
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load a configuration file, writing the default one when it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;
        Ok(config)
    }
}
