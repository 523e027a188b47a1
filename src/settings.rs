/*!
 * User settings.
 *
 * Settings live in an external key-value store that is read at startup and
 * re-read in full whenever a "settings changed" signal arrives. Reading
 * never fails from the engine's point of view: an absent or malformed
 * record yields the built-in defaults.
 */

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::Url;

use crate::errors::SettingsError;
use crate::fonts::{self, DEFAULT_FONT};

/// Selection value meaning "use `customFont`"
pub const CUSTOM_FONT_SELECTION: &str = "custom";

pub const DEFAULT_FONT_SIZE_PX: u32 = 14;
pub const MIN_FONT_SIZE_PX: u32 = 8;
pub const MAX_FONT_SIZE_PX: u32 = 72;

/// Stored settings record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_selected_font")]
    pub selected_font: String,

    #[serde(default)]
    pub custom_font: String,

    /// Font size in pixels, stored as a string
    #[serde(default = "default_font_size", deserialize_with = "string_or_number")]
    pub font_size: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            selected_font: default_selected_font(),
            custom_font: String::new(),
            font_size: default_font_size(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_selected_font() -> String {
    DEFAULT_FONT.to_string()
}

fn default_font_size() -> String {
    DEFAULT_FONT_SIZE_PX.to_string()
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Null => Ok(default_font_size()),
        other => Err(serde::de::Error::custom(format!("invalid font size: {}", other))),
    }
}

/// Resolved presentation derived from the settings
#[derive(Debug, Clone, PartialEq)]
pub struct Appearance {
    pub enabled: bool,
    /// Typeface name after resolving the custom selection
    pub typeface_name: String,
    pub font_size_px: u32,
    /// Stylesheet declaring the typeface, `None` for local or unknown fonts
    pub stylesheet_url: Option<Url>,
}

impl Default for Appearance {
    fn default() -> Self {
        Settings::default().appearance()
    }
}

impl Appearance {
    /// CSS `font-family` value
    pub fn font_family(&self) -> String {
        fonts::family_stack(&self.typeface_name)
    }
}

impl Settings {
    /// Name of the typeface to apply
    pub fn typeface_name(&self) -> String {
        let selected = self.selected_font.trim();
        let name = if selected == CUSTOM_FONT_SELECTION {
            self.custom_font.trim()
        } else {
            selected
        };
        if name.is_empty() {
            DEFAULT_FONT.to_string()
        } else {
            name.to_string()
        }
    }

    /// Font size in pixels, the default when missing or out of range
    pub fn font_size_px(&self) -> u32 {
        let raw = self.font_size.trim();
        let raw = raw.strip_suffix("px").unwrap_or(raw).trim();
        match raw.parse::<f64>() {
            Ok(size) if (MIN_FONT_SIZE_PX as f64..=MAX_FONT_SIZE_PX as f64).contains(&size) => {
                size.round() as u32
            }
            _ => {
                if !raw.is_empty() {
                    warn!("Ignoring font size '{}', using {}px", self.font_size, DEFAULT_FONT_SIZE_PX);
                }
                DEFAULT_FONT_SIZE_PX
            }
        }
    }

    pub fn appearance(&self) -> Appearance {
        let typeface_name = self.typeface_name();
        let stylesheet_url = fonts::lookup(&typeface_name).and_then(|face| face.stylesheet_url());
        Appearance {
            enabled: self.enabled,
            font_size_px: self.font_size_px(),
            stylesheet_url,
            typeface_name,
        }
    }
}

/// Asynchronous key-value store holding the settings record
#[async_trait]
pub trait SettingsStore: Send + Sync + Debug {
    /// Fetch the complete settings record
    async fn fetch(&self) -> Result<Settings, SettingsError>;
}

/// Fetch settings, falling back to defaults on any error
pub async fn load_settings(store: &dyn SettingsStore) -> Settings {
    match store.fetch().await {
        Ok(settings) => {
            debug!("Loaded settings: {:?}", settings);
            settings
        }
        Err(e) => {
            warn!("Using default settings: {}", e);
            Settings::default()
        }
    }
}

/// Settings stored as a JSON file; a missing file means defaults
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store at `<config dir>/persian-rtl/settings.json`, if the platform has a config dir
    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::new(dir.join("persian-rtl").join("settings.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a settings record, creating parent directories as needed
    pub async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SettingsError::Unavailable(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| SettingsError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn fetch(&self) -> Result<Settings, SettingsError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}", self.path.display());
                return Ok(Settings::default());
            }
            Err(e) => {
                return Err(SettingsError::Unavailable(format!("{}: {}", self.path.display(), e)));
            }
        };
        Ok(serde_json::from_str(&content)?)
    }
}

/// In-memory store holding a raw JSON record, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: Arc<Mutex<Option<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: &Settings) -> Self {
        let store = Self::new();
        store.set_settings(settings);
        store
    }

    /// Replace the stored record with an arbitrary JSON value
    pub fn set_raw(&self, value: Value) {
        *self.record.lock() = Some(value);
    }

    pub fn set_settings(&self, settings: &Settings) {
        let value = serde_json::to_value(settings).unwrap_or(Value::Null);
        self.set_raw(value);
    }

    pub fn clear(&self) {
        *self.record.lock() = None;
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn fetch(&self) -> Result<Settings, SettingsError> {
        let record = self.record.lock().clone();
        match record {
            None => Ok(Settings::default()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }
}
