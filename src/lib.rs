/*!
 * # persian-rtl - Persian/Arabic script direction engine
 *
 * A Rust library that keeps a live, externally mutated HTML document
 * annotated so that Persian and Arabic text renders right-to-left with a
 * suitable typeface, while Latin text and code regions stay untouched.
 *
 * ## Features
 *
 * - Script classification over configurable Unicode range sets
 * - Exclusion of structural and verbatim/code subtrees
 * - Idempotent direction, alignment and typeface annotation
 * - Heading and list special cases
 * - Debounced reactive passes driven by document mutation records
 * - Synchronous direction switching for live input fields
 * - User settings with typeface catalog and web-font stylesheets
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `script`: Script classifier
 * - `exclusion`: Exclusion policy
 * - `annotator`: Subtree annotator and per-node annotation state
 * - `scheduler`: Debounce state machine for annotation passes
 * - `live_input`: Live input registry
 * - `engine`: Reactive engine tying the pieces to the document
 * - `dom`: Live document tree, parsing, serialisation and mutation records
 * - `settings`: User settings and settings stores
 * - `fonts`: Typeface catalog
 * - `assets`: Global stylesheet and font link
 * - `app_config`: Configuration management
 * - `language_utils`: ISO language tag utilities
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod annotator;
pub mod app_config;
pub mod assets;
pub mod dom;
pub mod engine;
pub mod errors;
pub mod exclusion;
pub mod fonts;
pub mod language_utils;
pub mod live_input;
pub mod scheduler;
pub mod script;
pub mod settings;

// Re-export main types for easier usage
pub use annotator::{AnnotateReport, Annotator, Direction};
pub use app_config::Config;
pub use dom::{Document, SharedDocument};
pub use engine::{EngineStats, HostEvent, RtlEngine};
pub use errors::{AppError, DomError, SettingsError};
pub use exclusion::ExclusionPolicy;
pub use script::{classify, ClassificationResult, ScriptClassifier, ScriptRangeSet};
pub use settings::{Appearance, JsonFileStore, MemoryStore, Settings, SettingsStore};
