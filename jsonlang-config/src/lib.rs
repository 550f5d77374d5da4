//! Jsonlang Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! It serves as the shared configuration vocabulary across all Jsonlang crates.

use serde::{Deserialize, Serialize};

/// Configuration for evaluation limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Maximum number of call frames (function calls, thunk and field forcing)
    pub max_stack: usize,
    /// Maximum number of trace lines in a rendered error (0 = unlimited)
    pub max_trace: usize,
    /// Native stack reserved for the evaluation thread
    pub eval_thread_stack_bytes: usize,
}

/// How the top-level value is turned into output documents
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One JSON document
    Regular,
    /// Top-level object maps file names to documents
    Multi,
    /// Top-level array holds a stream of documents
    Stream,
}

/// Configuration for value manifestation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Emit top-level strings raw instead of as JSON
    pub string_output: bool,
    /// Spaces per nesting level in JSON output
    pub indent: usize,
    pub mode: OutputMode,
}

/// Quote style used by the source formatter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringStyle {
    Double,
    Single,
    /// Keep whatever quote the source used
    Leave,
}

/// Configuration for the source re-formatter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FmtConfig {
    pub indent: usize,
    pub string_style: StringStyle,
    /// `[ 1, 2 ]` instead of `[1, 2]`
    pub pad_arrays: bool,
    /// `{ a: 1 }` instead of `{a: 1}`
    pub pad_objects: bool,
    /// Drop quotes from field names that are valid identifiers
    pub pretty_field_names: bool,
    pub max_blank_lines: usize,
}

/// Top-level evaluation configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub limits: LimitConfig,
    pub manifest: ManifestConfig,
    pub fmt: FmtConfig,
}

impl EvalConfig {
    /// Parse a configuration from JSON; missing keys take their defaults
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Pipeline phase, used for log targets and error reports
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lexer,
    Parser,
    Desugarer,
    Analyzer,
    Vm,
    Manifest,
}

impl Phase {
    /// Get the string name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Lexer => "lexer",
            Phase::Parser => "parser",
            Phase::Desugarer => "desugarer",
            Phase::Analyzer => "analyzer",
            Phase::Vm => "vm",
            Phase::Manifest => "manifest",
        }
    }

    /// Get the log target name for this phase
    pub fn target(&self) -> String {
        format!("jsonlang::{}", self.as_str())
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_stack: 500,
            max_trace: 20,
            eval_thread_stack_bytes: 256 * 1024 * 1024,
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            string_output: false,
            indent: 3,
            mode: OutputMode::Regular,
        }
    }
}

impl Default for FmtConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            string_style: StringStyle::Double,
            pad_arrays: false,
            pad_objects: true,
            pretty_field_names: true,
            max_blank_lines: 2,
        }
    }
}
