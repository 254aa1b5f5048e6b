//! Supported languages and the interpreter table

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Languages the dispatcher knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    Python,
    /// Enabled only through `[interpreters] shell = "sh"`
    Shell,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::JavaScript, Language::Python, Language::Shell];

    /// Languages served without any configuration
    pub const BUILT_IN: [Language; 2] = [Language::JavaScript, Language::Python];

    /// Wire tag for this language
    pub fn tag(self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Shell => "shell",
        }
    }

    fn default_spec(self) -> LanguageSpec {
        match self {
            Language::JavaScript => LanguageSpec::new("node", "js"),
            Language::Python => LanguageSpec::new("python3", "py"),
            Language::Shell => LanguageSpec::new("sh", "sh"),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Returned when a tag names no supported language
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported language '{0}'")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|language| language.tag() == tag)
            .ok_or_else(|| UnsupportedLanguage(tag.to_string()))
    }
}

/// How to launch one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSpec {
    /// Interpreter program, resolved through PATH when not absolute
    pub interpreter: String,

    /// Artifact file extension, without the dot
    pub extension: String,
}

impl LanguageSpec {
    pub fn new(interpreter: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            extension: extension.into(),
        }
    }
}

/// Read-only language table, built once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageTable {
    entries: BTreeMap<Language, LanguageSpec>,
}

impl LanguageTable {
    /// Build the table from built-in defaults plus interpreter overrides.
    /// An override for a language outside [`Language::BUILT_IN`] enables it.
    pub fn with_overrides<'a>(
        overrides: impl IntoIterator<Item = (Language, &'a str)>,
    ) -> Self {
        let mut table = Self::default();
        for (language, interpreter) in overrides {
            table
                .entries
                .entry(language)
                .or_insert_with(|| language.default_spec())
                .interpreter = interpreter.to_string();
        }
        table
    }

    /// Resolve a language to its launcher
    pub fn get(&self, language: Language) -> Option<&LanguageSpec> {
        self.entries.get(&language)
    }

    /// Whether the language has a launcher
    pub fn supports(&self, language: Language) -> bool {
        self.entries.contains_key(&language)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Language, &LanguageSpec)> {
        self.entries.iter().map(|(language, spec)| (*language, spec))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self {
            entries: Language::BUILT_IN
                .into_iter()
                .map(|language| (language, language.default_spec()))
                .collect(),
        }
    }
}
