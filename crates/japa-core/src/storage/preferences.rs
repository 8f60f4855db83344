//! Display preferences that are persisted alongside the counters.
//!
//! Only the stored values live here; rendering them is not this crate's job.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::config::DefaultsConfig;
use super::state_store::PersistedRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Hindi,
    English,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Hindi => "hindi",
            Language::English => "english",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hindi" => Ok(Language::Hindi),
            "english" => Ok(Language::English),
            other => Err(format!("unknown language '{other}' (expected hindi or english)")),
        }
    }
}

/// Background gradient as a list of CSS colour strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackgroundTheme(pub Vec<String>);

impl BackgroundTheme {
    pub fn colors(&self) -> &[String] {
        &self.0
    }

    /// Parse a comma-separated colour list. Empty entries are rejected.
    pub fn parse_list(input: &str) -> Result<Self, String> {
        let colors: Vec<String> = input.split(',').map(|c| c.trim().to_string()).collect();
        if colors.iter().any(String::is_empty) {
            return Err(format!("invalid colour list '{input}'"));
        }
        Ok(BackgroundTheme(colors))
    }
}

impl Default for BackgroundTheme {
    fn default() -> Self {
        BackgroundTheme(vec![
            "#FFE0B2".to_string(),
            "#FFCCBC".to_string(),
            "#FFF3E0".to_string(),
        ])
    }
}

pub const DEFAULT_IMAGE_URI: &str =
    "https://upload.wikimedia.org/wikipedia/commons/6/65/Radha_Rani.jpg";

/// Effective preferences: persisted values over configured defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub language: Language,
    pub background_theme: BackgroundTheme,
    pub image_uri: String,
}

impl Preferences {
    pub fn resolve(record: &PersistedRecord, defaults: &DefaultsConfig) -> Self {
        Self {
            language: record.language.unwrap_or(defaults.language),
            background_theme: record
                .background_theme
                .clone()
                .unwrap_or_else(|| defaults.background_theme.clone()),
            image_uri: record
                .image_uri
                .clone()
                .unwrap_or_else(|| defaults.image_uri.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_parse() {
        assert_eq!("English".parse::<Language>().unwrap(), Language::English);
        assert!("sanskrit".parse::<Language>().is_err());
        assert_eq!(serde_json::to_string(&Language::Hindi).unwrap(), "\"hindi\"");
    }

    #[test]
    fn theme_parse_list() {
        let theme = BackgroundTheme::parse_list("#C8E6C9, #DCEDC8,#F1F8E9").unwrap();
        assert_eq!(theme.colors().len(), 3);
        assert_eq!(theme.colors()[1], "#DCEDC8");
        assert!(BackgroundTheme::parse_list("#fff,,#000").is_err());
    }

    #[test]
    fn persisted_values_win_over_defaults() {
        let record = PersistedRecord {
            language: Some(Language::English),
            ..Default::default()
        };
        let prefs = Preferences::resolve(&record, &DefaultsConfig::default());
        assert_eq!(prefs.language, Language::English);
        assert_eq!(prefs.image_uri, DEFAULT_IMAGE_URI);
        assert_eq!(prefs.background_theme, BackgroundTheme::default());
    }
}
