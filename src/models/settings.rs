use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// User settings persisted in `destuff.yaml`.
///
/// The core only reads [`scripts_directory`](Self::scripts_directory) and reads/writes
/// [`search_terms`](Self::search_terms); the remaining fields belong to the front end
/// and are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_font")]
    pub font: String,

    #[serde(default)]
    pub colors: ColorSettings,

    #[serde(default)]
    pub window: WindowSettings,

    #[serde(rename = "scripts-directory", alias = "script-directory", default)]
    pub scripts_directory: String,

    /// Previously used search terms, most recently used last.
    #[serde(rename = "search-terms", default)]
    pub search_terms: Vec<String>,

    /// Path of the external archive rebuild tool.
    #[serde(default)]
    pub desbndbuild: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSettings {
    pub light: String,
    pub dark: String,
}

/// Window geometry. `x`/`y` are missing until the window has been closed once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            light: "#dcdcdc".to_string(),
            dark: "#0c0c0c".to_string(),
        }
    }
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 780,
            height: 570,
            x: None,
            y: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font: default_font(),
            colors: ColorSettings::default(),
            window: WindowSettings::default(),
            scripts_directory: String::new(),
            search_terms: Vec::new(),
            desbndbuild: String::new(),
        }
    }
}

/// Move `term` to the end of `terms`, appending it if absent. Empty terms are ignored.
pub(crate) fn promote_search_term(terms: &mut Vec<String>, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    terms.retain(|t| t != term);
    terms.push(term.to_string());
    true
}

fn default_font() -> String {
    "Consolas 11".to_string()
}

impl Settings {
    /// The configured scripts directory, or None if it was never set.
    pub fn scripts_dir(&self) -> Option<Utf8PathBuf> {
        let trimmed = self.scripts_directory.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Utf8PathBuf::from(trimmed))
        }
    }

    /// Window geometry string: `WxH+X+Y`, or `WxH` when no position is stored yet.
    pub fn geometry(&self) -> String {
        match (self.window.x, self.window.y) {
            (Some(x), Some(y)) => format!(
                "{}x{}+{}+{}",
                self.window.width, self.window.height, x, y
            ),
            _ => format!("{}x{}", self.window.width, self.window.height),
        }
    }

    /// Remember a search term as the most recently used one.
    ///
    /// A term already in the history is moved to the end instead of duplicated.
    /// Returns false for an empty term, which is never recorded.
    pub fn record_search_term(&mut self, term: &str) -> bool {
        promote_search_term(&mut self.search_terms, term)
    }

    /// Forget a search term. Returns true if it was in the history.
    pub fn remove_search_term(&mut self, term: &str) -> bool {
        let before = self.search_terms.len();
        self.search_terms.retain(|t| t != term);
        self.search_terms.len() != before
    }

    /// Search history, most recently used first.
    pub fn recent_search_terms(&self) -> impl Iterator<Item = &str> {
        self.search_terms.iter().rev().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.font, "Consolas 11");
        assert_eq!(settings.colors.light, "#dcdcdc");
        assert_eq!(settings.window.width, 780);
        assert_eq!(settings.window.height, 570);
        assert!(settings.scripts_dir().is_none());
    }

    #[test]
    fn test_geometry_without_position() {
        let settings = Settings::default();
        assert_eq!(settings.geometry(), "780x570");
    }

    #[test]
    fn test_geometry_with_position() {
        let mut settings = Settings::default();
        settings.window.x = Some(10);
        settings.window.y = Some(-20);
        assert_eq!(settings.geometry(), "780x570+10+-20");
    }

    #[test]
    fn test_record_search_term_moves_existing_to_end() {
        let mut settings = Settings::default();
        settings.record_search_term("foo");
        settings.record_search_term("bar");
        settings.record_search_term("foo");

        assert_eq!(settings.search_terms, vec!["bar", "foo"]);
        let recent: Vec<&str> = settings.recent_search_terms().collect();
        assert_eq!(recent, vec!["foo", "bar"]);
    }

    #[test]
    fn test_record_empty_term_ignored() {
        let mut settings = Settings::default();
        assert!(!settings.record_search_term(""));
        assert!(settings.search_terms.is_empty());
    }

    #[test]
    fn test_remove_search_term() {
        let mut settings = Settings::default();
        settings.record_search_term("foo");
        assert!(settings.remove_search_term("foo"));
        assert!(!settings.remove_search_term("foo"));
        assert!(settings.search_terms.is_empty());
    }

    #[test]
    fn test_legacy_key_and_missing_window_position() {
        let yaml = r#"
font: Consolas 11
colors:
  light: '#ffffff'
  dark: '#000000'
window:
  width: 800
  height: 600
script-directory: C:/game/script
search-terms:
  - EventFlag
"#;
        let settings: Settings = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(settings.scripts_dir(), Some(Utf8PathBuf::from("C:/game/script")));
        assert_eq!(settings.window.x, None);
        assert_eq!(settings.search_terms, vec!["EventFlag"]);
        assert_eq!(settings.geometry(), "800x600");
    }
}
