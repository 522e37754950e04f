//! Editor configuration (`folio.config.json`)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "folio.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for one editing session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    pub history: HistoryConfig,
    pub autosave: AutosaveConfig,
    pub viewport: ViewportConfig,
    pub toolbar: ToolbarConfig,
    pub inline_edit: InlineEditConfig,
    pub selection: SelectionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryConfig {
    /// Maximum number of undo entries kept
    pub max_depth: usize,
    pub snapshot_debounce_ms: u64,
    /// How long recording stays disabled after an undo/redo replay
    pub replay_guard_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: 50,
            snapshot_debounce_ms: 250,
            replay_guard_ms: 50,
        }
    }
}

impl HistoryConfig {
    pub fn snapshot_debounce(&self) -> Duration {
        Duration::from_millis(self.snapshot_debounce_ms)
    }

    pub fn replay_guard(&self) -> Duration {
        Duration::from_millis(self.replay_guard_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutosaveConfig {
    pub debounce_ms: u64,
    /// How long the "saved" indicator stays visible after a write
    pub saved_indicator_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1500,
            saved_indicator_ms: 1500,
        }
    }
}

impl AutosaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn saved_indicator(&self) -> Duration {
        Duration::from_millis(self.saved_indicator_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
    /// Slack allowed on the horizontal pan clamp to absorb rounding
    pub pan_tolerance: f64,
    pub bring_into_view_margin: f64,
    pub bring_into_view_passes: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 1.0,
            max_zoom: 4.0,
            zoom_step: 0.1,
            pan_tolerance: 1.0,
            bring_into_view_margin: 24.0,
            bring_into_view_passes: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolbarConfig {
    /// Distance between the anchor rectangle and the toolbar
    pub gap: f64,
    /// Minimum distance kept from the viewport edges
    pub margin: f64,
    /// Fraction of the viewport height below which the toolbar prefers the top
    pub flip_threshold: f64,
}

impl Default for ToolbarConfig {
    fn default() -> Self {
        Self {
            gap: 8.0,
            margin: 8.0,
            flip_threshold: 0.8,
        }
    }
}

/// What happens to an empty synthesized text holder when an edit commits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyPlaceholderPolicy {
    #[default]
    Keep,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InlineEditConfig {
    /// Tag of the child synthesized when a container has nothing to type into
    pub placeholder_tag: String,
    pub empty_placeholder: EmptyPlaceholderPolicy,
}

impl Default for InlineEditConfig {
    fn default() -> Self {
        Self {
            placeholder_tag: "p".to_string(),
            empty_placeholder: EmptyPlaceholderPolicy::Keep,
        }
    }
}

/// Where "select parent" goes when no region of any ancestor applies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParentFallback {
    /// Select the nearest element ancestor as a plain node
    #[default]
    NearestAncestor,
    /// No parent target
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionConfig {
    pub parent_fallback: ParentFallback,
}

impl EditorConfig {
    /// Load config from a directory, falling back to defaults if absent
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let viewport = &self.viewport;
        if viewport.min_zoom <= 0.0 {
            return Err(ConfigError::Invalid("minZoom must be positive".to_string()));
        }
        if viewport.min_zoom > viewport.max_zoom {
            return Err(ConfigError::Invalid(format!(
                "minZoom ({}) exceeds maxZoom ({})",
                viewport.min_zoom, viewport.max_zoom
            )));
        }
        if self.history.max_depth < 2 {
            return Err(ConfigError::Invalid(
                "history.maxDepth must keep at least two entries".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let json = r#"{
            "history": { "maxDepth": 10 },
            "viewport": { "maxZoom": 8.0 },
            "inlineEdit": { "emptyPlaceholder": "remove" },
            "selection": { "parentFallback": "none" }
        }"#;

        let config = EditorConfig::from_json(json).unwrap();
        assert_eq!(config.history.max_depth, 10);
        assert_eq!(config.history.snapshot_debounce_ms, 250);
        assert_eq!(config.viewport.max_zoom, 8.0);
        assert_eq!(config.viewport.min_zoom, 1.0);
        assert_eq!(
            config.inline_edit.empty_placeholder,
            EmptyPlaceholderPolicy::Remove
        );
        assert_eq!(config.selection.parent_fallback, ParentFallback::None);
    }

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.history.max_depth, 50);
        assert_eq!(config.autosave.debounce(), Duration::from_millis(1500));
        assert_eq!(config.viewport.zoom_step, 0.1);
        assert_eq!(config.toolbar.flip_threshold, 0.8);
        assert_eq!(config.inline_edit.placeholder_tag, "p");
        assert_eq!(config.selection.parent_fallback, ParentFallback::NearestAncestor);
    }

    #[test]
    fn test_rejects_inverted_zoom_range() {
        let json = r#"{ "viewport": { "minZoom": 5.0, "maxZoom": 2.0 } }"#;
        assert!(matches!(
            EditorConfig::from_json(json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = std::env::temp_dir().join("folio_config_missing");
        let config = EditorConfig::load(&dir).unwrap();
        assert_eq!(config, EditorConfig::default());
    }
}
