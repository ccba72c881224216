//! Spacing and appearance settings for a layout pass.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_NODE_SPACING: f64 = 120.0;
pub const DEFAULT_CLUSTER_SPACING: f64 = 900.0;
pub const DEFAULT_CLUSTER_SPACING_Y: f64 = 260.0;
pub const DEFAULT_BRIGHTNESS: f32 = 1.0;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub node_spacing: f64,
    pub cluster_spacing: f64,
    pub cluster_spacing_y: f64,
    pub brightness: f32,
    pub show_labels: bool,
    pub show_arrows: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            node_spacing: DEFAULT_NODE_SPACING,
            cluster_spacing: DEFAULT_CLUSTER_SPACING,
            cluster_spacing_y: DEFAULT_CLUSTER_SPACING_Y,
            brightness: DEFAULT_BRIGHTNESS,
            show_labels: true,
            show_arrows: true,
        }
    }
}

/// The settings every derived position depends on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spacing {
    pub node: f64,
    pub cluster: f64,
    pub cluster_y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsField {
    NodeSpacing,
    ClusterSpacing,
    ClusterSpacingY,
    Brightness,
}

impl SettingsField {
    pub fn label(self) -> &'static str {
        match self {
            Self::NodeSpacing => "nodeSpacing",
            Self::ClusterSpacing => "clusterSpacing",
            Self::ClusterSpacingY => "clusterSpacingY",
            Self::Brightness => "brightness",
        }
    }
}

impl fmt::Display for SettingsField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("{field} must be a positive finite number, got {value}")]
    NotPositive { field: SettingsField, value: f64 },
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid settings JSON in {}", path.display()))
    }

    pub fn spacing(&self) -> Spacing {
        Spacing {
            node: self.node_spacing,
            cluster: self.cluster_spacing,
            cluster_y: self.cluster_spacing_y,
        }
    }

    pub fn validate(&self) -> Vec<SettingsError> {
        let fields = [
            (SettingsField::NodeSpacing, self.node_spacing),
            (SettingsField::ClusterSpacing, self.cluster_spacing),
            (SettingsField::ClusterSpacingY, self.cluster_spacing_y),
            (SettingsField::Brightness, f64::from(self.brightness)),
        ];

        fields
            .into_iter()
            .filter(|(_, value)| !value.is_finite() || *value <= 0.0)
            .map(|(field, value)| SettingsError::NotPositive { field, value })
            .collect()
    }

    /// Copy with every invalid field replaced by its default.
    pub fn sanitized(&self) -> Self {
        let errors = self.validate();
        if errors.is_empty() {
            return self.clone();
        }

        let defaults = Self::default();
        let mut sanitized = self.clone();
        for error in &errors {
            tracing::warn!(%error, "falling back to default setting");
            let SettingsError::NotPositive { field, .. } = error;
            match field {
                SettingsField::NodeSpacing => sanitized.node_spacing = defaults.node_spacing,
                SettingsField::ClusterSpacing => {
                    sanitized.cluster_spacing = defaults.cluster_spacing;
                }
                SettingsField::ClusterSpacingY => {
                    sanitized.cluster_spacing_y = defaults.cluster_spacing_y;
                }
                SettingsField::Brightness => sanitized.brightness = defaults.brightness,
            }
        }
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"clusterSpacing": 500, "showArrows": false}"#).expect("valid");

        assert_eq!(settings.cluster_spacing, 500.0);
        assert!(!settings.show_arrows);
        assert_eq!(settings.node_spacing, DEFAULT_NODE_SPACING);
        assert!(settings.show_labels);
    }

    #[test]
    fn spacing_ignores_appearance_fields() {
        let base = Settings::default();
        let brighter = Settings {
            brightness: 1.6,
            show_labels: false,
            ..base.clone()
        };
        let wider = Settings {
            cluster_spacing: 1200.0,
            ..base.clone()
        };

        assert_eq!(base.spacing(), brighter.spacing());
        assert_ne!(base.spacing(), wider.spacing());
    }

    #[test]
    fn invalid_fields_fall_back_to_defaults() {
        let settings = Settings {
            node_spacing: -4.0,
            cluster_spacing_y: f64::NAN,
            brightness: 0.0,
            cluster_spacing: 640.0,
            ..Settings::default()
        };

        assert_eq!(settings.validate().len(), 3);

        let sanitized = settings.sanitized();
        assert_eq!(sanitized.node_spacing, DEFAULT_NODE_SPACING);
        assert_eq!(sanitized.cluster_spacing_y, DEFAULT_CLUSTER_SPACING_Y);
        assert_eq!(sanitized.brightness, DEFAULT_BRIGHTNESS);
        assert_eq!(sanitized.cluster_spacing, 640.0);
        assert!(sanitized.validate().is_empty());
    }
}
