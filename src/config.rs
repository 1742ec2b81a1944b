// src/config.rs

//! Feed parsing configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root feed configuration.
///
/// DealerCenter emits the same logical field under different header names
/// depending on export mode, and new variants keep appearing. The alias
/// tables are ordered candidate lists resolved first-match, kept as data so
/// a new export format is a config change, not a deploy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Ordered header candidates per logical field
    #[serde(default)]
    pub headers: HeaderAliases,

    /// Vendor image CDN rewrite settings
    #[serde(default)]
    pub images: ImageConfig,
}

impl FeedConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Load from the path in `FEED_CONFIG`, or defaults when unset.
    pub fn from_env() -> Self {
        match std::env::var("FEED_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::load_or_default(path),
            _ => Self::default(),
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.headers.vin.is_empty() {
            return Err(AppError::validation("headers.vin has no candidates"));
        }
        if self.headers.price.is_empty() {
            return Err(AppError::validation("headers.price has no candidates"));
        }
        if self.images.target_width == 0 || self.images.target_height == 0 {
            return Err(AppError::validation(
                "images.target_width and target_height must be > 0",
            ));
        }
        Ok(())
    }
}

/// Ordered header-name candidates per logical field.
///
/// Resolution takes the first candidate present in the document whose value
/// in a given row is non-empty after trimming. Matching is case-insensitive
/// on trimmed header names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderAliases {
    /// Price family (special/internet/selling/retail/asking/list price)
    #[serde(default = "defaults::price")]
    pub price: Vec<String>,

    #[serde(default = "defaults::year")]
    pub year: Vec<String>,

    #[serde(default = "defaults::make")]
    pub make: Vec<String>,

    #[serde(default = "defaults::model")]
    pub model: Vec<String>,

    #[serde(default = "defaults::trim")]
    pub trim: Vec<String>,

    #[serde(default = "defaults::vin")]
    pub vin: Vec<String>,

    /// Explicit sold-flag column
    #[serde(default = "defaults::status")]
    pub status: Vec<String>,

    #[serde(default = "defaults::mileage")]
    pub mileage: Vec<String>,

    #[serde(default = "defaults::exterior_color")]
    pub exterior_color: Vec<String>,

    #[serde(default = "defaults::interior_color")]
    pub interior_color: Vec<String>,

    #[serde(default = "defaults::transmission")]
    pub transmission: Vec<String>,

    #[serde(default = "defaults::description")]
    pub description: Vec<String>,

    #[serde(default = "defaults::photos")]
    pub photos: Vec<String>,

    #[serde(default = "defaults::video")]
    pub video: Vec<String>,
}

impl Default for HeaderAliases {
    fn default() -> Self {
        Self {
            price: defaults::price(),
            year: defaults::year(),
            make: defaults::make(),
            model: defaults::model(),
            trim: defaults::trim(),
            vin: defaults::vin(),
            status: defaults::status(),
            mileage: defaults::mileage(),
            exterior_color: defaults::exterior_color(),
            interior_color: defaults::interior_color(),
            transmission: defaults::transmission(),
            description: defaults::description(),
            photos: defaults::photos(),
            video: defaults::video(),
        }
    }
}

/// Vendor CDN image rewrite settings.
///
/// DealerCenter photo URLs carry a `/<width>/<height>/` path segment; feeds
/// hand out thumbnail sizes, so matching URLs are rewritten to the target
/// resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Host substring identifying the vendor CDN
    #[serde(default = "defaults::cdn_host_fragment")]
    pub cdn_host_fragment: String,

    #[serde(default = "defaults::target_width")]
    pub target_width: u32,

    #[serde(default = "defaults::target_height")]
    pub target_height: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            cdn_host_fragment: defaults::cdn_host_fragment(),
            target_width: defaults::target_width(),
            target_height: defaults::target_height(),
        }
    }
}

mod defaults {
    // Header alias defaults. Order matters: first present non-empty wins.
    pub fn price() -> Vec<String> {
        vec![
            "Special Price".into(),
            "SpecialPrice".into(),
            "Internet Price".into(),
            "Selling Price".into(),
            "Retail Price".into(),
            "Asking Price".into(),
            "List Price".into(),
            "Price".into(),
        ]
    }
    pub fn year() -> Vec<String> {
        vec!["Year".into(), "Model Year".into(), "Yr".into()]
    }
    pub fn make() -> Vec<String> {
        vec!["Make".into(), "Manufacturer".into()]
    }
    pub fn model() -> Vec<String> {
        vec!["Model".into()]
    }
    pub fn trim() -> Vec<String> {
        vec!["Trim".into(), "Trim Level".into(), "Series".into()]
    }
    pub fn vin() -> Vec<String> {
        vec!["VIN".into(), "Vin Number".into(), "VIN Number".into()]
    }
    pub fn status() -> Vec<String> {
        vec![
            "Status".into(),
            "Vehicle Status".into(),
            "Sale Status".into(),
        ]
    }
    pub fn mileage() -> Vec<String> {
        vec![
            "Mileage".into(),
            "Miles".into(),
            "Odometer".into(),
            "Odometer Reading".into(),
        ]
    }
    pub fn exterior_color() -> Vec<String> {
        vec![
            "Exterior Color".into(),
            "ExteriorColor".into(),
            "Ext Color".into(),
            "Color".into(),
        ]
    }
    pub fn interior_color() -> Vec<String> {
        vec![
            "Interior Color".into(),
            "InteriorColor".into(),
            "Int Color".into(),
        ]
    }
    pub fn transmission() -> Vec<String> {
        vec!["Transmission".into(), "Trans".into()]
    }
    pub fn description() -> Vec<String> {
        vec!["Description".into(), "Vehicle Description".into()]
    }
    pub fn photos() -> Vec<String> {
        vec![
            "Photo Url List".into(),
            "PhotoUrlList".into(),
            "Photo URLs".into(),
            "PhotoURL".into(),
            "Photos".into(),
            "Image URLs".into(),
        ]
    }
    pub fn video() -> Vec<String> {
        vec![
            "Video Url".into(),
            "VideoURL".into(),
            "Video Link".into(),
            "Video".into(),
        ]
    }

    // Image CDN defaults
    pub fn cdn_host_fragment() -> String {
        "dealercarsearch".into()
    }
    pub fn target_width() -> u32 {
        1600
    }
    pub fn target_height() -> u32 {
        1200
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(FeedConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_vin_candidates() {
        let mut config = FeedConfig::default();
        config.headers.vin.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_image_size() {
        let mut config = FeedConfig::default();
        config.images.target_width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_override_replaces_one_table() {
        let toml = r#"
            [headers]
            price = ["Net Price", "Price"]
        "#;
        let config: FeedConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.headers.price, vec!["Net Price", "Price"]);
        // Untouched tables keep their defaults.
        assert!(!config.headers.vin.is_empty());
        assert_eq!(config.images.target_width, 1600);
    }
}
