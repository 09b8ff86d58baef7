//! Configuration types for the display manager.

use crate::errors::DisplayError;
use display_common::Size;
use display_scaling::{
    ScalingCalculator, DEFAULT_HIGH_DPI_THRESHOLD, DESIGN_CANVAS, MIN_OPTIMAL_TEXT_PX,
    MIN_SCALED_TEXT_PX,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete display engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    /// Design canvas settings.
    #[serde(default)]
    pub canvas: CanvasConfig,
    /// Text sizing settings.
    #[serde(default)]
    pub text: TextConfig,
    /// DPI classification settings.
    #[serde(default)]
    pub dpi: DpiSettings,
}

/// Design canvas that slide content is authored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_canvas_width")]
    pub width: u32,
    #[serde(default = "default_canvas_height")]
    pub height: u32,
}

fn default_canvas_width() -> u32 {
    DESIGN_CANVAS.width
}

fn default_canvas_height() -> u32 {
    DESIGN_CANVAS.height
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_canvas_width(),
            height: default_canvas_height(),
        }
    }
}

/// Text floors applied by the two text sizing paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextConfig {
    /// Floor for canvas-scaled text, in pixels.
    #[serde(default = "default_min_scaled_px")]
    pub min_scaled_px: f64,
    /// Floor for profile-based text, in pixels.
    #[serde(default = "default_min_optimal_px")]
    pub min_optimal_px: f64,
}

fn default_min_scaled_px() -> f64 {
    MIN_SCALED_TEXT_PX
}

fn default_min_optimal_px() -> f64 {
    MIN_OPTIMAL_TEXT_PX
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            min_scaled_px: default_min_scaled_px(),
            min_optimal_px: default_min_optimal_px(),
        }
    }
}

/// DPI classification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DpiSettings {
    /// Scale factor above which a display counts as high-DPI.
    #[serde(default = "default_high_dpi_threshold")]
    pub high_dpi_threshold: f64,
}

fn default_high_dpi_threshold() -> f64 {
    DEFAULT_HIGH_DPI_THRESHOLD
}

impl Default for DpiSettings {
    fn default() -> Self {
        Self {
            high_dpi_threshold: default_high_dpi_threshold(),
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parses a configuration from TOML. Missing sections take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or fails validation.
    pub fn from_toml_str(text: &str) -> Result<Self, DisplayError> {
        let config: Config =
            toml::from_str(text).map_err(|e| DisplayError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DisplayError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DisplayError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), DisplayError> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(DisplayError::Config(
                "Canvas dimensions must be non-zero".to_string(),
            ));
        }

        for (name, value) in [
            ("text.min_scaled_px", self.text.min_scaled_px),
            ("text.min_optimal_px", self.text.min_optimal_px),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(DisplayError::Config(format!(
                    "{} must be a positive number",
                    name
                )));
            }
        }

        if !self.dpi.high_dpi_threshold.is_finite() || self.dpi.high_dpi_threshold <= 0.0 {
            return Err(DisplayError::Config(
                "dpi.high_dpi_threshold must be a positive number".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the design canvas size.
    #[must_use]
    pub fn canvas_size(&self) -> Size {
        Size::new(self.canvas.width, self.canvas.height)
    }

    /// Builds a scaling calculator for this configuration.
    #[must_use]
    pub fn calculator(&self) -> ScalingCalculator {
        ScalingCalculator::new(self.canvas_size())
            .with_text_floors(self.text.min_scaled_px, self.text.min_optimal_px)
    }
}

/// Builder for creating a `Config`.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the design canvas size.
    #[must_use]
    pub fn canvas(mut self, width: u32, height: u32) -> Self {
        self.config.canvas = CanvasConfig { width, height };
        self
    }

    /// Sets both text floors.
    #[must_use]
    pub fn text_floors(mut self, min_scaled_px: f64, min_optimal_px: f64) -> Self {
        self.config.text = TextConfig {
            min_scaled_px,
            min_optimal_px,
        };
        self
    }

    /// Sets the high-DPI threshold.
    #[must_use]
    pub fn high_dpi_threshold(mut self, threshold: f64) -> Self {
        self.config.dpi.high_dpi_threshold = threshold;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<Config, DisplayError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
