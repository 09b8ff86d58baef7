//! Scaling between the fixed design canvas and arbitrary target displays.
//!
//! All slide geometry is authored on a 1920x1080 design canvas. This module
//! derives the factors that map that canvas onto a target display, two distinct
//! text sizing policies, aspect-ratio strategies and preview fitting. Everything
//! here is pure: no state, no I/O, no failure.

use crate::catalog::Resolution;
use crate::display::DisplayDescriptor;
use crate::profile::ResolutionProfileTable;
use display_common::{Point, Size};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Logical authoring resolution.
pub const DESIGN_CANVAS: Size = Size::new(1920, 1080);

/// Floor for text scaled through [`ScalingCalculator::scale_text_size`].
pub const MIN_SCALED_TEXT_PX: f64 = 12.0;

/// Floor for text sized through [`ScalingCalculator::calculate_optimal_text_size`].
pub const MIN_OPTIMAL_TEXT_PX: f64 = 8.0;

/// Ratios within this distance of the canvas ratio are stretched.
pub const STRATEGY_TOLERANCE: f64 = 0.1;

/// Scale factor above which a display counts as high DPI.
pub const DEFAULT_HIGH_DPI_THRESHOLD: f64 = 1.25;

/// OS scale factor of a display and the logical/native size conversions it implies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DpiConfig {
    /// Native pixels per logical pixel; always positive and finite.
    pub scale_factor: f64,
}

impl DpiConfig {
    /// Non-positive or non-finite factors are treated as 1.0.
    pub fn from_scale_factor(scale_factor: f64) -> Self {
        let scale_factor = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor
        } else {
            1.0
        };
        Self { scale_factor }
    }

    /// True when the scale factor is strictly above `threshold`.
    pub fn is_high_dpi_at(&self, threshold: f64) -> bool {
        self.scale_factor > threshold
    }

    /// Native panel size for a logical size, rounded per axis.
    pub fn logical_size_to_physical(&self, logical: Size) -> Size {
        Size::new(
            (logical.width as f64 * self.scale_factor).round() as u32,
            (logical.height as f64 * self.scale_factor).round() as u32,
        )
    }

    /// Logical size a full-screen window gets on a panel of `physical` pixels.
    pub fn physical_size_to_logical(&self, physical: Size) -> Size {
        Size::new(
            (physical.width as f64 / self.scale_factor).round() as u32,
            (physical.height as f64 / self.scale_factor).round() as u32,
        )
    }
}

/// How a target whose ratio differs from the canvas ratio is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectRatioStrategy {
    /// Scale each axis independently
    Stretch,
    /// Target is wider than the canvas
    Letterbox,
    /// Target is narrower than the canvas
    Pillarbox,
    /// Declared for completeness; no classification produces it
    Crop,
}

impl Default for AspectRatioStrategy {
    fn default() -> Self {
        Self::Stretch
    }
}

impl fmt::Display for AspectRatioStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stretch => write!(f, "stretch"),
            Self::Letterbox => write!(f, "letterbox"),
            Self::Pillarbox => write!(f, "pillarbox"),
            Self::Crop => write!(f, "crop"),
        }
    }
}

/// Derived canvas-to-display mapping. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingConfiguration {
    pub base_resolution: Size,
    pub target_resolution: Size,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Always `min(scale_x, scale_y)`
    pub uniform_scale: f64,
    /// Height ratio only; independent of `uniform_scale`
    pub text_scale_factor: f64,
    pub aspect_ratio_strategy: AspectRatioStrategy,
    pub dpi_scale: f64,
}

impl ScalingConfiguration {
    /// Check if scaling is required (scale factors != 1.0)
    pub fn requires_scaling(&self) -> bool {
        (self.scale_x - 1.0).abs() > f64::EPSILON || (self.scale_y - 1.0).abs() > f64::EPSILON
    }

    /// Check if uniform scaling (same scale for X and Y)
    pub fn is_uniform(&self) -> bool {
        (self.scale_x - self.scale_y).abs() < f64::EPSILON
    }

    /// Uniform scale as a percentage string for UI display
    pub fn scale_percent(&self) -> String {
        format!("{:.0}%", self.uniform_scale * 100.0)
    }

    /// Convert design canvas coordinates to display coordinates (per-axis).
    pub fn canvas_to_display(&self, canvas_point: Point) -> Point {
        let x = (canvas_point.x as f64 * self.scale_x).round() as i32;
        let y = (canvas_point.y as f64 * self.scale_y).round() as i32;
        Point::new(x, y)
    }

    /// Convert display coordinates back to design canvas coordinates.
    pub fn display_to_canvas(&self, display_point: Point) -> Point {
        if self.scale_x <= 0.0 || self.scale_y <= 0.0 {
            return Point::default();
        }
        let x = (display_point.x as f64 / self.scale_x).round() as i32;
        let y = (display_point.y as f64 / self.scale_y).round() as i32;
        Point::new(x, y)
    }
}

/// Position and size of a slide element, in canvas or display pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ElementFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementFrame {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Fitted preview rectangle inside a container
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewFrame {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Pure scaling functions bound to a design canvas and text floors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingCalculator {
    base: Size,
    min_scaled_text_px: f64,
    min_optimal_text_px: f64,
}

impl Default for ScalingCalculator {
    fn default() -> Self {
        Self {
            base: DESIGN_CANVAS,
            min_scaled_text_px: MIN_SCALED_TEXT_PX,
            min_optimal_text_px: MIN_OPTIMAL_TEXT_PX,
        }
    }
}

impl ScalingCalculator {
    /// Calculator for a custom design canvas. An empty canvas falls back to 1920x1080.
    pub fn new(base: Size) -> Self {
        if base.is_empty() {
            warn!("Invalid design canvas {}, using {}", base, DESIGN_CANVAS);
            return Self::default();
        }
        Self {
            base,
            ..Self::default()
        }
    }

    /// Override the two text floors. Non-finite or negative values are ignored.
    pub fn with_text_floors(mut self, min_scaled_px: f64, min_optimal_px: f64) -> Self {
        if min_scaled_px.is_finite() && min_scaled_px >= 0.0 {
            self.min_scaled_text_px = min_scaled_px;
        }
        if min_optimal_px.is_finite() && min_optimal_px >= 0.0 {
            self.min_optimal_text_px = min_optimal_px;
        }
        self
    }

    pub fn base(&self) -> Size {
        self.base
    }

    /// Derive the mapping from the design canvas onto `target`.
    pub fn calculate_scaling(&self, target: Size) -> ScalingConfiguration {
        let base_width = self.base.width as f64;
        let base_height = self.base.height as f64;

        let scale_x = target.width as f64 / base_width;
        let scale_y = target.height as f64 / base_height;

        ScalingConfiguration {
            base_resolution: self.base,
            target_resolution: target,
            scale_x,
            scale_y,
            uniform_scale: scale_x.min(scale_y),
            text_scale_factor: target.height as f64 / base_height,
            aspect_ratio_strategy: strategy_relative_to(
                target.aspect_ratio(),
                self.base.aspect_ratio(),
            ),
            dpi_scale: 1.0,
        }
    }

    /// Scaling for a full-screen window on `display`, carrying its scale factor.
    pub fn calculate_scaling_for_display(&self, display: &DisplayDescriptor) -> ScalingConfiguration {
        let mut config = self.calculate_scaling(display.logical_size());
        config.dpi_scale = display.effective_scale_factor();

        let display_id = &display.id;
        debug!(
            "Scaling for display {}: {:.3}x{:.3} (uniform {:.3}, text {:.3}, {})",
            display_id,
            config.scale_x,
            config.scale_y,
            config.uniform_scale,
            config.text_scale_factor,
            config.aspect_ratio_strategy
        );

        config
    }

    /// Scale a font size by the height ratio, never below the scaled-text floor.
    pub fn scale_text_size(&self, base_size: f64, config: &ScalingConfiguration) -> f64 {
        (base_size * config.text_scale_factor).max(self.min_scaled_text_px)
    }

    /// Size text from the resolution profile and DPI, never below the optimal-text floor.
    pub fn calculate_optimal_text_size(
        &self,
        base_size: f64,
        resolution: &Resolution,
        dpi_scale: f64,
    ) -> f64 {
        let profile = ResolutionProfileTable::profile(resolution.category);
        (base_size * profile.text_scale * dpi_scale).max(self.min_optimal_text_px)
    }

    /// Scale an element non-uniformly: x/width by `scale_x`, y/height by `scale_y`.
    pub fn scale_element(element: ElementFrame, config: &ScalingConfiguration) -> ElementFrame {
        ElementFrame {
            x: element.x * config.scale_x,
            y: element.y * config.scale_y,
            width: element.width * config.scale_x,
            height: element.height * config.scale_y,
        }
    }

    /// Strategy for a target ratio relative to the 16:9 design canvas.
    pub fn classify_strategy(target_aspect_ratio: f64) -> AspectRatioStrategy {
        strategy_relative_to(target_aspect_ratio, DESIGN_CANVAS.aspect_ratio())
    }

    /// Fit a target ratio inside a container, centered.
    ///
    /// A container wider than the target is filled vertically; otherwise it is
    /// filled horizontally. The result never exceeds the container.
    pub fn calculate_preview_size(
        container_width: f64,
        container_height: f64,
        target_aspect_ratio: f64,
    ) -> PreviewFrame {
        if !(container_width.is_finite() && container_height.is_finite())
            || container_width <= 0.0
            || container_height <= 0.0
        {
            return PreviewFrame::default();
        }

        let ratio = if target_aspect_ratio.is_finite() && target_aspect_ratio > 0.0 {
            target_aspect_ratio
        } else {
            DESIGN_CANVAS.aspect_ratio()
        };

        let container_ratio = container_width / container_height;
        let (width, height) = if container_ratio > ratio {
            (container_height * ratio, container_height)
        } else {
            (container_width, container_width / ratio)
        };

        PreviewFrame {
            width,
            height,
            offset_x: (container_width - width) / 2.0,
            offset_y: (container_height - height) / 2.0,
        }
    }
}

fn strategy_relative_to(ratio: f64, reference: f64) -> AspectRatioStrategy {
    if ratio.is_nan() || ratio <= 0.0 || (ratio - reference).abs() <= STRATEGY_TOLERANCE {
        AspectRatioStrategy::Stretch
    } else if ratio < reference {
        AspectRatioStrategy::Pillarbox
    } else {
        AspectRatioStrategy::Letterbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ResolutionCatalog;
    use crate::display::DisplayId;
    use display_common::Rect;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_dpi_config_threshold() {
        let config = DpiConfig::from_scale_factor(1.25);
        assert!(!config.is_high_dpi_at(DEFAULT_HIGH_DPI_THRESHOLD));
        assert!(config.is_high_dpi_at(1.0));
        assert!(DpiConfig::from_scale_factor(2.0).is_high_dpi_at(DEFAULT_HIGH_DPI_THRESHOLD));
    }

    #[test]
    fn test_dpi_config_rejects_bad_factor() {
        assert_eq!(DpiConfig::from_scale_factor(0.0).scale_factor, 1.0);
        assert_eq!(DpiConfig::from_scale_factor(f64::INFINITY).scale_factor, 1.0);
    }

    #[test]
    fn test_dpi_size_conversions() {
        let config = DpiConfig::from_scale_factor(2.0);
        assert_eq!(config.logical_size_to_physical(Size::new(1440, 900)), Size::new(2880, 1800));
        assert_eq!(config.physical_size_to_logical(Size::new(3840, 2160)), Size::new(1920, 1080));

        let config = DpiConfig::from_scale_factor(1.5);
        assert_eq!(config.physical_size_to_logical(Size::new(2560, 1440)), Size::new(1707, 960));
    }

    #[test]
    fn test_scaling_4k() {
        let config = ScalingCalculator::default().calculate_scaling(Size::new(3840, 2160));

        assert_eq!(config.uniform_scale, 2.0);
        assert_eq!(config.text_scale_factor, 2.0);
        assert_eq!(config.aspect_ratio_strategy, AspectRatioStrategy::Stretch);
        assert!(config.is_uniform());
        assert!(config.requires_scaling());
        assert_eq!(config.scale_percent(), "200%");
    }

    #[test]
    fn test_scaling_ultra_wide_keeps_text_size() {
        let config = ScalingCalculator::default().calculate_scaling(Size::new(2560, 1080));

        assert!(approx(config.scale_x, 2560.0 / 1920.0));
        assert_eq!(config.scale_y, 1.0);
        assert_eq!(config.uniform_scale, 1.0);
        assert_eq!(config.text_scale_factor, 1.0);
        assert_eq!(config.aspect_ratio_strategy, AspectRatioStrategy::Letterbox);
        assert!(!config.is_uniform());
    }

    #[test]
    fn test_scaling_native() {
        let config = ScalingCalculator::default().calculate_scaling(DESIGN_CANVAS);
        assert!(!config.requires_scaling());
        assert_eq!(config.base_resolution, DESIGN_CANVAS);
        assert_eq!(config.target_resolution, DESIGN_CANVAS);
    }

    #[test]
    fn test_text_scale_independent_of_uniform_scale() {
        // 4:3 projector: narrower than the canvas, uniform scale follows width
        let config = ScalingCalculator::default().calculate_scaling(Size::new(1024, 768));
        assert!(approx(config.uniform_scale, 1024.0 / 1920.0));
        assert!(approx(config.text_scale_factor, 768.0 / 1080.0));
        assert!(config.text_scale_factor > config.uniform_scale);
        assert_eq!(config.aspect_ratio_strategy, AspectRatioStrategy::Pillarbox);
    }

    #[test]
    fn test_scaling_zero_target() {
        let config = ScalingCalculator::default().calculate_scaling(Size::new(0, 0));
        assert_eq!(config.uniform_scale, 0.0);
        assert_eq!(config.aspect_ratio_strategy, AspectRatioStrategy::Stretch);
        assert_eq!(ScalingCalculator::default().scale_text_size(48.0, &config), 12.0);
    }

    #[test]
    fn test_empty_canvas_falls_back_to_design_canvas() {
        let calculator = ScalingCalculator::new(Size::new(0, 1080));
        assert_eq!(calculator.base(), DESIGN_CANVAS);
    }

    #[test]
    fn test_scaling_for_display_carries_dpi() {
        let display = DisplayDescriptor::new(DisplayId(1), Rect::new(0, 0, 1920, 1080))
            .with_scale_factor(2.0);
        let config = ScalingCalculator::default().calculate_scaling_for_display(&display);

        // Logical size drives the canvas mapping; the scale factor rides along
        assert_eq!(config.uniform_scale, 1.0);
        assert_eq!(config.dpi_scale, 2.0);
    }

    #[test]
    fn test_scale_text_size_floor() {
        let calculator = ScalingCalculator::default();
        let half = calculator.calculate_scaling(Size::new(960, 540));

        assert_eq!(calculator.scale_text_size(48.0, &half), 24.0);
        assert_eq!(calculator.scale_text_size(16.0, &half), 12.0);
        assert_eq!(calculator.scale_text_size(0.0, &half), 12.0);
        assert_eq!(calculator.scale_text_size(f64::NAN, &half), 12.0);
    }

    #[test]
    fn test_optimal_text_size() {
        let calculator = ScalingCalculator::default();
        let uhd = ResolutionCatalog::find_best_match(3840, 2160);
        let vga = ResolutionCatalog::find_best_match(640, 480);

        assert_eq!(calculator.calculate_optimal_text_size(20.0, &uhd, 1.0), 30.0);
        assert_eq!(calculator.calculate_optimal_text_size(20.0, &uhd, 2.0), 60.0);
        assert_eq!(calculator.calculate_optimal_text_size(20.0, &vga, 1.0), 15.0);
        // The optimal path has its own, lower floor
        assert_eq!(calculator.calculate_optimal_text_size(4.0, &vga, 1.0), 8.0);
    }

    #[test]
    fn test_custom_text_floors() {
        let calculator = ScalingCalculator::default().with_text_floors(10.0, f64::NAN);
        let config = calculator.calculate_scaling(Size::new(960, 540));
        let vga = ResolutionCatalog::find_best_match(640, 480);

        assert_eq!(calculator.scale_text_size(2.0, &config), 10.0);
        assert_eq!(calculator.calculate_optimal_text_size(1.0, &vga, 1.0), 8.0);
    }

    #[test]
    fn test_scale_element_is_non_uniform() {
        let config = ScalingCalculator::default().calculate_scaling(Size::new(2560, 1080));
        let element = ElementFrame::new(960.0, 540.0, 192.0, 108.0);
        let scaled = ScalingCalculator::scale_element(element, &config);

        assert!(approx(scaled.x, 1280.0));
        assert!(approx(scaled.width, 256.0));
        assert_eq!(scaled.y, 540.0);
        assert_eq!(scaled.height, 108.0);
    }

    #[test]
    fn test_classify_strategy() {
        assert_eq!(ScalingCalculator::classify_strategy(16.0 / 9.0), AspectRatioStrategy::Stretch);
        assert_eq!(ScalingCalculator::classify_strategy(16.0 / 10.0), AspectRatioStrategy::Pillarbox);
        assert_eq!(ScalingCalculator::classify_strategy(21.0 / 9.0), AspectRatioStrategy::Letterbox);
        assert_eq!(ScalingCalculator::classify_strategy(4.0 / 3.0), AspectRatioStrategy::Pillarbox);
        assert_eq!(ScalingCalculator::classify_strategy(1.85), AspectRatioStrategy::Stretch);
        assert_eq!(ScalingCalculator::classify_strategy(f64::NAN), AspectRatioStrategy::Stretch);
    }

    #[test]
    fn test_preview_size_fit_by_height() {
        let frame = ScalingCalculator::calculate_preview_size(800.0, 400.0, 16.0 / 9.0);

        assert!((frame.width - 711.11).abs() < 0.01);
        assert_eq!(frame.height, 400.0);
        assert!((frame.offset_x - 44.44).abs() < 0.01);
        assert_eq!(frame.offset_y, 0.0);
    }

    #[test]
    fn test_preview_size_fit_by_width() {
        let frame = ScalingCalculator::calculate_preview_size(400.0, 400.0, 16.0 / 9.0);

        assert_eq!(frame.width, 400.0);
        assert!(approx(frame.height, 225.0));
        assert_eq!(frame.offset_x, 0.0);
        assert!(approx(frame.offset_y, 87.5));
    }

    #[test]
    fn test_preview_size_degenerate() {
        assert_eq!(
            ScalingCalculator::calculate_preview_size(0.0, 400.0, 16.0 / 9.0),
            PreviewFrame::default()
        );

        // Invalid ratio falls back to the canvas ratio
        let frame = ScalingCalculator::calculate_preview_size(800.0, 400.0, 0.0);
        let expected = ScalingCalculator::calculate_preview_size(800.0, 400.0, 16.0 / 9.0);
        assert_eq!(frame, expected);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(AspectRatioStrategy::Letterbox.to_string(), "letterbox");
        assert_eq!(AspectRatioStrategy::Crop.to_string(), "crop");
        assert_eq!(AspectRatioStrategy::default(), AspectRatioStrategy::Stretch);
    }

    #[test]
    fn test_canvas_to_display_coordinates() {
        let calc = ScalingCalculator::default();
        let config = calc.calculate_scaling(Size::new(2560, 1080));

        assert_eq!(config.canvas_to_display(Point::new(960, 540)), Point::new(1280, 540));
        assert_eq!(config.display_to_canvas(Point::new(1280, 540)), Point::new(960, 540));

        let empty = calc.calculate_scaling(Size::new(0, 0));
        assert_eq!(empty.display_to_canvas(Point::new(10, 10)), Point::default());
    }
}
