//! # display-scaling: Resolution-aware scaling for presentation displays
//!
//! Slides are authored on a fixed 1920x1080 design canvas and shown on whatever
//! the venue provides: projectors, TVs, 4K/8K monitors, ultrawide panels. This
//! crate contains the pure half of the display engine:
//!
//! - **Classification**: map any resolution to a quality tier and a catalog entry
//! - **Profiles**: static per-tier text scale, performance and quality hints
//! - **Scaling**: canvas-to-display factors, text sizing, preview fitting
//! - **Displays**: host-reported display descriptors and DPI handling
//!
//! Nothing here holds state or fails; live display tracking lives in
//! `display-manager`.
//!
//! ## Example
//!
//! ```rust
//! use display_common::Size;
//! use display_scaling::{ResolutionCatalog, ResolutionCategory, ScalingCalculator};
//!
//! let category = ResolutionCatalog::classify(3840, 2160);
//! assert_eq!(category, ResolutionCategory::FourK);
//!
//! let calculator = ScalingCalculator::default();
//! let config = calculator.calculate_scaling(Size::new(3840, 2160));
//! assert_eq!(config.uniform_scale, 2.0);
//! assert_eq!(calculator.scale_text_size(24.0, &config), 48.0);
//! ```

mod catalog;
mod display;
mod profile;
mod scaling;

pub use catalog::{
    is_ultra_wide_ratio, AspectRatioType, Resolution, ResolutionCatalog, ResolutionCategory,
    UnknownCategory, ASPECT_RATIO_TOLERANCE,
};
pub use display::{DisplayDescriptor, DisplayId};
pub use profile::{
    BackgroundQuality, PerformanceLevel, RecommendedSettings, RenderingPipeline,
    ResolutionProfile, ResolutionProfileTable,
};
pub use scaling::{
    AspectRatioStrategy, DpiConfig, ElementFrame, PreviewFrame, ScalingCalculator,
    ScalingConfiguration, DEFAULT_HIGH_DPI_THRESHOLD, DESIGN_CANVAS, MIN_OPTIMAL_TEXT_PX,
    MIN_SCALED_TEXT_PX, STRATEGY_TOLERANCE,
};
