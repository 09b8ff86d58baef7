//! Human-readable and JSON output.

use anyhow::Result;
use display_common::Size;
use display_manager::{DisplayResolutionInfo, StoreState};
use display_scaling::{
    AspectRatioType, DpiConfig, Resolution, ResolutionCatalog, ResolutionProfile,
    ResolutionProfileTable, ScalingCalculator, ScalingConfiguration,
};
use serde::Serialize;

/// Classification of a single panel size.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyReport {
    pub native: Size,
    pub scale_factor: f64,
    pub resolution: Resolution,
    pub aspect_ratio_type: AspectRatioType,
    pub profile: ResolutionProfile,
    pub scaling: ScalingConfiguration,
    pub projection_text_px: f64,
    pub optimal_text_px: f64,
}

impl ClassifyReport {
    pub fn new(
        calculator: &ScalingCalculator,
        native: Size,
        scale_factor: f64,
        text_size: f64,
    ) -> Self {
        let resolution = ResolutionCatalog::find_best_match(native.width, native.height);
        let dpi = DpiConfig::from_scale_factor(scale_factor);
        let mut scaling = calculator.calculate_scaling(dpi.physical_size_to_logical(native));
        scaling.dpi_scale = dpi.scale_factor;

        Self {
            native,
            scale_factor,
            resolution,
            aspect_ratio_type: ResolutionCatalog::classify_aspect_ratio(native.aspect_ratio()),
            profile: *ResolutionProfileTable::profile(resolution.category),
            projection_text_px: calculator.scale_text_size(text_size, &scaling),
            optimal_text_px: calculator.calculate_optimal_text_size(
                text_size,
                &resolution,
                scale_factor,
            ),
            scaling,
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_classify(report: &ClassifyReport, text_size: f64) {
    let resolution = &report.resolution;
    println!(
        "{} @{:.2}x -> {} ({}) [{}]",
        report.native, report.scale_factor, resolution.name, resolution.common_name, resolution.category
    );
    println!(
        "  aspect ratio: {} ({:.3})",
        report.aspect_ratio_type,
        report.native.aspect_ratio()
    );
    print_profile(&report.profile);
    print_scaling(&report.scaling);
    println!(
        "  text {}px: projection {:.1}px, optimal {:.1}px",
        text_size, report.projection_text_px, report.optimal_text_px
    );
}

fn print_profile(profile: &ResolutionProfile) {
    let settings = &profile.recommended_settings;
    println!(
        "  profile: text x{:.2}, canvas x{:.3}, performance {}, background {}, pipeline {}{}",
        profile.text_scale,
        profile.canvas_scale,
        profile.performance_level,
        settings.background_quality,
        settings.rendering_pipeline,
        if settings.enable_optimizations { ", optimized" } else { "" }
    );
}

fn print_scaling(scaling: &ScalingConfiguration) {
    println!(
        "  scaling from {}: {} (x {:.3}, y {:.3}), strategy {}",
        scaling.base_resolution,
        scaling.scale_percent(),
        scaling.scale_x,
        scaling.scale_y,
        scaling.aspect_ratio_strategy
    );
}

fn print_display(info: &DisplayResolutionInfo, marker: &str) {
    println!("{}{}", marker, info.display);
    println!(
        "    {} ({}) [{}], {}{}{}",
        info.resolution.name,
        info.resolution.common_name,
        info.resolution.category,
        info.aspect_ratio_type,
        if info.is_ultra_wide { ", ultra-wide" } else { "" },
        if info.is_high_dpi { ", high-DPI" } else { "" }
    );
    print_scaling(&info.scaling);
}

pub fn print_store(state: &StoreState, text_size: f64, sizes: &[(&str, f64)]) {
    println!("Phase: {}", state.phase);
    if let Some(error) = &state.error {
        println!("Error: {}", error);
    }

    if state.available_displays.is_empty() {
        println!("No displays attached");
    }
    let current = state.current_resolution.as_ref().map(DisplayResolutionInfo::id);
    for info in &state.available_displays {
        let marker = if Some(info.id()) == current { "* " } else { "  " };
        print_display(info, marker);
    }

    println!(
        "Background quality: {} (high quality: {})",
        state.recommended_background_quality, state.supports_high_quality
    );
    for (context, size) in sizes {
        println!("Text {}px in {}: {:.1}px", text_size, context, size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use display_scaling::ResolutionCategory;

    #[test]
    fn test_classify_report_4k_at_2x() {
        let report =
            ClassifyReport::new(&ScalingCalculator::default(), Size::new(3840, 2160), 2.0, 24.0);

        assert_eq!(report.resolution.category, ResolutionCategory::FourK);
        assert_eq!(report.scaling.target_resolution, Size::new(1920, 1080));
        assert_eq!(report.scaling.dpi_scale, 2.0);
        assert_eq!(report.projection_text_px, 24.0);
        assert_eq!(report.optimal_text_px, 72.0);
    }

    #[test]
    fn test_classify_report_small_panel_hits_floor() {
        let report =
            ClassifyReport::new(&ScalingCalculator::default(), Size::new(800, 600), 1.0, 12.0);

        assert_eq!(report.resolution.category, ResolutionCategory::Legacy);
        assert_eq!(report.aspect_ratio_type, AspectRatioType::Ratio4x3);
        assert_eq!(report.projection_text_px, 12.0);
        assert_eq!(report.optimal_text_px, 9.0);
    }
}
