//! Per-category quality and performance defaults.
//!
//! Profiles are static descriptive data. Lookup is total: every
//! [`ResolutionCategory`] has exactly one profile.

use crate::catalog::ResolutionCategory;
use serde::Serialize;
use std::fmt;

/// Expected rendering load class of a display tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceLevel {
    Low,
    Medium,
    High,
    Ultra,
}

impl fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Ultra => write!(f, "ultra"),
        }
    }
}

/// Media quality tier for slide backgrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundQuality {
    Low,
    Medium,
    High,
    Ultra,
}

impl BackgroundQuality {
    /// True for the tiers that load full-resolution media.
    pub fn is_high_quality(self) -> bool {
        self >= Self::High
    }
}

impl Default for BackgroundQuality {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for BackgroundQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Ultra => write!(f, "ultra"),
        }
    }
}

/// Advisory rendering pipeline hint. Nothing enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderingPipeline {
    Gpu,
    Hybrid,
    Software,
}

impl fmt::Display for RenderingPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu => write!(f, "gpu"),
            Self::Hybrid => write!(f, "hybrid"),
            Self::Software => write!(f, "software"),
        }
    }
}

/// Recommended renderer settings for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedSettings {
    pub background_quality: BackgroundQuality,
    pub rendering_pipeline: RenderingPipeline,
    pub enable_optimizations: bool,
}

/// Immutable defaults for one resolution category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionProfile {
    /// Multiplier for the profile-based text sizing path.
    pub text_scale: f64,
    pub performance_level: PerformanceLevel,
    /// Canvas scale of the tier's reference size relative to 1080p.
    pub canvas_scale: f64,
    /// OS scale factors this tier is commonly driven at.
    pub dpi_support: &'static [f64],
    pub recommended_settings: RecommendedSettings,
}

static EIGHT_K: ResolutionProfile = ResolutionProfile {
    text_scale: 2.0,
    performance_level: PerformanceLevel::Ultra,
    canvas_scale: 4.0,
    dpi_support: &[1.0, 1.5, 2.0, 3.0, 4.0],
    recommended_settings: RecommendedSettings {
        background_quality: BackgroundQuality::Ultra,
        rendering_pipeline: RenderingPipeline::Gpu,
        enable_optimizations: true,
    },
};

static FOUR_K: ResolutionProfile = ResolutionProfile {
    text_scale: 1.5,
    performance_level: PerformanceLevel::High,
    canvas_scale: 2.0,
    dpi_support: &[1.0, 1.5, 2.0],
    recommended_settings: RecommendedSettings {
        background_quality: BackgroundQuality::Ultra,
        rendering_pipeline: RenderingPipeline::Gpu,
        enable_optimizations: true,
    },
};

static TWO_K: ResolutionProfile = ResolutionProfile {
    text_scale: 1.25,
    performance_level: PerformanceLevel::High,
    canvas_scale: 1.333,
    dpi_support: &[1.0, 1.25, 1.5],
    recommended_settings: RecommendedSettings {
        background_quality: BackgroundQuality::High,
        rendering_pipeline: RenderingPipeline::Gpu,
        enable_optimizations: false,
    },
};

static FULL_HD: ResolutionProfile = ResolutionProfile {
    text_scale: 1.0,
    performance_level: PerformanceLevel::Medium,
    canvas_scale: 1.0,
    dpi_support: &[1.0, 1.25],
    recommended_settings: RecommendedSettings {
        background_quality: BackgroundQuality::High,
        rendering_pipeline: RenderingPipeline::Hybrid,
        enable_optimizations: false,
    },
};

static HD: ResolutionProfile = ResolutionProfile {
    text_scale: 0.85,
    performance_level: PerformanceLevel::Medium,
    canvas_scale: 0.667,
    dpi_support: &[1.0],
    recommended_settings: RecommendedSettings {
        background_quality: BackgroundQuality::Medium,
        rendering_pipeline: RenderingPipeline::Hybrid,
        enable_optimizations: true,
    },
};

static LEGACY: ResolutionProfile = ResolutionProfile {
    text_scale: 0.75,
    performance_level: PerformanceLevel::Low,
    canvas_scale: 0.533,
    dpi_support: &[1.0],
    recommended_settings: RecommendedSettings {
        background_quality: BackgroundQuality::Low,
        rendering_pipeline: RenderingPipeline::Software,
        enable_optimizations: true,
    },
};

/// Static `category -> profile` table.
pub struct ResolutionProfileTable;

impl ResolutionProfileTable {
    /// Profile for a category. Never fails.
    pub fn profile(category: ResolutionCategory) -> &'static ResolutionProfile {
        match category {
            ResolutionCategory::EightK => &EIGHT_K,
            ResolutionCategory::FourK => &FOUR_K,
            ResolutionCategory::TwoK => &TWO_K,
            ResolutionCategory::FullHd => &FULL_HD,
            ResolutionCategory::Hd => &HD,
            ResolutionCategory::Legacy => &LEGACY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_a_profile() {
        for category in ResolutionCategory::ALL {
            let profile = ResolutionProfileTable::profile(category);
            assert!(profile.text_scale > 0.0);
            assert!(!profile.dpi_support.is_empty());
        }
    }

    #[test]
    fn test_profiles_are_monotonic_in_tier() {
        let mut previous: Option<&ResolutionProfile> = None;
        for category in ResolutionCategory::ALL {
            let profile = ResolutionProfileTable::profile(category);
            if let Some(higher) = previous {
                assert!(higher.text_scale >= profile.text_scale);
                assert!(higher.canvas_scale >= profile.canvas_scale);
                assert!(higher.performance_level >= profile.performance_level);
            }
            previous = Some(profile);
        }
    }

    #[test]
    fn test_full_hd_is_the_neutral_profile() {
        let profile = ResolutionProfileTable::profile(ResolutionCategory::FullHd);
        assert_eq!(profile.text_scale, 1.0);
        assert_eq!(profile.canvas_scale, 1.0);
    }

    #[test]
    fn test_background_quality() {
        assert_eq!(BackgroundQuality::default(), BackgroundQuality::Medium);
        assert!(BackgroundQuality::Ultra.is_high_quality());
        assert!(BackgroundQuality::High.is_high_quality());
        assert!(!BackgroundQuality::Medium.is_high_quality());
        assert_eq!(BackgroundQuality::Low.to_string(), "low");
    }

    #[test]
    fn test_lookup_returns_same_instance() {
        let a = ResolutionProfileTable::profile(ResolutionCategory::FourK);
        let b = ResolutionProfileTable::profile(ResolutionCategory::FourK);
        assert!(std::ptr::eq(a, b));
    }
}
