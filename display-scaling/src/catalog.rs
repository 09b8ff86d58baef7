//! Known display resolutions and the rules for classifying arbitrary ones.
//!
//! Every physical display is mapped onto a coarse [`ResolutionCategory`] by pixel
//! count, and onto the closest [`Resolution`] entry of the static catalog. The
//! catalog is declared in a fixed order; that order breaks every tie.

use display_common::Size;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A display qualifies for a tier at 9/10 of the tier's reference pixel count.
const TIER_THRESHOLD_NUM: u128 = 9;
const TIER_THRESHOLD_DEN: u128 = 10;

/// Tolerance used when matching a ratio against the named aspect ratios.
pub const ASPECT_RATIO_TOLERANCE: f64 = 0.05;

/// Coarse quality tier of a display.
///
/// Variants are declared from lowest to highest so that the derived ordering
/// follows pixel count: `Legacy < Hd < FullHd < TwoK < FourK < EightK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ResolutionCategory {
    #[serde(rename = "legacy")]
    Legacy,
    #[serde(rename = "hd")]
    Hd,
    #[serde(rename = "1080p")]
    FullHd,
    #[serde(rename = "2k")]
    TwoK,
    #[serde(rename = "4k")]
    FourK,
    #[serde(rename = "8k")]
    EightK,
}

impl ResolutionCategory {
    /// All categories, highest tier first.
    pub const ALL: [ResolutionCategory; 6] = [
        Self::EightK,
        Self::FourK,
        Self::TwoK,
        Self::FullHd,
        Self::Hd,
        Self::Legacy,
    ];

    /// Reference resolution of the tier. `Legacy` has none.
    pub const fn reference_size(self) -> Option<Size> {
        match self {
            Self::EightK => Some(Size::new(7680, 4320)),
            Self::FourK => Some(Size::new(3840, 2160)),
            Self::TwoK => Some(Size::new(2560, 1440)),
            Self::FullHd => Some(Size::new(1920, 1080)),
            Self::Hd => Some(Size::new(1280, 720)),
            Self::Legacy => None,
        }
    }

    /// Reference pixel count of the tier (0 for `Legacy`).
    pub const fn reference_pixels(self) -> u64 {
        match self.reference_size() {
            Some(size) => size.area(),
            None => 0,
        }
    }

    /// Short lowercase name, as used in configuration and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EightK => "8k",
            Self::FourK => "4k",
            Self::TwoK => "2k",
            Self::FullHd => "1080p",
            Self::Hd => "hd",
            Self::Legacy => "legacy",
        }
    }
}

impl fmt::Display for ResolutionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown resolution category '{}'", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for ResolutionCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Named aspect ratio buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AspectRatioType {
    #[serde(rename = "16:9")]
    Ratio16x9,
    #[serde(rename = "21:9")]
    Ratio21x9,
    #[serde(rename = "32:9")]
    Ratio32x9,
    #[serde(rename = "16:10")]
    Ratio16x10,
    #[serde(rename = "4:3")]
    Ratio4x3,
    #[serde(rename = "5:4")]
    Ratio5x4,
    /// Matches no named ratio (portrait panels, unusual modes).
    #[serde(rename = "other")]
    Other,
}

impl AspectRatioType {
    /// Named buckets in matching order.
    pub const NAMED: [AspectRatioType; 6] = [
        Self::Ratio16x9,
        Self::Ratio21x9,
        Self::Ratio32x9,
        Self::Ratio16x10,
        Self::Ratio4x3,
        Self::Ratio5x4,
    ];

    /// The widest named bucket; anything wider falls into it.
    pub const WIDEST: AspectRatioType = Self::Ratio32x9;

    /// Numeric ratio of the bucket.
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Ratio16x9 => Some(16.0 / 9.0),
            Self::Ratio21x9 => Some(21.0 / 9.0),
            Self::Ratio32x9 => Some(32.0 / 9.0),
            Self::Ratio16x10 => Some(16.0 / 10.0),
            Self::Ratio4x3 => Some(4.0 / 3.0),
            Self::Ratio5x4 => Some(5.0 / 4.0),
            Self::Other => None,
        }
    }

    /// True for the 21:9 and 32:9 buckets.
    pub fn is_ultra_wide(self) -> bool {
        matches!(self, Self::Ratio21x9 | Self::Ratio32x9)
    }
}

/// True when a ratio is at least as wide as the lower edge of the 21:9 bucket.
///
/// Marketing "21:9" panels are 43:18 (3440x1440) or 12:5 (3840x1600), which
/// sit outside the bucket tolerance but are ultra-wide all the same.
pub fn is_ultra_wide_ratio(ratio: f64) -> bool {
    ratio >= 21.0 / 9.0 - ASPECT_RATIO_TOLERANCE
}

impl fmt::Display for AspectRatioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ratio16x9 => "16:9",
            Self::Ratio21x9 => "21:9",
            Self::Ratio32x9 => "32:9",
            Self::Ratio16x10 => "16:10",
            Self::Ratio4x3 => "4:3",
            Self::Ratio5x4 => "5:4",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

/// A catalog resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
    /// Always `width / height`.
    pub aspect_ratio: f64,
    pub category: ResolutionCategory,
    /// Technical name ("UWQHD").
    pub name: &'static str,
    /// Marketing name ("1440p Ultrawide").
    pub common_name: &'static str,
}

impl Resolution {
    fn entry(
        width: u32,
        height: u32,
        category: ResolutionCategory,
        name: &'static str,
        common_name: &'static str,
    ) -> Self {
        Self {
            width,
            height,
            aspect_ratio: Size::new(width, height).aspect_ratio(),
            category,
            name,
            common_name,
        }
    }

    /// Dimensions as a [`Size`].
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Total pixel count.
    pub const fn pixel_count(&self) -> u64 {
        self.size().area()
    }

    /// Named aspect ratio bucket of this resolution.
    pub fn aspect_ratio_type(&self) -> AspectRatioType {
        ResolutionCatalog::classify_aspect_ratio(self.aspect_ratio)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {} ({}, {})",
            self.width, self.height, self.name, self.common_name, self.category
        )
    }
}

static CATALOG: Lazy<Vec<Resolution>> = Lazy::new(|| {
    use ResolutionCategory::*;
    vec![
        Resolution::entry(7680, 4320, EightK, "8K UHD", "8K"),
        Resolution::entry(3840, 2160, FourK, "4K UHD", "4K"),
        Resolution::entry(4096, 2160, FourK, "DCI 4K", "Cinema 4K"),
        Resolution::entry(5120, 2880, FourK, "5K", "5K"),
        Resolution::entry(5120, 2160, FourK, "5K2K", "4K Ultrawide"),
        Resolution::entry(2560, 1440, TwoK, "QHD", "1440p"),
        Resolution::entry(2560, 1600, TwoK, "WQXGA", "1600p"),
        Resolution::entry(3440, 1440, TwoK, "UWQHD", "1440p Ultrawide"),
        Resolution::entry(5120, 1440, TwoK, "DQHD", "Super Ultrawide"),
        Resolution::entry(1920, 1080, FullHd, "FHD", "1080p"),
        Resolution::entry(1920, 1200, FullHd, "WUXGA", "1200p"),
        Resolution::entry(2560, 1080, FullHd, "UW-FHD", "1080p Ultrawide"),
        Resolution::entry(1280, 720, Hd, "HD", "720p"),
        Resolution::entry(1366, 768, Hd, "WXGA", "768p"),
        Resolution::entry(1280, 800, Hd, "WXGA", "800p"),
        Resolution::entry(1600, 900, Hd, "HD+", "900p"),
        Resolution::entry(1440, 900, Hd, "WXGA+", "900p Wide"),
        Resolution::entry(1680, 1050, Hd, "WSXGA+", "1050p"),
        Resolution::entry(1280, 1024, Hd, "SXGA", "1024p"),
        Resolution::entry(1024, 768, Legacy, "XGA", "XGA Projector"),
        Resolution::entry(800, 600, Legacy, "SVGA", "SVGA Projector"),
        Resolution::entry(640, 480, Legacy, "VGA", "VGA"),
    ]
});

/// Static table of known resolutions and the classification rules over it.
pub struct ResolutionCatalog;

impl ResolutionCatalog {
    /// All catalog entries in declaration order.
    pub fn entries() -> &'static [Resolution] {
        &CATALOG
    }

    /// Entries of a single category, in declaration order.
    pub fn by_category(category: ResolutionCategory) -> impl Iterator<Item = &'static Resolution> {
        CATALOG.iter().filter(move |r| r.category == category)
    }

    /// Exact `(width, height)` lookup.
    pub fn find_exact(width: u32, height: u32) -> Option<&'static Resolution> {
        CATALOG
            .iter()
            .find(|r| r.width == width && r.height == height)
    }

    /// Classify a display into a tier by pixel count.
    ///
    /// Tiers are checked from highest to lowest; the first tier whose threshold
    /// (9/10 of its reference pixel count, inclusive) is met wins.
    pub fn classify(width: u32, height: u32) -> ResolutionCategory {
        let pixels = width as u128 * height as u128;

        ResolutionCategory::ALL
            .into_iter()
            .filter(|category| *category != ResolutionCategory::Legacy)
            .find(|category| {
                pixels * TIER_THRESHOLD_DEN
                    >= category.reference_pixels() as u128 * TIER_THRESHOLD_NUM
            })
            .unwrap_or(ResolutionCategory::Legacy)
    }

    /// Find the catalog entry that best describes a display.
    ///
    /// Exact match first, then the entry of the same category with the closest
    /// aspect ratio, then the entry with the closest pixel count overall.
    pub fn find_best_match(width: u32, height: u32) -> Resolution {
        if let Some(exact) = Self::find_exact(width, height) {
            return *exact;
        }

        let category = Self::classify(width, height);
        let ratio = Size::new(width, height).aspect_ratio();

        let same_category = Self::by_category(category).min_by(|a, b| {
            (a.aspect_ratio - ratio)
                .abs()
                .total_cmp(&(b.aspect_ratio - ratio).abs())
        });
        if let Some(found) = same_category {
            return *found;
        }

        let pixels = width as u64 * height as u64;
        CATALOG
            .iter()
            .min_by_key(|r| r.pixel_count().abs_diff(pixels))
            .copied()
            .unwrap_or_else(|| {
                Resolution::entry(1920, 1080, ResolutionCategory::FullHd, "FHD", "1080p")
            })
    }

    /// Map a ratio onto the nearest named aspect ratio.
    ///
    /// Ratios within [`ASPECT_RATIO_TOLERANCE`] of a named ratio take that bucket;
    /// ratios wider than the widest bucket fall into it; anything else is `Other`.
    pub fn classify_aspect_ratio(ratio: f64) -> AspectRatioType {
        if ratio.is_nan() || ratio <= 0.0 {
            return AspectRatioType::Other;
        }

        let nearest = AspectRatioType::NAMED
            .into_iter()
            .filter_map(|bucket| bucket.value().map(|value| (bucket, (value - ratio).abs())))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match nearest {
            Some((bucket, distance)) if distance <= ASPECT_RATIO_TOLERANCE => bucket,
            _ => {
                let widest = AspectRatioType::WIDEST.value().unwrap_or(f64::INFINITY);
                if ratio > widest {
                    AspectRatioType::WIDEST
                } else {
                    AspectRatioType::Other
                }
            }
        }
    }
}
