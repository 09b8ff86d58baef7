//! Host-supplied display descriptions.
//!
//! A [`DisplayDescriptor`] is what the host bridge reports for each attached
//! display. Bounds are in logical (scale-independent) pixels; the native panel
//! resolution is the bounds multiplied by the scale factor.

use crate::DpiConfig;
use display_common::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Host-assigned display identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(pub u64);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DisplayId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Information about one attached display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayDescriptor {
    pub id: DisplayId,
    /// Display name (if the host reports one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Position and size in the desktop coordinate system (logical pixels)
    pub bounds: Rect,
    /// Bounds minus taskbars, docks and menu bars
    pub work_area: Rect,
    /// OS scale factor for this display
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    #[serde(default)]
    pub is_primary: bool,
}

fn default_scale_factor() -> f64 {
    1.0
}

impl DisplayDescriptor {
    /// Create a descriptor whose work area equals its bounds.
    pub fn new(id: impl Into<DisplayId>, bounds: Rect) -> Self {
        Self {
            id: id.into(),
            name: None,
            bounds,
            work_area: bounds,
            scale_factor: 1.0,
            is_primary: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_work_area(mut self, work_area: Rect) -> Self {
        self.work_area = work_area;
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Scale factor, with non-positive or non-finite values treated as 1.0.
    pub fn effective_scale_factor(&self) -> f64 {
        if self.scale_factor.is_finite() && self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            1.0
        }
    }

    /// Size in logical pixels; this is what a full-screen window measures.
    pub fn logical_size(&self) -> Size {
        self.bounds.size()
    }

    /// Native panel resolution (logical size times the scale factor).
    pub fn native_size(&self) -> Size {
        self.dpi_config().logical_size_to_physical(self.logical_size())
    }

    /// DPI configuration derived from the scale factor.
    pub fn dpi_config(&self) -> DpiConfig {
        DpiConfig::from_scale_factor(self.effective_scale_factor())
    }

    /// Check if a desktop point is on this display
    pub fn contains_point(&self, point: Point) -> bool {
        self.bounds.contains_point(point.x, point.y)
    }

    /// Human-readable name, falling back to the id.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Display {}", self.id),
        }
    }
}

impl fmt::Display for DisplayDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let native = self.native_size();
        write!(
            f,
            "{} [{}] {}x{} @{:.2}x ({}){}",
            self.label(),
            self.id,
            self.bounds.width,
            self.bounds.height,
            self.effective_scale_factor(),
            native,
            if self.is_primary { " [PRIMARY]" } else { "" }
        )
    }
}
