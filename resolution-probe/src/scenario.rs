//! Display scenario files.
//!
//! A scenario describes a desk of attached displays in TOML:
//!
//! ```toml
//! projection = 2
//!
//! [[display]]
//! id = 1
//! name = "Built-in"
//! width = 1440
//! height = 900
//! scale_factor = 2.0
//! primary = true
//!
//! [[display]]
//! id = 2
//! x = 1440
//! width = 1920
//! height = 1080
//! ```

use anyhow::{bail, Context, Result};
use display_common::Rect;
use display_manager::SimulatedDisplayHost;
use display_scaling::{DisplayDescriptor, DisplayId};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioDisplay {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    #[serde(default)]
    pub primary: bool,
}

fn default_scale_factor() -> f64 {
    1.0
}

impl ScenarioDisplay {
    pub fn to_descriptor(&self) -> DisplayDescriptor {
        let mut display = DisplayDescriptor::new(
            DisplayId(self.id),
            Rect::new(self.x, self.y, self.width, self.height),
        )
        .with_scale_factor(self.scale_factor);
        if let Some(name) = &self.name {
            display = display.with_name(name.clone());
        }
        if self.primary {
            display = display.primary();
        }
        display
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    /// Display the host reports as projecting at startup.
    #[serde(default)]
    pub projection: Option<u64>,
    #[serde(default, rename = "display")]
    pub displays: Vec<ScenarioDisplay>,
}

impl Scenario {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(text).context("Invalid scenario file")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for display in &self.displays {
            if !seen.insert(display.id) {
                bail!("Duplicate display id {}", display.id);
            }
        }
        if let Some(id) = self.projection {
            if !seen.contains(&id) {
                bail!("Projection display {} is not listed", id);
            }
        }
        Ok(())
    }

    pub fn descriptors(&self) -> Vec<DisplayDescriptor> {
        self.displays.iter().map(ScenarioDisplay::to_descriptor).collect()
    }

    /// A simulated host preloaded with this scenario.
    pub fn host(&self) -> SimulatedDisplayHost {
        let host = SimulatedDisplayHost::new(self.descriptors());
        match self.projection {
            Some(id) => host.with_projection(DisplayId(id)),
            None => host,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STUDIO: &str = r#"
        projection = 2

        [[display]]
        id = 1
        name = "Built-in"
        width = 1440
        height = 900
        scale_factor = 2.0
        primary = true

        [[display]]
        id = 2
        x = 1440
        width = 1920
        height = 1080
    "#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_toml_str(STUDIO).unwrap();
        assert_eq!(scenario.projection, Some(2));
        assert_eq!(scenario.displays.len(), 2);

        let descriptors = scenario.descriptors();
        assert_eq!(descriptors[0].label(), "Built-in");
        assert!(descriptors[0].is_primary);
        assert_eq!(descriptors[0].scale_factor, 2.0);
        assert_eq!(descriptors[1].bounds, Rect::new(1440, 0, 1920, 1080));
        assert_eq!(descriptors[1].scale_factor, 1.0);
    }

    #[test]
    fn test_empty_scenario() {
        let scenario = Scenario::from_toml_str("").unwrap();
        assert!(scenario.displays.is_empty());
        assert_eq!(scenario.projection, None);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let text = "[[display]]\nid = 1\nwidth = 10\nheight = 10\n[[display]]\nid = 1\nwidth = 10\nheight = 10\n";
        assert!(Scenario::from_toml_str(text).is_err());
    }

    #[test]
    fn test_unknown_projection_rejected() {
        let text = "projection = 5\n[[display]]\nid = 1\nwidth = 10\nheight = 10\n";
        assert!(Scenario::from_toml_str(text).is_err());
    }
}
