//! Explorer Configuration
//!
//! All tunables of the core live in [`ExplorerConfig`]. The struct is plain
//! serde data: every section has defaults, so an empty JSON object (`{}`)
//! yields the stock configuration and callers only override the sections
//! they need. A [`FactorRange`] is always given as a whole.
//!
//! ```rust
//! use explorer_core::ExplorerConfig;
//!
//! let config = ExplorerConfig::from_json_str(
//!     r#"{ "zoom": { "default": 2.0, "min": 1.1, "max": 4.0, "step": 0.1 } }"#,
//! ).unwrap();
//! assert_eq!(config.zoom.max, 4.0);
//! assert_eq!(config.drag.flush_debounce_ms, 200);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bounds and step of an adjustable factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorRange {
    pub default: f64,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl FactorRange {
    pub const fn new(default: f64, min: f64, max: f64, step: f64) -> Self {
        Self { default, min, max, step }
    }

    /// Clamp `value` into `[min, max]`.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    /// Apply one wheel step in the direction of `delta` and clamp.
    ///
    /// The result is rounded to two decimals so repeated steps do not
    /// accumulate floating point drift.
    pub fn step_towards(&self, current: f64, delta: f64) -> f64 {
        let next = if delta > 0.0 {
            current + self.step
        } else {
            current - self.step
        };
        self.clamp(round_to(next, 2))
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !(self.min <= self.default && self.default <= self.max) {
            return Err(Error::Config(format!(
                "{name}: expected min <= default <= max, got {} <= {} <= {}",
                self.min, self.default, self.max
            )));
        }
        if self.step <= 0.0 {
            return Err(Error::Config(format!("{name}: step must be positive")));
        }
        Ok(())
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Modifier + wheel scaling of labels and node sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScaleConfig {
    pub label: FactorRange,
    pub node_size: FactorRange,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            label: FactorRange::new(1.0, 0.2, 5.0, 0.1),
            node_size: FactorRange::new(1.0, 0.1, 5.0, 0.1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelConfig {
    pub node_label_size: f64,
    pub relation_label_size: f64,
    /// Above this many nodes in the viewport all labels are hidden.
    pub hide_all_threshold: usize,
    /// Inner spacing between a node's border and its label box, in px.
    pub box_spacing: f64,
    pub line_height_ratio: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            node_label_size: 6.0,
            relation_label_size: 6.0,
            hide_all_threshold: 1000,
            box_spacing: 2.0,
            line_height_ratio: 1.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeStyleConfig {
    pub color: String,
    pub size: f64,
    pub scale_factor: f64,
    pub border_color: String,
    pub border_width: f64,
    pub label_color: String,
}

impl Default for NodeStyleConfig {
    fn default() -> Self {
        Self {
            color: "gray".into(),
            size: 50.0,
            scale_factor: 0.5,
            border_color: "#000000".into(),
            border_width: 5.0,
            label_color: "#000000".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelationStyleConfig {
    pub color: String,
    pub size: f64,
    pub scale_factor: f64,
    pub selected_color: String,
}

impl Default for RelationStyleConfig {
    fn default() -> Self {
        Self {
            color: "#cccccc".into(),
            size: 2.0,
            scale_factor: 0.5,
            selected_color: "#ec0016".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraConfig {
    pub min_ratio: f64,
    pub max_ratio: f64,
    /// Lower bound of the ratio used when fitting nodes into the viewport.
    pub fit_min_ratio: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_ratio: 0.01,
            max_ratio: 100.0,
            fit_min_ratio: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DragConfig {
    pub flush_debounce_ms: u64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self { flush_debounce_ms: 200 }
    }
}

impl DragConfig {
    pub fn flush_debounce(&self) -> Duration {
        Duration::from_millis(self.flush_debounce_ms)
    }
}

/// Top-level configuration of the explorer core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExplorerConfig {
    /// Camera zoom factor: the ratio applied per plain wheel notch.
    pub zoom: FactorRange,
    pub scale: ScaleConfig,
    pub labels: LabelConfig,
    pub nodes: NodeStyleConfig,
    pub relations: RelationStyleConfig,
    pub camera: CameraConfig,
    pub drag: DragConfig,
    /// Fetch relations between search-result nodes automatically.
    pub autoconnect: bool,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            zoom: FactorRange::new(2.0, 1.1, 3.0, 0.1),
            scale: ScaleConfig::default(),
            labels: LabelConfig::default(),
            nodes: NodeStyleConfig::default(),
            relations: RelationStyleConfig::default(),
            camera: CameraConfig::default(),
            drag: DragConfig::default(),
            autoconnect: true,
        }
    }
}

impl ExplorerConfig {
    /// Parse a JSON configuration document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.zoom.validate("zoom")?;
        self.scale.label.validate("scale.label")?;
        self.scale.node_size.validate("scale.nodeSize")?;

        if self.camera.min_ratio <= 0.0 || self.camera.min_ratio > self.camera.max_ratio {
            return Err(Error::Config(
                "camera: expected 0 < minRatio <= maxRatio".into(),
            ));
        }
        if self.labels.line_height_ratio <= 0.0 {
            return Err(Error::Config("labels.lineHeightRatio must be positive".into()));
        }
        Ok(())
    }
}
