//! Phenomenon labels and their bijective color mapping.
//!
//! Labels are recovered from rendered line colors, so the label->color map
//! must stay bijective for the whole session. The mapping is built once at
//! startup and kept immutable afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Qualitative palette used to color annotations (one color per label).
pub const LIGHT24_PALETTE: [&str; 24] = [
    "#FD3216", "#00FE35", "#6A76FC", "#FED4C4", "#FE00CE", "#0DF9FF", "#F6F926", "#FF9616",
    "#479B55", "#EEA6FB", "#DC587D", "#D626FF", "#6E899C", "#00B5F7", "#B68E00", "#C9FBE5",
    "#FF0092", "#22FFA7", "#E3EE9E", "#86CE00", "#BC7196", "#7E7DCD", "#FC6955", "#E48F72",
];

/// Built-in convective storm-top phenomena, in display order.
pub const DEFAULT_PHENOMENA: [&str; 4] = [
    "Overshooting top",
    "Above anvil plume",
    "Cold U/V",
    "Cold ring",
];

#[derive(thiserror::Error, Debug)]
pub enum LabelError {
    #[error("label set must not be empty")]
    Empty,

    #[error("duplicate label {0:?}")]
    Duplicate(String),

    #[error("too many labels for a bijective palette ({got} labels, {palette} colors)")]
    PaletteExhausted { got: usize, palette: usize },

    #[error("unknown label {0:?}")]
    Unknown(String),
}

/// Ordered label set with a bijective label<->color mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSet {
    labels: Vec<String>,
    color_by_label: HashMap<String, String>,
    label_by_color: HashMap<String, String>,
}

impl LabelSet {
    /// Build a label set, assigning palette colors in label order.
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Result<Self, LabelError> {
        if labels.is_empty() {
            return Err(LabelError::Empty);
        }
        if labels.len() > LIGHT24_PALETTE.len() {
            return Err(LabelError::PaletteExhausted {
                got: labels.len(),
                palette: LIGHT24_PALETTE.len(),
            });
        }
        let mut seen: Vec<&str> = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.as_ref();
            if seen.contains(&label) {
                return Err(LabelError::Duplicate(label.to_string()));
            }
            seen.push(label);
        }
        Ok(Self::build(
            labels.iter().map(|l| l.as_ref().to_string()).collect(),
        ))
    }

    /// The built-in phenomenon list colored from [`LIGHT24_PALETTE`].
    pub fn default_phenomena() -> Self {
        Self::build(DEFAULT_PHENOMENA.iter().map(|l| l.to_string()).collect())
    }

    fn build(labels: Vec<String>) -> Self {
        let mut color_by_label = HashMap::with_capacity(labels.len());
        let mut label_by_color = HashMap::with_capacity(labels.len());
        for (n, label) in labels.iter().enumerate() {
            let color = LIGHT24_PALETTE[n % LIGHT24_PALETTE.len()];
            color_by_label.insert(label.clone(), color.to_string());
            label_by_color.insert(color.to_string(), label.clone());
        }
        Self {
            labels,
            color_by_label,
            label_by_color,
        }
    }

    /// Labels in display order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The label preselected at session start (first in display order).
    pub fn default_label(&self) -> &str {
        &self.labels[0]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.color_by_label.contains_key(label)
    }

    /// Line color assigned to `label`.
    pub fn color_for(&self, label: &str) -> Option<&str> {
        self.color_by_label.get(label).map(String::as_str)
    }

    /// Recover the label from a rendered line color.
    pub fn label_for_color(&self, color: &str) -> Option<&str> {
        self.label_by_color.get(color).map(String::as_str)
    }
}
