use crate::error::CoreError;
use crate::{NodeId, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Labels longer than this are truncated on input.
pub const MAX_LABEL_LEN: usize = 120;

pub const DEFAULT_NODE_WIDTH: f64 = 160.0;
pub const DEFAULT_NODE_HEIGHT: f64 = 56.0;
pub const DEFAULT_FONT_SIZE: f32 = 14.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaletteColor {
    #[default]
    Blue,
    Green,
    Orange,
    Red,
    Purple,
    Teal,
    Yellow,
    Gray,
}

impl PaletteColor {
    pub const ALL: [PaletteColor; 8] = [
        PaletteColor::Blue,
        PaletteColor::Green,
        PaletteColor::Orange,
        PaletteColor::Red,
        PaletteColor::Purple,
        PaletteColor::Teal,
        PaletteColor::Yellow,
        PaletteColor::Gray,
    ];

    pub fn hex(self) -> &'static str {
        match self {
            PaletteColor::Blue => "#3b82f6",
            PaletteColor::Green => "#22c55e",
            PaletteColor::Orange => "#f97316",
            PaletteColor::Red => "#ef4444",
            PaletteColor::Purple => "#a855f7",
            PaletteColor::Teal => "#14b8a6",
            PaletteColor::Yellow => "#eab308",
            PaletteColor::Gray => "#6b7280",
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            PaletteColor::Blue => "blue",
            PaletteColor::Green => "green",
            PaletteColor::Orange => "orange",
            PaletteColor::Red => "red",
            PaletteColor::Purple => "purple",
            PaletteColor::Teal => "teal",
            PaletteColor::Yellow => "yellow",
            PaletteColor::Gray => "gray",
        }
    }
}

impl FromStr for PaletteColor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PaletteColor::ALL
            .into_iter()
            .find(|color| color.token() == wanted)
            .ok_or_else(|| CoreError::InvalidToken(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeShape {
    #[default]
    Rounded,
    Circle,
    Diamond,
    Rectangle,
}

impl FromStr for NodeShape {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rounded" => Ok(NodeShape::Rounded),
            "circle" => Ok(NodeShape::Circle),
            "diamond" => Ok(NodeShape::Diamond),
            "rectangle" => Ok(NodeShape::Rectangle),
            _ => Err(CoreError::InvalidToken(s.to_string())),
        }
    }
}

/// A labeled, positioned vertex of a mind map.
///
/// `position` is the node center in canvas coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub position: Vec2,
    pub size: Size,
    #[serde(default)]
    pub color: PaletteColor,
    #[serde(default)]
    pub shape: NodeShape,
    pub font_size: f32,
    /// Attached note, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_id: Option<String>,
    /// Type tag selecting a decorative icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Node {
    pub fn new(id: NodeId, label: impl Into<String>, position: Vec2) -> Self {
        Self {
            id,
            label: label.into(),
            position,
            size: Size::new(DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT),
            color: PaletteColor::default(),
            shape: NodeShape::default(),
            font_size: DEFAULT_FONT_SIZE,
            note_id: None,
            kind: None,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.position, self.size)
    }

    /// Shape-aware containment test in canvas space.
    pub fn contains(&self, point: Vec2) -> bool {
        let half_w = self.size.width / 2.0;
        let half_h = self.size.height / 2.0;
        if half_w <= 0.0 || half_h <= 0.0 {
            return false;
        }
        let dx = (point.x - self.position.x) / half_w;
        let dy = (point.y - self.position.y) / half_h;
        match self.shape {
            NodeShape::Rounded | NodeShape::Rectangle => dx.abs() <= 1.0 && dy.abs() <= 1.0,
            NodeShape::Circle => dx * dx + dy * dy <= 1.0,
            NodeShape::Diamond => dx.abs() + dy.abs() <= 1.0,
        }
    }

    pub fn apply(&mut self, patch: &NodePatch) {
        if let Some(label) = &patch.label {
            self.label = label.clone();
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(shape) = patch.shape {
            self.shape = shape;
        }
        if let Some(font_size) = patch.font_size {
            self.font_size = font_size;
        }
        if let Some(note_id) = &patch.note_id {
            self.note_id = note_id.clone();
        }
        if let Some(kind) = &patch.kind {
            self.kind = kind.clone();
        }
    }
}

/// Partial node update. `None` leaves a field untouched; the nested options
/// of `note_id` and `kind` allow clearing them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<PaletteColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<NodeShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Option<String>>,
}

impl NodePatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn position(position: Vec2) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn color(color: PaletteColor) -> Self {
        Self {
            color: Some(color),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == NodePatch::default()
    }
}

/// Trims a label and bounds its length. Empty labels are rejected.
pub fn validate_label(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::EmptyLabel);
    }
    if trimmed.chars().count() > MAX_LABEL_LEN {
        tracing::debug!(len = trimmed.chars().count(), "Truncating node label");
        return Ok(trimmed.chars().take(MAX_LABEL_LEN).collect());
    }
    Ok(trimmed.to_string())
}
