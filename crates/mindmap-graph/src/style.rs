//! Visual style resolution for drawn nodes and edges.

use mindmap_core::{Edge, LineStyle, Node, PaletteColor};

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Scales alpha by an opacity in `[0, 1]`.
    pub fn faded(self, opacity: f32) -> Self {
        let opacity = opacity.clamp(0.0, 1.0);
        Self {
            a: ((self.a as f32) * opacity).round() as u8,
            ..self
        }
    }

    pub fn darken(&self, factor: f32) -> Self {
        Self {
            r: ((self.r as f32) * (1.0 - factor)) as u8,
            g: ((self.g as f32) * (1.0 - factor)) as u8,
            b: ((self.b as f32) * (1.0 - factor)) as u8,
            a: self.a,
        }
    }
}

pub const COLOR_ACCENT: Color = Color::rgb(255, 200, 100);
pub const COLOR_LABEL: Color = Color::rgb(255, 255, 255);
pub const COLOR_FALLBACK: Color = Color::rgb(100, 100, 100);

pub fn palette_color(color: PaletteColor) -> Color {
    Color::from_hex(color.hex()).unwrap_or(COLOR_FALLBACK)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeColors {
    pub fill: Color,
    pub border: Color,
    pub text: Color,
}

pub fn node_colors(node: &Node, opacity: f32, accent: bool) -> NodeColors {
    let fill = palette_color(node.color);
    let border = if accent { COLOR_ACCENT } else { fill.darken(0.2) };
    NodeColors {
        fill: fill.faded(opacity),
        border: border.faded(opacity),
        text: COLOR_LABEL.faded(opacity),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStyle {
    pub color: Color,
    pub width: f32,
    pub dashed: bool,
    pub dotted: bool,
}

/// Highlighted edges are drawn wider and in the accent color.
pub fn edge_style(edge: &Edge, opacity: f32, highlighted: bool, highlight_width: f32) -> EdgeStyle {
    let (color, width) = if highlighted {
        (COLOR_ACCENT, edge.width * highlight_width)
    } else {
        (palette_color(edge.color), edge.width)
    };
    EdgeStyle {
        color: color.faded(opacity),
        width,
        dashed: edge.style == LineStyle::Dashed,
        dotted: edge.style == LineStyle::Dotted,
    }
}
