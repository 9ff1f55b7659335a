use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

pub mod document;
pub mod edge;
pub mod error;
pub mod graph;
pub mod id;
pub mod node;
pub mod view;

pub use document::{Document, DocumentMeta, DocumentPatch, GraphPayload};
pub use edge::{Edge, LineStyle};
pub use error::CoreError;
pub use graph::{Adjacency, bfs_distances, reachable_within, search_matches};
pub use id::IdGenerator;
pub use node::{MAX_LABEL_LEN, Node, NodePatch, NodeShape, PaletteColor, validate_label};
pub use view::{GraphMode, ViewTransform};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Caller-generated node identity, unique within a document.
    NodeId
);
string_id!(EdgeId);
string_id!(DocumentId);

/// A point or offset in canvas (or screen) space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (self - other).length()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned bounds in canvas space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn from_center(center: Vec2, size: Size) -> Self {
        let half = Vec2::new(size.width / 2.0, size.height / 2.0);
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn union(self, other: Rect) -> Rect {
        Rect {
            min: Vec2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Vec2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    pub fn expand(self, padding: f64) -> Rect {
        let pad = Vec2::new(padding, padding);
        Rect {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_transparently() {
        let id = NodeId::new("n-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""n-1""#);
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert_eq!(back.to_string(), "n-1");
    }

    #[test]
    fn test_rect_union_and_center() {
        let a = Rect::from_center(Vec2::new(0.0, 0.0), Size::new(10.0, 10.0));
        let b = Rect::from_center(Vec2::new(100.0, 50.0), Size::new(10.0, 10.0));
        let bounds = a.union(b);
        assert_eq!(bounds.width(), 110.0);
        assert_eq!(bounds.height(), 60.0);
        assert_eq!(bounds.center(), Vec2::new(50.0, 25.0));
        assert!(bounds.contains(Vec2::new(50.0, 25.0)));
        assert!(!bounds.contains(Vec2::new(-20.0, 0.0)));
    }
}
