//! Geometry and node description types shared by surfaces and the harness

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SurfaceError, SurfaceResult};

/// Opaque handle to a node owned by a layout surface.
///
/// Handles are arena indices. A surface never reuses an index during a run,
/// so a handle stays valid until the surface itself is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle(usize);

impl NodeHandle {
    /// Wrap an arena index.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Arena index of this node.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Available area for a generated tree, in surface units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub width: f32,
    pub height: f32,
}

impl Area {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Shrink both dimensions by `amount`, clamping at zero.
    pub fn inset(self, amount: f32) -> Self {
        Self {
            width: (self.width - amount).max(0.0),
            height: (self.height - amount).max(0.0),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl Default for Area {
    fn default() -> Self {
        // Portrait phone display
        Self::new(720.0, 1280.0)
    }
}

/// Position and size of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Geometry {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Geometry at the origin covering `area`.
    pub const fn from_area(area: Area) -> Self {
        Self::new(0.0, 0.0, area.width, area.height)
    }

    /// Check that every value is finite and the dimensions are non-negative.
    pub fn validate(&self) -> SurfaceResult<()> {
        let finite = self.left.is_finite()
            && self.top.is_finite()
            && self.width.is_finite()
            && self.height.is_finite();
        if !finite || self.width < 0.0 || self.height < 0.0 {
            return Err(SurfaceError::InvalidGeometry {
                left: self.left,
                top: self.top,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Same geometry shifted by `(dx, dy)` and floored to whole units.
    pub fn shifted_floor(self, dx: f32, dy: f32) -> Self {
        Self {
            left: (self.left + dx).floor(),
            top: (self.top + dy).floor(),
            ..self
        }
    }

    /// Same geometry grown by `amount` in both dimensions, clamped at zero.
    pub fn resized_by(self, amount: f32) -> Self {
        Self {
            width: (self.width + amount).max(0.0),
            height: (self.height + amount).max(0.0),
            ..self
        }
    }
}

/// How a surface resolves a node's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sizing {
    /// Width and height come from the node's geometry.
    #[default]
    Fixed,
    /// The node fills its parent.
    Fill,
    /// The node shrink-wraps its in-flow children.
    Content,
}

/// Simple RGB colour. Cosmetic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Hex notation, e.g. `#ff0000`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Properties used to create a node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeProps {
    pub geometry: Geometry,
    pub sizing: Sizing,
    pub color: Color,
}

impl NodeProps {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            ..Default::default()
        }
    }

    pub fn sizing(mut self, sizing: Sizing) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}
