//! Layout units, snapping, and viewport-relative length conversion.
//!
//! Live geometry is measured in canvas pixels (egui points in the app).
//! Persisted geometry is expressed as a percentage of the canvas so that a
//! board laid out on one screen resolution looks the same on another.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Grid unit that drag positions and wheel-resize sizes are quantized to.
pub const SNAP: f64 = 10.0;

/// Added to persisted size fractions so a measured size never lands on an
/// exact zero after conversion.
pub const SIZE_EPSILON: f64 = 0.000_000_1;

/// Rendered width of a tile whose width is unset.
pub const DEFAULT_TILE_WIDTH: f64 = 100.0;
/// Rendered height of a tile whose height is unset.
pub const DEFAULT_TILE_HEIGHT: f64 = 100.0;

/// A point in canvas pixels, origin at the canvas top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width/height pair in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x < self.right() && p.y >= self.top && p.y < self.bottom()
    }
}

// ---------------------------------------------------------------------------
// Length
// ---------------------------------------------------------------------------

/// One coordinate or dimension of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Length {
    /// Unset: positions resolve to 0, sizes to the tile default.
    #[default]
    Auto,
    Px(f64),
    /// Percentage of the containing canvas dimension (`50.0` = half).
    Percent(f64),
}

impl Length {
    /// Resolve to pixels inside a container `container` pixels long.
    pub fn resolve(self, container: f64, auto: f64) -> f64 {
        match self {
            Self::Auto => auto,
            Self::Px(px) => px,
            Self::Percent(pct) => pct / 100.0 * container,
        }
    }

    /// Express a pixel position as a percentage of `container`.
    ///
    /// Falls back to pixels when the container has no extent yet.
    pub fn position_percent(px: f64, container: f64) -> Self {
        if container <= 0.0 {
            return Self::Px(px);
        }
        Self::Percent(px / container * 100.0)
    }

    /// Express a pixel size as a percentage of `container`, with
    /// [`SIZE_EPSILON`] added to the fraction.
    pub fn size_percent(px: f64, container: f64) -> Self {
        if container <= 0.0 {
            return Self::Px(px);
        }
        Self::Percent((px / container + SIZE_EPSILON) * 100.0)
    }

    /// Parse the CSS-like persisted form: `""`/`"auto"`, `"12.5%"`,
    /// `"100px"`, or a bare number (pixels).
    pub fn parse(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        let invalid = || CoreError::InvalidLength(s.to_string());
        let (number, unit): (&str, fn(f64) -> Self) = if let Some(n) = s.strip_suffix('%') {
            (n, Self::Percent)
        } else if let Some(n) = s.strip_suffix("px") {
            (n, Self::Px)
        } else {
            (s, Self::Px)
        };
        let value: f64 = number.trim().parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        Ok(unit(value))
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => Ok(()),
            Self::Px(px) => write!(f, "{px}px"),
            Self::Percent(pct) => write!(f, "{pct}%"),
        }
    }
}

impl Serialize for Length {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Length {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Length::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Snapping
// ---------------------------------------------------------------------------

/// Rounds half up, like the browser's `Math.round`.
fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Offset that centres the snap grid on the container midpoint.
pub fn grid_offset(container: f64) -> f64 {
    (container / 2.0).rem_euclid(SNAP)
}

/// Snapped coordinate for a dragged tile on one axis.
///
/// `grab` is the pointer offset inside the tile recorded at press time.
pub fn snap_axis(pointer: f64, grab: f64, container: f64) -> f64 {
    round_half_up((pointer - grab) / SNAP) * SNAP + grid_offset(container)
}

/// One wheel-resize step: floor to the grid, then grow or shrink by one
/// [`SNAP`]. Never returns less than one grid unit.
pub fn step_size(current: f64, grow: bool) -> f64 {
    let whole = current.trunc();
    let floored = whole - whole.rem_euclid(SNAP);
    let next = if grow { floored + SNAP } else { floored - SNAP };
    next.max(SNAP)
}
