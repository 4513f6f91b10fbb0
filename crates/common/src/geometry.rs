//! Integer geometric primitives.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Largest coordinate magnitude a canvas accepts on either axis.
///
/// Brush placement and cell keys are validated against it, which leaves room
/// for the offset arithmetic of compositing to stay inside `i32`.
pub const COORDINATE_LIMIT: i32 = 1 << 28;

/// A 2D integer point or offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntPoint {
    pub x: i32,
    pub y: i32,
}

/// Coordinates of a cell within a tiled grid.
pub type CellKey = IntPoint;

impl IntPoint {
    pub const ZERO: IntPoint = IntPoint { x: 0, y: 0 };
    pub const ONE: IntPoint = IntPoint { x: 1, y: 1 };

    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn splat(v: i32) -> Self {
        Self { x: v, y: v }
    }

    /// Component-wise minimum.
    #[inline]
    pub fn min(self, other: IntPoint) -> IntPoint {
        IntPoint::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max(self, other: IntPoint) -> IntPoint {
        IntPoint::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Whether both coordinates lie within [`COORDINATE_LIMIT`].
    #[inline]
    pub fn is_drawable(self) -> bool {
        in_coordinate_range(self.x as i64) && in_coordinate_range(self.y as i64)
    }

    /// The cell containing this point, for square cells of `cell_size`.
    ///
    /// Uses floor division, so `(-1, -1)` lies in cell `(-1, -1)` rather
    /// than cell `(0, 0)`.
    #[inline]
    pub fn cell_coords(self, cell_size: u32) -> CellKey {
        let size = cell_size as i32;
        IntPoint::new(self.x.div_euclid(size), self.y.div_euclid(size))
    }

    /// Split into the containing cell and the offset inside that cell.
    #[inline]
    pub fn grid_coords(self, cell_size: u32) -> (CellKey, IntPoint) {
        let size = cell_size as i32;
        (
            self.cell_coords(cell_size),
            IntPoint::new(self.x.rem_euclid(size), self.y.rem_euclid(size)),
        )
    }
}

/// Whether a single coordinate lies within [`COORDINATE_LIMIT`].
#[inline]
pub fn in_coordinate_range(v: i64) -> bool {
    (-(COORDINATE_LIMIT as i64)..=COORDINATE_LIMIT as i64).contains(&v)
}

impl Add for IntPoint {
    type Output = IntPoint;
    fn add(self, rhs: IntPoint) -> IntPoint {
        IntPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for IntPoint {
    fn add_assign(&mut self, rhs: IntPoint) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for IntPoint {
    type Output = IntPoint;
    fn sub(self, rhs: IntPoint) -> IntPoint {
        IntPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<i32> for IntPoint {
    type Output = IntPoint;
    fn mul(self, rhs: i32) -> IntPoint {
        IntPoint::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for IntPoint {
    type Output = IntPoint;
    fn neg(self) -> IntPoint {
        IntPoint::new(-self.x, -self.y)
    }
}

impl From<(i32, i32)> for IntPoint {
    fn from((x, y): (i32, i32)) -> Self {
        IntPoint::new(x, y)
    }
}

/// Integer rectangle for pixel operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle anchored at the origin.
    #[inline]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Smallest rectangle containing both points (inclusive).
    pub fn from_corners(a: IntPoint, b: IntPoint) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self::new(
            min.x,
            min.y,
            max.x.abs_diff(min.x).saturating_add(1),
            max.y.abs_diff(min.y).saturating_add(1),
        )
    }

    #[inline]
    pub fn origin(&self) -> IntPoint {
        IntPoint::new(self.x, self.y)
    }

    /// Exclusive right edge, saturating at `i32::MAX`.
    #[inline]
    pub fn right(&self) -> i32 {
        self.x.saturating_add_unsigned(self.width)
    }

    /// Exclusive bottom edge, saturating at `i32::MAX`.
    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add_unsigned(self.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn contains_point(&self, point: IntPoint) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains_rect(&self, other: &PixelRect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersection(&self, other: &PixelRect) -> Option<PixelRect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right > x && bottom > y {
            Some(PixelRect::new(x, y, right.abs_diff(x), bottom.abs_diff(y)))
        } else {
            None
        }
    }

    pub fn union(&self, other: &PixelRect) -> PixelRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        PixelRect::new(x, y, right.abs_diff(x), bottom.abs_diff(y))
    }

    #[inline]
    pub fn translate(&self, offset: IntPoint) -> PixelRect {
        PixelRect::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }
}
