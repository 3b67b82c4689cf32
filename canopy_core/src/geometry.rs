// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer geometry: positions and rectangles in display pixels.

use core::fmt;
use core::ops::{Add, AddAssign, Neg, Sub};

/// An integer position or offset.
///
/// Arithmetic saturates instead of wrapping, so a node dragged far off-screen
/// pins at the coordinate limits.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Point {
    /// The origin, `(0, 0)`.
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    /// Creates a point.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns `true` if both coordinates are zero.
    #[inline]
    #[must_use]
    pub const fn is_origin(self) -> bool {
        self.x == 0 && self.y == 0
    }
}

impl Add for Point {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}

impl AddAssign for Point {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Point {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

impl Neg for Point {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(self.x.saturating_neg(), self.y.saturating_neg())
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An immutable integer rectangle.
///
/// The position is relative to the owner's parent; the size is unsigned so a
/// negative extent cannot be represented.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// A zero-sized rectangle at the origin.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Creates a rectangle.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the top-left corner.
    #[inline]
    #[must_use]
    pub const fn position(self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Returns a copy moved to `position`, keeping the size.
    #[inline]
    #[must_use]
    pub const fn with_position(self, position: Point) -> Self {
        Self::new(position.x, position.y, self.width, self.height)
    }

    /// Returns a copy resized to `width` × `height`, keeping the position.
    #[inline]
    #[must_use]
    pub const fn with_size(self, width: u32, height: u32) -> Self {
        Self::new(self.x, self.y, width, height)
    }

    /// Returns a copy offset by `delta`.
    #[inline]
    #[must_use]
    pub fn translate(self, delta: Point) -> Self {
        self.with_position(self.position() + delta)
    }

    /// Returns `true` if `other` has the same width and height.
    #[inline]
    #[must_use]
    pub const fn same_size(self, other: Self) -> bool {
        self.width == other.width && self.height == other.height
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_arithmetic() {
        let a = Point::new(10, 10);
        let b = Point::new(15, 12);
        assert_eq!(b - a, Point::new(5, 2));
        assert_eq!(a + (b - a), b);
        assert_eq!(-a, Point::new(-10, -10));
    }

    #[test]
    fn point_arithmetic_saturates() {
        let far = Point::new(i32::MAX, i32::MIN);
        assert_eq!(far + Point::new(1, 0), Point::new(i32::MAX, i32::MIN));
        assert_eq!(far - Point::new(0, 1), Point::new(i32::MAX, i32::MIN));
    }

    #[test]
    fn rect_translate_keeps_size() {
        let r = Rect::new(100, 100, 50, 50).translate(Point::new(10, -5));
        assert_eq!(r, Rect::new(110, 95, 50, 50));
    }

    #[test]
    fn rect_with_position_and_size() {
        let r = Rect::new(1, 2, 3, 4);
        assert_eq!(r.with_position(Point::new(7, 8)), Rect::new(7, 8, 3, 4));
        assert_eq!(r.with_size(30, 40), Rect::new(1, 2, 30, 40));
        assert!(r.same_size(Rect::new(9, 9, 3, 4)));
        assert!(!r.same_size(Rect::new(1, 2, 3, 5)));
    }

    #[test]
    fn debug_format_is_compact() {
        assert_eq!(
            alloc::format!("{:?}", Rect::new(-1, 2, 30, 40)),
            "Rect(-1, 2, 30x40)"
        );
        assert_eq!(alloc::format!("{:?}", Point::new(3, -4)), "(3, -4)");
    }
}
