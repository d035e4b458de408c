// SPDX-License-Identifier: MIT OR Apache-2.0
//! Geometry primitives shared by easing curves and head control handles.

use serde::{Deserialize, Serialize};

/// A 2-D point. Easing handles live in the unit square.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamp both coordinates into `[0, 1]`
    pub fn clamped_unit(self) -> Self {
        Self::new(self.x.clamp(0.0, 1.0), self.y.clamp(0.0, 1.0))
    }
}

/// Control handle stored as a signed angle plus a radius.
///
/// Head-track handles are dragged around their keyframe; keeping the angle
/// instead of raw `dx`/`dy` stops the handle from flipping when it passes
/// through the keyframe itself.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolarOffset {
    /// Angle in radians
    pub theta: f64,
    /// Distance from the origin point
    pub radius: f64,
}

impl PolarOffset {
    /// Create a new polar offset
    pub const fn new(theta: f64, radius: f64) -> Self {
        Self { theta, radius }
    }

    /// Build from a Cartesian offset
    pub fn from_offset(dx: f64, dy: f64) -> Self {
        Self {
            theta: dy.atan2(dx),
            radius: (dx * dx + dy * dy).sqrt(),
        }
    }

    /// Cartesian x component
    pub fn x(&self) -> f64 {
        self.radius * self.theta.cos()
    }

    /// Cartesian y component
    pub fn y(&self) -> f64 {
        self.radius * self.theta.sin()
    }

    /// Cartesian offset scaled by `rate`
    pub fn offset(&self, rate: f64) -> Point {
        Point::new(self.x() * rate, self.y() * rate)
    }

    /// Absolute position of this handle around `origin`
    pub fn resolve(&self, origin: Point) -> Point {
        Point::new(origin.x + self.x(), origin.y + self.y())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_polar_components() {
        let handle = PolarOffset::new(FRAC_PI_2, 2.0);
        assert!(handle.x().abs() < 1e-12);
        assert!((handle.y() - 2.0).abs() < 1e-12);

        let p = handle.resolve(Point::new(10.0, 10.0));
        assert!((p.x - 10.0).abs() < 1e-12);
        assert!((p.y - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_offset_keeps_sign() {
        let handle = PolarOffset::from_offset(-3.0, -4.0);
        assert!((handle.radius - 5.0).abs() < 1e-12);
        assert!(handle.theta < 0.0);
        assert!((handle.x() + 3.0).abs() < 1e-9);
        assert!((handle.y() + 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamped_unit() {
        assert_eq!(Point::new(-0.5, 1.5).clamped_unit(), Point::new(0.0, 1.0));
    }
}
