// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cubic Bezier easing curves.
//!
//! Curves are stored in editor coordinates: the easing graph has its origin
//! in the top-left corner with y pointing down, so the start anchor is
//! `(0, 1)` and the end anchor `(1, 0)`. The device expects bottom-left
//! origin handles; [`Easing::device_handles`] performs the flip.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// Tolerance on the x axis when inverting a curve
pub const SOLVE_TOLERANCE: f64 = 1e-4;

/// Iteration cap for the bisection search
pub const SOLVE_MAX_ITERATIONS: usize = 1000;

/// RGBA color used by previews, channels in their keyframe units
pub type Rgba = [f64; 4];

/// Scalar curve helpers
pub struct Bezier;

impl Bezier {
    /// Linear interpolation between two values
    pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
        a + (b - a) * t
    }

    /// One-dimensional cubic Bezier at parameter `t`
    pub fn cubic(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let t2 = t * t;

        p0 * mt2 * mt + 3.0 * p1 * mt2 * t + 3.0 * p2 * mt * t2 + p3 * t2 * t
    }
}

/// Transition curve between two keyframes: `[P0, P1, P2, P3]`.
///
/// `P0` and `P1` are the fixed anchors, `P2` and `P3` the editable handles
/// (handle 0 and handle 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Easing {
    points: [Point; 4],
}

impl Default for Easing {
    fn default() -> Self {
        Self::linear()
    }
}

impl Easing {
    /// Straight line from start to end
    pub const fn linear() -> Self {
        Self {
            points: [
                Point::new(0.0, 1.0),
                Point::new(1.0, 0.0),
                Point::new(0.0, 1.0),
                Point::new(1.0, 0.0),
            ],
        }
    }

    /// Curve with the given editable handles (editor coordinates)
    pub fn with_handles(first: Point, second: Point) -> Self {
        let mut easing = Self::linear();
        easing.points[2] = first.clamped_unit();
        easing.points[3] = second.clamped_unit();
        easing
    }

    /// All four points
    pub fn points(&self) -> &[Point; 4] {
        &self.points
    }

    /// Editable handle `index` (0 or 1)
    pub fn handle(&self, index: usize) -> Option<Point> {
        (index < 2).then(|| self.points[index + 2])
    }

    /// Move an editable handle. Returns `false` for an invalid index.
    pub fn set_handle(&mut self, index: usize, point: Point) -> bool {
        if index >= 2 {
            return false;
        }
        self.points[index + 2] = point.clamped_unit();
        true
    }

    /// Handles as `[x1, y1, x2, y2]` with the y axis flipped to a bottom-left origin
    pub fn device_handles(&self) -> [f64; 4] {
        let [_, _, first, second] = self.points;
        [first.x, 1.0 - first.y, second.x, 1.0 - second.y]
    }

    /// Sample points along the curve for drawing, in editor coordinates
    pub fn sample(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        let [start, end, first, second] = self.points;

        (0..=segments)
            .map(|i| {
                let t = i as f64 / segments as f64;
                Point::new(
                    Bezier::cubic(start.x, first.x, second.x, end.x, t),
                    Bezier::cubic(start.y, first.y, second.y, end.y, t),
                )
            })
            .collect()
    }

    /// Find the curve parameter whose x component equals `t`.
    ///
    /// Bisection over `[0, 1]`; stops within [`SOLVE_TOLERANCE`] or after
    /// [`SOLVE_MAX_ITERATIONS`] steps and returns the best parameter found.
    pub fn solve(&self, t: f64) -> f64 {
        let [x1, _, x2, _] = self.device_handles();
        let t = t.clamp(0.0, 1.0);

        let mut lower = 0.0;
        let mut upper = 1.0;
        let mut r = 0.5;
        let mut x = Bezier::cubic(0.0, x1, x2, 1.0, r);
        let mut iterations = 0;

        while (t - x).abs() > SOLVE_TOLERANCE && iterations < SOLVE_MAX_ITERATIONS {
            iterations += 1;
            if t > x {
                lower = r;
            } else {
                upper = r;
            }
            r = (lower + upper) / 2.0;
            x = Bezier::cubic(0.0, x1, x2, 1.0, r);
        }

        r
    }

    /// Eased progress in `[0, 1]` for normalized time `t`
    pub fn progress(&self, t: f64) -> f64 {
        let [_, y1, _, y2] = self.device_handles();
        Bezier::cubic(0.0, y1, y2, 1.0, self.solve(t))
    }
}

/// Interpolate each color channel along `easing` at normalized time `t`
pub fn lerp_color(start: Rgba, end: Rgba, t: f64, easing: &Easing) -> Rgba {
    let eased = easing.progress(t);
    let mut out = [0.0; 4];
    for (channel, value) in out.iter_mut().enumerate() {
        *value = Bezier::lerp(start[channel], end[channel], eased);
    }
    out
}

/// Preview gradient with `samples` columns; column `i` is taken at `i / samples`
pub fn gradient(start: Rgba, end: Rgba, easing: &Easing, samples: usize) -> Vec<Rgba> {
    (0..samples)
        .map(|i| lerp_color(start, end, i as f64 / samples as f64, easing))
        .collect()
}
