//! # 2D geometry primitives
//!
//! Circle intersection, polar conversions and polygon queries used by the arm
//! kinematics. All functions work on `nalgebra` points and vectors in a
//! common plane; the caller is responsible for expressing its inputs in the
//! same frame.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Relative tolerance used to decide that two circles are tangent.
///
/// Tangency is a measure-zero event in floating point, so distances within
/// this fraction of the compared lengths are treated as exactly tangent.
/// External tangency scales with the summed radii, internal tangency with the
/// radius difference, so nearly concentric circles of equal radii still
/// intersect twice.
pub const TANGENCY_REL_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A circle in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub centre: Point2<f64>,
    pub radius: f64,
}

/// A vector in polar form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polar {
    /// Distance from the origin
    pub r: f64,

    /// Angle to the positive x axis.
    ///
    /// Units: radians
    pub theta: f64,
}

/// The result of intersecting two circles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircleIntersection {
    /// The circles do not meet (or are concentric).
    None,

    /// The circles are tangent.
    One(Point2<f64>),

    /// The circles cross at two points.
    Two(Point2<f64>, Point2<f64>),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Circle {
    pub fn new(centre: Point2<f64>, radius: f64) -> Self {
        Self { centre, radius }
    }

    /// Compute the intersections of this circle with another.
    ///
    /// Concentric circles are reported as not intersecting, even when their
    /// radii are equal.
    pub fn intersect(&self, other: &Circle) -> CircleIntersection {
        let delta = other.centre - self.centre;
        let dist = delta.norm();

        if dist == 0.0 {
            return CircleIntersection::None;
        }

        let r_sum = self.radius + other.radius;
        let r_diff = (self.radius - other.radius).abs();
        let tol_ext = TANGENCY_REL_TOLERANCE * r_sum.max(dist);
        let tol_int = TANGENCY_REL_TOLERANCE * r_diff.max(dist);

        if dist > r_sum + tol_ext || dist < r_diff - tol_int {
            return CircleIntersection::None;
        }

        // Distance from our centre to the chord, along the centre line
        let a = (self.radius.powi(2) - other.radius.powi(2) + dist.powi(2)) / (2.0 * dist);
        let dir = delta / dist;
        let foot = self.centre + dir * a;

        if (dist - r_sum).abs() <= tol_ext || (dist - r_diff).abs() <= tol_int {
            return CircleIntersection::One(foot);
        }

        let h = (self.radius.powi(2) - a.powi(2)).max(0.0).sqrt();
        let perp = Vector2::new(-dir.y, dir.x) * h;

        CircleIntersection::Two(foot + perp, foot - perp)
    }
}

impl CircleIntersection {
    /// Number of intersection points.
    pub fn count(&self) -> usize {
        match self {
            CircleIntersection::None => 0,
            CircleIntersection::One(_) => 1,
            CircleIntersection::Two(_, _) => 2,
        }
    }
}

impl Polar {
    /// Convert a cartesian vector into polar form.
    pub fn from_cart(v: &Vector2<f64>) -> Self {
        Self {
            r: v.norm(),
            theta: v.y.atan2(v.x),
        }
    }

    /// Convert back into cartesian form.
    pub fn to_cart(&self) -> Vector2<f64> {
        Vector2::new(self.r * self.theta.cos(), self.r * self.theta.sin())
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Determine if a point lies strictly inside a polygon.
///
/// Uses the even-odd rule, so the polygon may be given in either winding
/// order. Points exactly on the boundary may be reported either way.
pub fn is_in_poly(point: &Point2<f64>, poly: &[Point2<f64>]) -> bool {
    if poly.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = poly.len() - 1;

    for i in 0..poly.len() {
        let (pi, pj) = (poly[i], poly[j]);

        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = pj.x + (point.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
            if point.x < x_cross {
                inside = !inside;
            }
        }

        j = i;
    }

    inside
}

/// Intersection of the two segments `a0-a1` and `b0-b1`, if any.
///
/// Collinear overlapping segments are reported as not intersecting.
pub fn segment_intersection(
    a0: &Point2<f64>,
    a1: &Point2<f64>,
    b0: &Point2<f64>,
    b1: &Point2<f64>,
) -> Option<Point2<f64>> {
    let r = a1 - a0;
    let s = b1 - b0;
    let denom = r.perp(&s);

    if denom == 0.0 {
        return None;
    }

    let qp = b0 - a0;
    let t = qp.perp(&s) / denom;
    let u = qp.perp(&r) / denom;

    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(a0 + r * t)
    } else {
        None
    }
}

/// Determine if the segment `start-end` crosses any edge of the polygon,
/// returning the first crossing point found.
pub fn is_crossing_poly(
    start: &Point2<f64>,
    end: &Point2<f64>,
    poly: &[Point2<f64>],
) -> Option<Point2<f64>> {
    if poly.len() < 2 {
        return None;
    }

    poly.iter()
        .zip(poly.iter().cycle().skip(1))
        .find_map(|(v0, v1)| segment_intersection(start, end, v0, v1))
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn square() -> Vec<Point2<f64>> {
        vec![
            Point2::new(10.0, 10.0),
            Point2::new(20.0, 10.0),
            Point2::new(20.0, 20.0),
            Point2::new(10.0, 20.0),
        ]
    }

    #[test]
    fn test_intersect_two() {
        let c1 = Circle::new(Point2::origin(), 100.0);
        let c2 = Circle::new(Point2::new(100.0, 100.0), 100.0);

        match c1.intersect(&c2) {
            CircleIntersection::Two(p1, p2) => {
                for p in [p1, p2].iter() {
                    assert_relative_eq!(p.coords.norm(), 100.0, epsilon = 1e-9);
                    assert_relative_eq!((p - c2.centre).norm(), 100.0, epsilon = 1e-9);
                }
                // The two solutions are (100, 0) and (0, 100)
                assert_relative_eq!(p1.x + p2.x, 100.0, epsilon = 1e-9);
                assert_relative_eq!(p1.y + p2.y, 100.0, epsilon = 1e-9);
            }
            i => panic!("Expected two intersections, got {:?}", i),
        }
    }

    #[test]
    fn test_intersect_tangent() {
        let c1 = Circle::new(Point2::origin(), 50.0);
        let c2 = Circle::new(Point2::new(100.0, 0.0), 50.0);

        match c1.intersect(&c2) {
            CircleIntersection::One(p) => {
                assert_relative_eq!(p.x, 50.0, epsilon = 1e-9);
                assert_relative_eq!(p.y, 0.0, epsilon = 1e-9);
            }
            i => panic!("Expected one intersection, got {:?}", i),
        }

        // Internal tangency
        let c3 = Circle::new(Point2::origin(), 100.0);
        let c4 = Circle::new(Point2::new(40.0, 0.0), 60.0);
        assert_eq!(c3.intersect(&c4).count(), 1);
    }

    #[test]
    fn test_intersect_nearly_concentric() {
        // Equal radii, centres a hair apart: still two crossings
        let c1 = Circle::new(Point2::origin(), 100.0);
        let c2 = Circle::new(Point2::new(1e-8, 0.0), 100.0);

        match c1.intersect(&c2) {
            CircleIntersection::Two(a, b) => {
                assert_relative_eq!(a.y.abs(), 100.0, epsilon = 1e-6);
                assert_relative_eq!(b.y.abs(), 100.0, epsilon = 1e-6);
                assert!(a.y * b.y < 0.0);
            }
            i => panic!("Expected two intersections, got {:?}", i),
        }
    }

    #[test]
    fn test_intersect_none() {
        let c1 = Circle::new(Point2::origin(), 10.0);
        let c2 = Circle::new(Point2::new(100.0, 100.0), 10.0);
        assert_eq!(c1.intersect(&c2), CircleIntersection::None);

        // One inside the other
        let c3 = Circle::new(Point2::origin(), 100.0);
        let c4 = Circle::new(Point2::new(10.0, 0.0), 10.0);
        assert_eq!(c3.intersect(&c4), CircleIntersection::None);

        // Concentric
        let c5 = Circle::new(Point2::origin(), 10.0);
        assert_eq!(c5.intersect(&c5), CircleIntersection::None);
    }

    #[test]
    fn test_polar_round_trip() {
        let v = Vector2::new(0.0, 100.0);
        let p = Polar::from_cart(&v);
        assert_relative_eq!(p.r, 100.0);
        assert_relative_eq!(p.theta, PI / 2.0);

        let back = Polar { r: 2.0, theta: PI }.to_cart();
        assert_relative_eq!(back.x, -2.0);
        assert_relative_eq!(back.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_is_in_poly() {
        let poly = square();
        assert!(is_in_poly(&Point2::new(15.0, 15.0), &poly));
        assert!(!is_in_poly(&Point2::new(5.0, 15.0), &poly));
        assert!(!is_in_poly(&Point2::new(15.0, 25.0), &poly));

        // Degenerate polygons contain nothing
        assert!(!is_in_poly(&Point2::new(15.0, 15.0), &poly[..2]));
    }

    #[test]
    fn test_is_crossing_poly() {
        let poly = square();

        let cross = is_crossing_poly(&Point2::new(0.0, 15.0), &Point2::new(30.0, 15.0), &poly)
            .expect("segment should cross");
        assert_relative_eq!(cross.y, 15.0);
        assert!(cross.x == 10.0 || cross.x == 20.0);

        assert!(is_crossing_poly(&Point2::new(0.0, 0.0), &Point2::new(30.0, 0.0), &poly).is_none());

        // Fully inside doesn't cross any edge
        assert!(
            is_crossing_poly(&Point2::new(12.0, 12.0), &Point2::new(18.0, 18.0), &poly).is_none()
        );
    }
}
