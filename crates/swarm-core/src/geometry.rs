//! Plain 2D geometry shared by the engine and its consumers.
//!
//! Arena coordinates are in world units with `y` up; angles are radians,
//! counter-clockwise, with `0` pointing along `+x`.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A point in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(self, other: Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point at fraction `t` of the segment `self -> other`.
    pub fn lerp(self, other: Position, t: f64) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Point reached by walking `length` along `angle` from `self`.
    pub fn offset(self, angle: f64, length: f64) -> Position {
        Position {
            x: self.x + angle.cos() * length,
            y: self.y + angle.sin() * length,
        }
    }
}

/// Position plus heading of a body.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Position,
    /// Heading in radians.
    pub angle: f64,
}

impl Pose {
    pub const fn new(x: f64, y: f64, angle: f64) -> Self {
        Self {
            position: Position::new(x, y),
            angle,
        }
    }

    /// Express a body-frame direction (`local_angle`) in the world frame.
    pub fn world_angle(&self, local_angle: f64) -> f64 {
        wrap_signed_angle(self.angle + local_angle)
    }

    /// Rotate a body-frame vector into the world frame.
    pub fn rotate(&self, local_x: f64, local_y: f64) -> (f64, f64) {
        let (sin, cos) = self.angle.sin_cos();
        (local_x * cos - local_y * sin, local_x * sin + local_y * cos)
    }
}

/// Wrap an angle into `(-PI, PI]`.
pub fn wrap_signed_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }
    let mut a = angle % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_angles_in_half_open_range() {
        assert!((wrap_signed_angle(3.0 * PI) - PI).abs() < 1e-9);
        assert!((wrap_signed_angle(-3.0 * PI) - PI).abs() < 1e-9);
        assert!((wrap_signed_angle(0.5) - 0.5).abs() < 1e-12);
        assert!(wrap_signed_angle(f64::NAN).is_nan());
    }

    #[test]
    fn lerp_weights_toward_second_point() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(10.0, 0.0);
        assert_eq!(a.lerp(b, 0.7), Position::new(7.0, 0.0));
        assert!((a.distance_to(b) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn rotate_quarter_turn() {
        let pose = Pose::new(0.0, 0.0, PI / 2.0);
        let (x, y) = pose.rotate(1.0, 0.0);
        assert!(x.abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);
    }
}
