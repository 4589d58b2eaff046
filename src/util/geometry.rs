//! Angle and coordinate helpers shared by the simulation

use glam::Vec2;
use std::f32::consts::{PI, TAU};

/// Wrap an angle in degrees to [0, 360)
#[inline]
pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an angle in radians to [-π, π)
#[inline]
pub fn normalize_radians(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped >= PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Signed shortest rotation from `from` to `to`, in degrees, within (-180, 180]
///
/// Positive means counter-clockwise (increasing angle).
#[inline]
pub fn shortest_arc_degrees(from: f32, to: f32) -> f32 {
    let ccw = normalize_degrees(to - from);
    if ccw <= 180.0 {
        ccw
    } else {
        ccw - 360.0
    }
}

/// Convert polar (r, theta) to cartesian in screen space (y grows downward)
///
/// Angles are counter-clockwise as seen on screen, which is why the
/// y component is negated.
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), -r * theta.sin())
}

/// Convert a screen-space offset to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), (-pos.y).atan2(pos.x))
}

/// Rotate a screen-space offset counter-clockwise by `theta` radians
#[inline]
pub fn rotate_screen(offset: Vec2, theta: f32) -> Vec2 {
    let (r, angle) = cartesian_to_polar(offset);
    polar_to_cartesian(r, angle + theta)
}

/// Unit direction of travel for a heading in radians
#[inline]
pub fn heading(theta: f32) -> Vec2 {
    Vec2::new((-theta).cos(), (-theta).sin())
}
