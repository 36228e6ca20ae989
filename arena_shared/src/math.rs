//! Math types.
//!
//! Vector and matrix types come from `glam`. This module adds the pieces the
//! arena needs on top: the orientation record stored in transforms, model
//! matrix composition, and the fixed camera/projection setup.

use serde::{Deserialize, Serialize};

pub use glam::{Mat4, Vec3, Vec4};

/// Vertical field of view of the scene camera, in degrees.
pub const FOV_Y_DEGREES: f32 = 45.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 10_000.0;

/// Raw four-component rotation record (`x`, `y`, `z`, `w`).
///
/// The record is never renormalized. Movement treats `y` as a scalar yaw
/// accumulator and the network writes `x` and `z` directly, so the components
/// are not guaranteed to form a unit quaternion. Rendering expands whatever
/// the components hold through [`Orientation::to_rotation_matrix`], which is
/// the plain quaternion-to-matrix formula without normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Orientation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Orientation {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Current value of the yaw accumulator.
    pub fn yaw(&self) -> f32 {
        self.y
    }

    /// Adds `delta` to the yaw accumulator, then clamps it to `[-limit, limit]`.
    pub fn accumulate_yaw(&mut self, delta: f32, limit: f32) {
        self.y = (self.y + delta).clamp(-limit, limit);
    }

    /// Expands the raw components into a rotation matrix.
    pub fn to_rotation_matrix(self) -> Mat4 {
        let Self { x, y, z, w } = self;
        let (xx, yy, zz) = (x * x, y * y, z * z);
        let (xy, xz, yz) = (x * y, x * z, y * z);
        let (wx, wy, wz) = (w * x, w * y, w * z);

        Mat4::from_cols(
            Vec4::new(1.0 - 2.0 * (yy + zz), 2.0 * (xy + wz), 2.0 * (xz - wy), 0.0),
            Vec4::new(2.0 * (xy - wz), 1.0 - 2.0 * (xx + zz), 2.0 * (yz + wx), 0.0),
            Vec4::new(2.0 * (xz + wy), 2.0 * (yz - wx), 1.0 - 2.0 * (xx + yy), 0.0),
            Vec4::W,
        )
    }
}

/// Composes `Translation(position) * Scale(scale) * Rotation(orientation)`.
///
/// Scale is applied after rotation in object space; this is not the usual
/// translate-rotate-scale order and must stay that way.
pub fn model_matrix(position: Vec3, scale: Vec3, orientation: Orientation) -> Mat4 {
    Mat4::from_translation(position) * Mat4::from_scale(scale) * orientation.to_rotation_matrix()
}

/// View matrix for a camera at `eye` that always faces the world origin.
///
/// The look-at target is the unit vector from `eye` towards the origin, taken
/// as a point. A camera sitting exactly on the origin has no direction to look
/// in and gets the identity view.
pub fn origin_facing_view(eye: Vec3) -> Mat4 {
    let target = (-eye).normalize_or_zero();
    if eye == target {
        return Mat4::IDENTITY;
    }
    Mat4::look_at_rh(eye, target, Vec3::Y)
}

/// Perspective projection with the fixed scene FOV and clip planes.
pub fn scene_projection(aspect: f32) -> Mat4 {
    Mat4::perspective_rh_gl(FOV_Y_DEGREES.to_radians(), aspect, Z_NEAR, Z_FAR)
}
