use glam::{Mat3, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Translation + rotation + non-uniform scale. Authoring-side transform;
/// the quaternion is expected to be unit within epsilon 1e-3 after
/// import (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub const QUAT_UNIT_EPSILON: f32 = 1e-3;

    pub fn is_quat_unit(&self) -> bool {
        (self.rotation.length() - 1.0).abs() <= Self::QUAT_UNIT_EPSILON
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Applies `m4`/`m3` in place: position by the full 4x4, rotation by
    /// the upper 3x3, and scale sign-preserving by the upper 3x3 (spec
    /// §4.4 `apply_root_transform`).
    pub fn apply_transform(&mut self, m4: &Mat4, m3: &Mat3) {
        self.translation = m4.transform_point3(self.translation);
        self.rotation = apply_to_quat(m3, self.rotation);
        self.scale = rotate_scale_factors(m3, self.scale);
    }
}

/// Rotates the vector part of a quaternion by `m` (spec §4.4: treats
/// the quaternion's xyz as a vec3 and leaves w untouched before
/// re-deriving it is NOT done here — the source reinterprets the
/// quaternion's xyz in place, matching `apply_transform(mat3, quat&)`
/// in `original_source/src/scene/modifier_scene.cpp`).
pub(crate) fn apply_to_quat(m: &Mat3, q: Quat) -> Quat {
    let v = Vec3::new(q.x, q.y, q.z);
    let rotated = *m * v;
    Quat::from_xyzw(rotated.x, rotated.y, rotated.z, q.w)
}

fn combine_abs_value_and_sign(abs_value: f32, sign: f32) -> f32 {
    if abs_value < 0.0 {
        if sign < 0.0 {
            abs_value
        } else {
            -abs_value
        }
    } else if sign < 0.0 {
        -abs_value
    } else {
        abs_value
    }
}

/// Rotates scale factors by `m`, preserving each axis' original sign
/// (spec §4.4: "scale sign-preserving by M3").
pub fn rotate_scale_factors(m: &Mat3, scale: Vec3) -> Vec3 {
    let rotated = *m * scale;
    Vec3::new(
        combine_abs_value_and_sign(rotated.x, scale.x),
        combine_abs_value_and_sign(rotated.y, scale.y),
        combine_abs_value_and_sign(rotated.z, scale.z),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_quat_is_unit() {
        assert!(Transform::default().is_quat_unit());
    }

    #[test]
    fn scale_sign_is_preserved_under_identity_rotation() {
        let scale = Vec3::new(-1.0, 2.0, -3.0);
        let out = rotate_scale_factors(&Mat3::IDENTITY, scale);
        assert_eq!(out, scale);
    }
}
