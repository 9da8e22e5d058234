use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A single joint's keyframe tracks. Empty-or-identity joints are
/// prunable by `reduce_joints` (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnimJoint {
    pub name: String,
    pub translations: Vec<(f32, Vec3)>,
    pub rotations: Vec<(f32, Quat)>,
    pub scales: Vec<(f32, f32)>,
}

impl AnimJoint {
    /// True iff every keyframe carries the identity value (translate
    /// zero, rotate identity, scale one) within `eps`.
    pub fn is_almost_identity(&self, eps: f32) -> bool {
        self.translations
            .iter()
            .all(|(_, v)| v.length() <= eps)
            && self
                .rotations
                .iter()
                .all(|(_, q)| (q.angle_between(Quat::IDENTITY)).abs() <= eps)
            && self.scales.iter().all(|(_, s)| (s - 1.0).abs() <= eps)
    }

    pub fn max_time(&self) -> f32 {
        let t = self
            .translations
            .iter()
            .map(|(t, _)| *t)
            .fold(0.0f32, f32::max);
        let r = self.rotations.iter().map(|(t, _)| *t).fold(0.0f32, f32::max);
        let s = self.scales.iter().map(|(t, _)| *t).fold(0.0f32, f32::max);
        t.max(r).max(s)
    }

    /// Strict nearest-neighbour (clamp-to-edge) sample: before the
    /// first keyframe or after the last, returns that edge's value; in
    /// between, returns whichever of the two bracketing keyframes is
    /// closer in time. Resolves spec §9's `AnimAssembler` ambiguity.
    pub fn sample_translation(&self, time: f32) -> Vec3 {
        sample_nearest(&self.translations, time).unwrap_or(Vec3::ZERO)
    }

    pub fn sample_rotation(&self, time: f32) -> Quat {
        sample_nearest(&self.rotations, time).unwrap_or(Quat::IDENTITY)
    }

    pub fn sample_scale(&self, time: f32) -> f32 {
        sample_nearest(&self.scales, time).unwrap_or(1.0)
    }
}

fn sample_nearest<T: Copy>(track: &[(f32, T)], time: f32) -> Option<T> {
    if track.is_empty() {
        return None;
    }
    if time <= track[0].0 {
        return Some(track[0].1);
    }
    if time >= track[track.len() - 1].0 {
        return Some(track[track.len() - 1].1);
    }
    let mut best = track[0];
    let mut best_dist = (track[0].0 - time).abs();
    for &(t, v) in track {
        let dist = (t - time).abs();
        if dist < best_dist {
            best_dist = dist;
            best = (t, v);
        }
    }
    Some(best.1)
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Animation {
    pub name: String,
    pub ticks_per_second: f32,
    pub joints: Vec<AnimJoint>,
}

impl Animation {
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Max time-point across all joints; at least 1 if empty (spec §3).
    pub fn duration(&self) -> f32 {
        let max = self
            .joints
            .iter()
            .map(|j| j.max_time())
            .fold(0.0f32, f32::max);
        max.max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_neighbour_clamps_at_edges() {
        let joint = AnimJoint {
            name: "j".into(),
            translations: vec![(0.0, Vec3::X), (10.0, Vec3::Y)],
            ..Default::default()
        };
        assert_eq!(joint.sample_translation(-5.0), Vec3::X);
        assert_eq!(joint.sample_translation(100.0), Vec3::Y);
        assert_eq!(joint.sample_translation(3.0), Vec3::X);
        assert_eq!(joint.sample_translation(7.0), Vec3::Y);
    }

    #[test]
    fn duration_defaults_to_one_when_empty() {
        let anim = Animation::default();
        assert_eq!(anim.duration(), 1.0);
    }

    #[test]
    fn identity_joint_is_prunable() {
        let joint = AnimJoint {
            name: "j".into(),
            translations: vec![(0.0, Vec3::ZERO)],
            rotations: vec![(0.0, Quat::IDENTITY)],
            scales: vec![(0.0, 1.0)],
        };
        assert!(joint.is_almost_identity(0.01));
    }
}
