use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// A single joint influence on a vertex: joint id + weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointInfluence {
    pub joint_id: i32,
    pub weight: f32,
}

/// Authoring-side vertex. Two vertices are value-equal iff every field
/// is bit-equal, including the ordered joints sequence (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Vertex {
    pub position: Vec3Bits,
    pub normal: Vec3Bits,
    pub uv: Vec2Bits,
    pub joints: Vec<JointInfluence>,
}

/// `Vec3`/`Vec2` newtypes with bit-exact `PartialEq`, so `Vertex`
/// equality matches spec's "bit-equal" dedup criterion rather than
/// `glam`'s IEEE-754-aware equality (which is the same for finite
/// values, but this keeps the invariant explicit and NaN-safe for
/// dedup purposes).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Vec3Bits(pub Vec3);

impl PartialEq for Vec3Bits {
    fn eq(&self, other: &Self) -> bool {
        self.0.x.to_bits() == other.0.x.to_bits()
            && self.0.y.to_bits() == other.0.y.to_bits()
            && self.0.z.to_bits() == other.0.z.to_bits()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Vec2Bits(pub Vec2);

impl PartialEq for Vec2Bits {
    fn eq(&self, other: &Self) -> bool {
        self.0.x.to_bits() == other.0.x.to_bits() && self.0.y.to_bits() == other.0.y.to_bits()
    }
}

impl From<Vec3> for Vec3Bits {
    fn from(v: Vec3) -> Self {
        Vec3Bits(v)
    }
}

impl From<Vec2> for Vec2Bits {
    fn from(v: Vec2) -> Self {
        Vec2Bits(v)
    }
}

impl Vertex {
    pub fn pos(&self) -> Vec3 {
        self.position.0
    }

    pub fn normal_vec(&self) -> Vec3 {
        self.normal.0
    }

    pub fn uv_vec(&self) -> Vec2 {
        self.uv.0
    }
}

/// Authoring-side mesh: unique name in the scene, optional skeleton
/// binding (empty => static), deduplicated vertex array, and an index
/// array where every index is `< vertices.len()`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Mesh {
    pub name: String,
    pub skeleton_name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn is_skinned(&self) -> bool {
        !self.skeleton_name.is_empty()
    }

    pub fn check_invariant(&self) -> Result<(), crate::error::DalError> {
        for &idx in &self.indices {
            if idx as usize >= self.vertices.len() {
                return Err(crate::error::DalError::InvariantViolation(format!(
                    "mesh '{}' has index {} but only {} vertices",
                    self.name,
                    idx,
                    self.vertices.len()
                )));
            }
        }
        Ok(())
    }

    /// Adds `vertex` to this mesh, deduplicating against the existing
    /// vertex array and returning the index used, dedup-then-emit per
    /// spec §4.4's `reduce_indexed_vertices`.
    pub fn add_vertex_deduped(&mut self, vertex: Vertex) -> u32 {
        if let Some(pos) = self.vertices.iter().position(|v| *v == vertex) {
            self.indices.push(pos as u32);
            return pos as u32;
        }
        let idx = self.vertices.len() as u32;
        self.vertices.push(vertex);
        self.indices.push(idx);
        idx
    }
}
