//! Runtime model data (spec §4 "Model (runtime)"): what the DMD codec
//! reads and writes. Unlike `scene`, mesh variants are a tagged sum
//! (spec §9 redesign note: "represent as a tagged sum ... the Model
//! carries four homogeneous collections rather than a heterogeneous
//! one") instead of the source's templated-vertex-type struct.

pub mod convert;

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        }
    }
}

impl Aabb3 {
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn expand(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }
}

/// Unlike `scene::Material`, the model-level material carries no name:
/// the render unit it's embedded in names the (mesh, material) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub roughness: f32,
    pub metallic: f32,
    pub transparency: bool,
    pub albedo_map: String,
    pub roughness_map: String,
    pub metallic_map: String,
    pub normal_map: String,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            roughness: 0.5,
            metallic: 1.0,
            transparency: false,
            albedo_map: String::new(),
            roughness_map: String::new(),
            metallic_map: String::new(),
            normal_map: String::new(),
        }
    }
}

impl Material {
    pub fn is_physically_same(&self, other: &Material) -> bool {
        self.roughness == other.roughness
            && self.metallic == other.metallic
            && self.transparency == other.transparency
            && self.albedo_map == other.albedo_map
            && self.roughness_map == other.roughness_map
            && self.metallic_map == other.metallic_map
            && self.normal_map == other.normal_map
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MeshStraight {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MeshStraightJoint {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub joint_weights: Vec<[f32; 4]>,
    pub joint_indices: Vec<[i32; 4]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexedVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MeshIndexed {
    pub vertices: Vec<IndexedVertex>,
    pub indices: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexedVertexJoint {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub joint_weights: [f32; 4],
    pub joint_indices: [i32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MeshIndexedJoint {
    pub vertices: Vec<IndexedVertexJoint>,
    pub indices: Vec<i32>,
}

/// One named (mesh, material) slot in one of the model's four
/// homogeneous render-unit lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderUnit<Mesh> {
    pub name: String,
    pub material: Material,
    pub mesh: Mesh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    /// Index into the skeleton's own joint list; `None` for roots.
    pub parent_index: Option<u32>,
    pub joint_type: crate::scene::JointType,
    pub offset_mat: Mat4,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointNamed {
    pub name: String,
    pub joint: Joint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub root_mat: Mat4,
    pub joints: Vec<JointNamed>,
}

impl Default for Skeleton {
    fn default() -> Self {
        Self {
            root_mat: Mat4::IDENTITY,
            joints: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimJoint {
    pub name: String,
    pub translations: Vec<(f32, Vec3)>,
    pub rotations: Vec<(f32, glam::Quat)>,
    pub scales: Vec<(f32, f32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    pub name: String,
    pub duration_ticks: f32,
    pub ticks_per_second: f32,
    pub joints: Vec<AnimJoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Model {
    pub aabb: Aabb3,
    pub skeleton: Option<Skeleton>,
    pub animations: Vec<Animation>,

    pub straight: Vec<RenderUnit<MeshStraight>>,
    pub straight_joint: Vec<RenderUnit<MeshStraightJoint>>,
    pub indexed: Vec<RenderUnit<MeshIndexed>>,
    pub indexed_joint: Vec<RenderUnit<MeshIndexedJoint>>,
}
