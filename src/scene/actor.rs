use serde::{Deserialize, Serialize};

use super::transform::Transform;

/// Fields every actor carries (spec §3's `IActor`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActorBase {
    pub name: String,
    pub parent_name: String,
    pub collections: Vec<String>,
    pub transform: Transform,
    pub hidden: bool,
}

impl ActorBase {
    /// Equality used by `merge_redundant_mesh_actors` (spec §4.4):
    /// parent name, collections, transform, and hidden flag must match
    /// exactly.
    pub fn merge_key_matches(&self, other: &ActorBase) -> bool {
        self.parent_name == other.parent_name
            && self.collections == other.collections
            && self.transform == other.transform
            && self.hidden == other.hidden
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderPair {
    pub mesh_name: String,
    pub material_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MeshActor {
    pub base: ActorBase,
    pub render_pairs: Vec<RenderPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LightCommon {
    pub color: [f32; 3],
    pub intensity: f32,
    pub has_shadow: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DirectionalLight {
    pub base: ActorBase,
    pub light: LightCommon,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PointLight {
    pub base: ActorBase,
    pub light: LightCommon,
    pub max_distance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Spotlight {
    pub base: ActorBase,
    pub light: LightCommon,
    pub max_distance: f32,
    pub spot_degree: f32,
    pub spot_blend: f32,
}
