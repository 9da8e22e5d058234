//! Authoring-facing scene graph (spec §3 "Scene (authoring)"). Built
//! once by the (out-of-scope) authoring importer, mutated only by the
//! pass pipeline in `passes.rs`, then consumed once by the model
//! converter.

pub mod actor;
pub mod animation;
pub mod material;
pub mod mesh;
pub mod passes;
pub mod skeleton;
pub mod transform;

pub use actor::{ActorBase, DirectionalLight, MeshActor, PointLight, RenderPair, Spotlight};
pub use animation::{AnimJoint, Animation};
pub use material::Material;
pub use mesh::{JointInfluence, Mesh, Vertex};
pub use skeleton::{Joint, JointType, Skeleton};
pub use transform::Transform;

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::error::{DalError, DalResult};

const MAX_HIERARCHY_DEPTH: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Scene {
    pub name: String,
    pub root_transform: Transform,

    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub skeletons: Vec<Skeleton>,
    pub animations: Vec<Animation>,

    pub mesh_actors: Vec<MeshActor>,
    pub dlights: Vec<DirectionalLight>,
    pub plights: Vec<PointLight>,
    pub slights: Vec<Spotlight>,
}

impl Scene {
    pub fn find_mesh_by_name(&self, name: &str) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.name == name)
    }

    pub fn find_mesh_by_name_mut(&mut self, name: &str) -> Option<&mut Mesh> {
        self.meshes.iter_mut().find(|m| m.name == name)
    }

    pub fn find_material_by_name(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name == name)
    }

    pub fn find_skeleton_by_name(&self, name: &str) -> Option<&Skeleton> {
        self.skeletons.iter().find(|s| s.name == name)
    }

    fn find_actor_base(&self, name: &str) -> Option<&ActorBase> {
        self.mesh_actors
            .iter()
            .map(|a| &a.base)
            .chain(self.dlights.iter().map(|a| &a.base))
            .chain(self.plights.iter().map(|a| &a.base))
            .chain(self.slights.iter().map(|a| &a.base))
            .find(|base| base.name == name)
    }

    /// Chains actor transforms from `actor` up to a root actor. If a
    /// parent name matches a skeleton rather than an actor, the climb
    /// stops there (spec §4.5). Cycles are detected via a bounded walk
    /// depth (spec §9 redesign note) and reported as
    /// `InvariantViolation`.
    pub fn make_hierarchy_transform(&self, actor: &MeshActor) -> DalResult<Mat4> {
        let mut chain = vec![actor.base.transform.to_mat4()];
        let mut current_parent = actor.base.parent_name.clone();
        let mut depth = 0usize;

        while !current_parent.is_empty() {
            depth += 1;
            if depth > MAX_HIERARCHY_DEPTH {
                return Err(DalError::InvariantViolation(format!(
                    "actor hierarchy exceeds max depth starting at '{}' (cycle?)",
                    actor.base.name
                )));
            }

            if self.find_skeleton_by_name(&current_parent).is_some() {
                break;
            }

            match self.find_actor_base(&current_parent) {
                Some(parent_base) => {
                    chain.push(parent_base.transform.to_mat4());
                    current_parent = parent_base.parent_name.clone();
                }
                None => break,
            }
        }

        let world = chain
            .iter()
            .rev()
            .fold(Mat4::IDENTITY, |acc, m| acc * *m);
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn actor(name: &str, parent: &str, translation: Vec3) -> MeshActor {
        MeshActor {
            base: ActorBase {
                name: name.into(),
                parent_name: parent.into(),
                transform: Transform {
                    translation,
                    ..Default::default()
                },
                ..Default::default()
            },
            render_pairs: Vec::new(),
        }
    }

    #[test]
    fn hierarchy_transform_chains_translations() {
        let mut scene = Scene::default();
        scene.mesh_actors.push(actor("root", "", Vec3::new(1.0, 0.0, 0.0)));
        scene
            .mesh_actors
            .push(actor("child", "root", Vec3::new(0.0, 2.0, 0.0)));

        let child = scene.mesh_actors[1].clone();
        let world = scene.make_hierarchy_transform(&child).unwrap();
        let p = world.transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn hierarchy_transform_stops_at_skeleton_name() {
        let mut scene = Scene::default();
        scene.skeletons.push(Skeleton {
            name: "skel".into(),
            ..Default::default()
        });
        scene
            .mesh_actors
            .push(actor("child", "skel", Vec3::new(5.0, 0.0, 0.0)));

        let child = scene.mesh_actors[0].clone();
        let world = scene.make_hierarchy_transform(&child).unwrap();
        let p = world.transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn hierarchy_transform_detects_cycles() {
        let mut scene = Scene::default();
        scene.mesh_actors.push(actor("a", "b", Vec3::ZERO));
        scene.mesh_actors.push(actor("b", "a", Vec3::ZERO));

        let a = scene.mesh_actors[0].clone();
        assert!(scene.make_hierarchy_transform(&a).is_err());
    }
}
