//! Scene → Model conversion (spec §4.5). Consumes a `Scene` that has
//! already been through `scene::passes::optimize_scene` and produces a
//! `Model` ready for DMD encoding.

use glam::Mat3;
use std::collections::HashMap;

use super::{
    Aabb3, AnimJoint, Animation, IndexedVertex, IndexedVertexJoint, Joint, JointNamed, Material,
    MeshIndexed, MeshIndexedJoint, Model, RenderUnit, Skeleton,
};
use crate::error::{DalError, DalResult};
use crate::scene::Scene;

fn to_model_material(m: &crate::scene::Material) -> Material {
    Material {
        roughness: m.roughness,
        metallic: m.metallic,
        transparency: m.transparency,
        albedo_map: m.albedo_map.clone(),
        roughness_map: m.roughness_map.clone(),
        metallic_map: m.metallic_map.clone(),
        normal_map: m.normal_map.clone(),
    }
}

fn convert_skeleton(skeleton: &crate::scene::Skeleton) -> Skeleton {
    let index_of: HashMap<&str, u32> = skeleton
        .joints
        .iter()
        .enumerate()
        .map(|(i, j)| (j.name.as_str(), i as u32))
        .collect();

    let joints = skeleton
        .joints
        .iter()
        .map(|j| JointNamed {
            name: j.name.clone(),
            joint: Joint {
                parent_index: if j.parent_name.is_empty() {
                    None
                } else {
                    index_of.get(j.parent_name.as_str()).copied()
                },
                joint_type: j.joint_type,
                offset_mat: j.offset_mat,
            },
        })
        .collect();

    Skeleton {
        root_mat: skeleton.root_transform.to_mat4(),
        joints,
    }
}

fn convert_animation(anim: &crate::scene::Animation) -> Animation {
    Animation {
        name: anim.name.clone(),
        duration_ticks: anim.duration(),
        ticks_per_second: anim.ticks_per_second,
        joints: anim
            .joints
            .iter()
            .map(|j| AnimJoint {
                name: j.name.clone(),
                translations: j.translations.clone(),
                rotations: j.rotations.clone(),
                scales: j.scales.clone(),
            })
            .collect(),
    }
}

pub fn convert_scene_to_model(scene: &Scene) -> DalResult<Model> {
    if scene.skeletons.len() > 1 {
        return Err(DalError::MultipleSkeletons);
    }

    let mut model = Model {
        skeleton: scene.skeletons.first().map(convert_skeleton),
        animations: scene.animations.iter().map(convert_animation).collect(),
        ..Default::default()
    };

    let mut aabb = Aabb3::empty();

    for actor in &scene.mesh_actors {
        let world = scene.make_hierarchy_transform(actor)?;
        let world3 = Mat3::from_mat4(world);

        for rp in &actor.render_pairs {
            let mesh = scene
                .find_mesh_by_name(&rp.mesh_name)
                .ok_or_else(|| DalError::NameNotFound(rp.mesh_name.clone()))?;
            let material = scene
                .find_material_by_name(&rp.material_name)
                .ok_or_else(|| DalError::NameNotFound(rp.material_name.clone()))?;
            let model_material = to_model_material(material);

            if mesh.skeleton_name.is_empty() {
                let slot = model
                    .indexed
                    .iter_mut()
                    .find(|u| u.material.is_physically_same(&model_material));
                let unit = match slot {
                    Some(u) => u,
                    None => {
                        model.indexed.push(RenderUnit {
                            name: rp.mesh_name.clone(),
                            material: model_material,
                            mesh: MeshIndexed::default(),
                        });
                        model.indexed.last_mut().unwrap()
                    }
                };
                let base = unit.mesh.vertices.len() as i32;
                for vertex in &mesh.vertices {
                    let pos = world.transform_point3(vertex.pos());
                    let normal = (world3 * vertex.normal_vec()).normalize_or_zero();
                    aabb.expand(pos);
                    unit.mesh.vertices.push(IndexedVertex {
                        position: pos,
                        normal,
                        uv: vertex.uv_vec(),
                    });
                }
                for &idx in &mesh.indices {
                    unit.mesh.indices.push(base + idx as i32);
                }
            } else {
                let slot = model
                    .indexed_joint
                    .iter_mut()
                    .find(|u| u.material.is_physically_same(&model_material));
                let unit = match slot {
                    Some(u) => u,
                    None => {
                        model.indexed_joint.push(RenderUnit {
                            name: rp.mesh_name.clone(),
                            material: model_material,
                            mesh: MeshIndexedJoint::default(),
                        });
                        model.indexed_joint.last_mut().unwrap()
                    }
                };
                let base = unit.mesh.vertices.len() as i32;
                for vertex in &mesh.vertices {
                    let pos = world.transform_point3(vertex.pos());
                    let normal = (world3 * vertex.normal_vec()).normalize_or_zero();
                    aabb.expand(pos);

                    let mut weights = [0.0f32; 4];
                    let mut indices = [-1i32; 4];
                    for (slot, influence) in vertex.joints.iter().take(4).enumerate() {
                        weights[slot] = influence.weight;
                        indices[slot] = influence.joint_id;
                    }

                    unit.mesh.vertices.push(IndexedVertexJoint {
                        position: pos,
                        normal,
                        uv: vertex.uv_vec(),
                        joint_weights: weights,
                        joint_indices: indices,
                    });
                }
                for &idx in &mesh.indices {
                    unit.mesh.indices.push(base + idx as i32);
                }
            }
        }
    }

    model.aabb = if aabb.min.x.is_finite() {
        aabb
    } else {
        Aabb3::default()
    };

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ActorBase, Material as SceneMaterial, Mesh, MeshActor, RenderPair, Vertex};
    use glam::{Vec2, Vec3};

    #[test]
    fn converts_static_mesh_into_single_indexed_unit() {
        let mut scene = Scene::default();
        scene.materials.push(SceneMaterial {
            name: "mat".into(),
            ..Default::default()
        });
        scene.meshes.push(Mesh {
            name: "tri".into(),
            vertices: vec![
                Vertex {
                    position: Vec3::ZERO.into(),
                    normal: Vec3::Z.into(),
                    uv: Vec2::ZERO.into(),
                    joints: Vec::new(),
                },
                Vertex {
                    position: Vec3::X.into(),
                    normal: Vec3::Z.into(),
                    uv: Vec2::ZERO.into(),
                    joints: Vec::new(),
                },
                Vertex {
                    position: Vec3::Y.into(),
                    normal: Vec3::Z.into(),
                    uv: Vec2::ZERO.into(),
                    joints: Vec::new(),
                },
            ],
            indices: vec![0, 1, 2],
            ..Default::default()
        });
        scene.mesh_actors.push(MeshActor {
            base: ActorBase::default(),
            render_pairs: vec![RenderPair {
                mesh_name: "tri".into(),
                material_name: "mat".into(),
            }],
        });

        let model = convert_scene_to_model(&scene).unwrap();
        assert_eq!(model.indexed.len(), 1);
        assert_eq!(model.indexed[0].mesh.vertices.len(), 3);
        assert_eq!(model.indexed[0].mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn rejects_more_than_one_skeleton() {
        let mut scene = Scene::default();
        scene.skeletons.push(crate::scene::Skeleton {
            name: "a".into(),
            ..Default::default()
        });
        scene.skeletons.push(crate::scene::Skeleton {
            name: "b".into(),
            ..Default::default()
        });

        assert!(matches!(
            convert_scene_to_model(&scene),
            Err(DalError::MultipleSkeletons)
        ));
    }
}
