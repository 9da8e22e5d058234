//! The fixed, non-commuting optimization pipeline (spec §4.4). Each
//! step is a free function operating on `Scene` in place; `optimize_scene`
//! runs them in the one order the pipeline is defined for.
//!
//! Grounded on `original_source/src/scene/modifier_scene.cpp`'s pass
//! ordering and on the individual helpers it names
//! (`JointParentNameManager`, `get_vital_joint_names`,
//! `MeshSplitterReg`), reworked as plain functions over the owned
//! `Scene` rather than the source's mutable-visitor-over-raw-pointers
//! style.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use glam::Mat3;
use log::info;

use super::transform::apply_to_quat;
use super::{Joint, JointType, Mesh, RenderPair, Scene, Transform};
use crate::error::DalResult;
use crate::image::{ImageSource, RasterImage};

const JOINT_EPSILON: f32 = 0.01;
const MAX_HIERARCHY_DEPTH: usize = 256;

/// Flips every vertex's V coordinate (`1 - v`). Importer pre-pass, run
/// before `optimize_scene` proper (spec §13).
pub fn flip_uv_vertically(scene: &mut Scene) {
    for mesh in &mut scene.meshes {
        for vertex in &mut mesh.vertices {
            let uv = vertex.uv_vec();
            vertex.uv = glam::Vec2::new(uv.x, 1.0 - uv.y).into();
        }
    }
}

/// Clears every actor's collection tag list. Importer pre-pass (spec §13).
pub fn clear_collection_info(scene: &mut Scene) {
    for actor in &mut scene.mesh_actors {
        actor.base.collections.clear();
    }
    for l in &mut scene.dlights {
        l.base.collections.clear();
    }
    for l in &mut scene.plights {
        l.base.collections.clear();
    }
    for l in &mut scene.slights {
        l.base.collections.clear();
    }
}

/// Step 1: rebuild each mesh's vertex/index arrays through dedup-then-emit.
pub fn reduce_indexed_vertices(mesh: &mut Mesh) {
    let old_vertices = std::mem::take(&mut mesh.vertices);
    let old_indices = std::mem::take(&mut mesh.indices);
    for idx in old_indices {
        let vertex = old_vertices[idx as usize].clone();
        mesh.add_vertex_deduped(vertex);
    }
}

/// Step 2: collapse physically-equal materials to the first survivor,
/// rewriting every render-pair's material name through the resulting map.
pub fn remove_duplicate_materials(scene: &mut Scene) {
    let mut survivors: Vec<crate::scene::Material> = Vec::new();
    let mut replace: HashMap<String, String> = HashMap::new();

    for material in std::mem::take(&mut scene.materials) {
        match survivors.iter().find(|s| s.is_physically_same(&material)) {
            Some(survivor) => {
                replace.insert(material.name.clone(), survivor.name.clone());
            }
            None => {
                replace.insert(material.name.clone(), material.name.clone());
                survivors.push(material);
            }
        }
    }
    scene.materials = survivors;

    for actor in &mut scene.mesh_actors {
        for rp in &mut actor.render_pairs {
            if let Some(canonical) = replace.get(&rp.material_name) {
                rp.material_name = canonical.clone();
            }
        }
    }
}

/// Step 3: fold each actor's render-pairs into the first earlier actor
/// sharing its merge key, leaving the folded actor's pairs empty.
pub fn merge_redundant_mesh_actors(scene: &mut Scene) {
    for i in 1..scene.mesh_actors.len() {
        let target = (0..i).find(|&j| scene.mesh_actors[j].base.merge_key_matches(&scene.mesh_actors[i].base));
        if let Some(j) = target {
            let pairs = std::mem::take(&mut scene.mesh_actors[i].render_pairs);
            scene.mesh_actors[j].render_pairs.extend(pairs);
        }
    }
}

fn point_in_closed_triangle(p: glam::Vec2, a: glam::Vec2, b: glam::Vec2, c: glam::Vec2) -> bool {
    let sign = |p1: glam::Vec2, p2: glam::Vec2, p3: glam::Vec2| -> f32 {
        (p1.x - p3.x) * (p2.y - p3.y) - (p2.x - p3.x) * (p1.y - p3.y)
    };
    let d1 = sign(p, a, b);
    let d2 = sign(p, b, c);
    let d3 = sign(p, c, a);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Samples `image`'s alpha channel inside the UV-triangle's integer-pixel
/// bounding box; true if any sampled pixel is alpha < 254 (spec §4.4 step 4).
/// The bbox is left unclamped (tiled UVs commonly fall outside `[0,1]`);
/// each sampled coordinate is wrapped into range with `rem_euclid` before
/// the lookup, matching the original's modulo texel addressing.
fn triangle_is_transparent(uvs: [glam::Vec2; 3], image: &dyn ImageSource) -> bool {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return false;
    }
    let px: Vec<glam::Vec2> = uvs
        .iter()
        .map(|uv| glam::Vec2::new(uv.x * w as f32, uv.y * h as f32))
        .collect();

    let min_x = px.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).floor() as i32;
    let max_x = px.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max).ceil() as i32;
    let min_y = px.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).floor() as i32;
    let max_y = px.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max).ceil() as i32;

    let (w_i, h_i) = (w as i32, h as i32);
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let center = glam::Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            if point_in_closed_triangle(center, px[0], px[1], px[2]) {
                let wrapped_x = x.rem_euclid(w_i) as u32;
                let wrapped_y = y.rem_euclid(h_i) as u32;
                let [_, _, _, a] = image.sample_rgba8(wrapped_x, wrapped_y);
                if a < 254 {
                    return true;
                }
            }
        }
    }
    false
}

fn triangle_is_transparent_in_any(uvs: [glam::Vec2; 3], images: &[RasterImage]) -> bool {
    images.iter().any(|image| triangle_is_transparent(uvs, image))
}

fn split_mesh_by_alpha(mesh: &Mesh, images: &[RasterImage]) -> (Mesh, Mesh) {
    let mut opaque = Mesh {
        name: mesh.name.clone(),
        skeleton_name: mesh.skeleton_name.clone(),
        ..Default::default()
    };
    let mut transp = Mesh {
        name: format!("{}#transp", mesh.name),
        skeleton_name: mesh.skeleton_name.clone(),
        ..Default::default()
    };

    for tri in mesh.indices.chunks(3) {
        if tri.len() < 3 {
            continue;
        }
        let verts = [
            &mesh.vertices[tri[0] as usize],
            &mesh.vertices[tri[1] as usize],
            &mesh.vertices[tri[2] as usize],
        ];
        let uvs = [verts[0].uv_vec(), verts[1].uv_vec(), verts[2].uv_vec()];

        let target = if triangle_is_transparent_in_any(uvs, images) {
            &mut transp
        } else {
            &mut opaque
        };
        for v in verts {
            target.add_vertex_deduped(v.clone());
        }
    }
    (opaque, transp)
}

/// Step 4: duplicate every material into an opaque/`#transp` pair, then
/// split each rendered mesh's triangles by sampled albedo alpha.
pub fn split_by_transparency(scene: &mut Scene, asset_dir: &Path) -> DalResult<()> {
    let mut new_materials = Vec::with_capacity(scene.materials.len() * 2);
    for material in &scene.materials {
        let mut opaque = material.clone();
        opaque.transparency = false;
        let mut transp = material.clone();
        transp.name = format!("{}#transp", material.name);
        transp.transparency = true;
        new_materials.push(opaque);
        new_materials.push(transp);
    }
    new_materials.sort_by(|a, b| a.name.cmp(&b.name));
    scene.materials = new_materials;

    // Every material referencing a given mesh_name (in first-seen order,
    // deduped) — a mesh rendered with several materials is split using
    // the union of all their albedo textures' transparency, and every
    // render-pair naming that mesh gets rewritten, not just the pair
    // that happened to be sampled.
    let mut mesh_materials: Vec<(String, Vec<String>)> = Vec::new();
    for actor in &scene.mesh_actors {
        for rp in &actor.render_pairs {
            match mesh_materials.iter_mut().find(|(m, _)| *m == rp.mesh_name) {
                Some((_, materials)) => {
                    if !materials.contains(&rp.material_name) {
                        materials.push(rp.material_name.clone());
                    }
                }
                None => mesh_materials.push((rp.mesh_name.clone(), vec![rp.material_name.clone()])),
            }
        }
    }

    let mut new_meshes = Vec::new();
    for (mesh_name, material_names) in &mesh_materials {
        let mesh = match scene.find_mesh_by_name(mesh_name) {
            Some(m) => m.clone(),
            None => continue,
        };

        let mut images = Vec::new();
        for material_name in material_names {
            let material = match scene.find_material_by_name(material_name) {
                Some(m) => m,
                None => continue,
            };
            if material.albedo_map.is_empty() {
                continue;
            }
            let path = asset_dir.join(&material.albedo_map);
            images.push(RasterImage::load_from_path(&path)?);
        }
        if images.is_empty() {
            continue;
        }

        let (opaque_mesh, transp_mesh) = split_mesh_by_alpha(&mesh, &images);

        if let Some(slot) = scene.find_mesh_by_name_mut(mesh_name) {
            *slot = opaque_mesh;
        }
        if !transp_mesh.indices.is_empty() {
            new_meshes.push((mesh_name.clone(), transp_mesh));
        }
    }

    for (mesh_name, transp_mesh) in new_meshes {
        scene.meshes.push(transp_mesh);
        for actor in &mut scene.mesh_actors {
            let matching_materials: Vec<String> = actor
                .render_pairs
                .iter()
                .filter(|rp| rp.mesh_name == mesh_name)
                .map(|rp| rp.material_name.clone())
                .collect();
            for material_name in matching_materials {
                actor.render_pairs.push(RenderPair {
                    mesh_name: format!("{}#transp", mesh_name),
                    material_name: format!("{}#transp", material_name),
                });
            }
        }
    }

    Ok(())
}

/// Step 5: drop indexless meshes, the render-pairs that named them, and
/// any actor left with no pairs and an identity transform, reparenting
/// its children to its own parent. Runs to a fixed point so removal
/// chains resolve to the nearest surviving ancestor.
pub fn remove_empty_meshes(scene: &mut Scene) {
    let empty_names: HashSet<String> = scene
        .meshes
        .iter()
        .filter(|m| m.indices.is_empty())
        .map(|m| m.name.clone())
        .collect();
    scene.meshes.retain(|m| !m.indices.is_empty());
    for actor in &mut scene.mesh_actors {
        actor.render_pairs.retain(|rp| !empty_names.contains(&rp.mesh_name));
    }

    loop {
        let victims: Vec<(String, String)> = scene
            .mesh_actors
            .iter()
            .filter(|a| a.render_pairs.is_empty() && a.base.transform == Transform::default())
            .map(|a| (a.base.name.clone(), a.base.parent_name.clone()))
            .collect();
        if victims.is_empty() {
            break;
        }

        for (victim_name, victim_parent) in &victims {
            for actor in &mut scene.mesh_actors {
                if actor.base.parent_name == *victim_name {
                    actor.base.parent_name = victim_parent.clone();
                }
            }
            for l in &mut scene.dlights {
                if l.base.parent_name == *victim_name {
                    l.base.parent_name = victim_parent.clone();
                }
            }
            for l in &mut scene.plights {
                if l.base.parent_name == *victim_name {
                    l.base.parent_name = victim_parent.clone();
                }
            }
            for l in &mut scene.slights {
                if l.base.parent_name == *victim_name {
                    l.base.parent_name = victim_parent.clone();
                }
            }
        }

        let victim_names: HashSet<&str> = victims.iter().map(|(n, _)| n.as_str()).collect();
        scene.mesh_actors.retain(|a| !victim_names.contains(a.base.name.as_str()));
    }
}

fn nearest_surviving_ancestor(skeleton: &crate::scene::Skeleton, start_parent: &str, survivors: &HashSet<&str>) -> String {
    let mut current = start_parent.to_string();
    let mut depth = 0;
    while !current.is_empty() && !survivors.contains(current.as_str()) {
        depth += 1;
        if depth > MAX_HIERARCHY_DEPTH {
            break;
        }
        match skeleton.joints.iter().find(|j| j.name == current) {
            Some(parent) => current = parent.parent_name.clone(),
            None => break,
        }
    }
    current
}

fn reduce_skeleton(
    skeleton: &crate::scene::Skeleton,
    animations: &[crate::scene::Animation],
) -> (crate::scene::Skeleton, HashMap<i32, i32>) {
    let keyframed: HashSet<String> = animations
        .iter()
        .flat_map(|a| a.joints.iter())
        .filter(|j| !j.is_almost_identity(JOINT_EPSILON))
        .map(|j| j.name.clone())
        .collect();

    // `output` is the final vital set; `super_parents` seeds only from
    // hair-root/skirt-root joints and propagates to their descendants —
    // ordinary roots go straight into `output` but do not themselves
    // spread vitality to their children (matches `get_vital_joint_names`).
    let mut output: HashSet<String> = HashSet::new();
    let mut super_parents: HashSet<String> = HashSet::new();
    for joint in &skeleton.joints {
        if joint.is_root() {
            output.insert(joint.name.clone());
        }
        if joint.joint_type != JointType::Basic {
            super_parents.insert(joint.name.clone());
            output.insert(joint.name.clone());
        }
    }
    loop {
        let snapshot = super_parents.clone();
        let mut changed = false;
        for joint in &skeleton.joints {
            if !super_parents.contains(&joint.name) && snapshot.contains(&joint.parent_name) {
                super_parents.insert(joint.name.clone());
                output.insert(joint.name.clone());
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    let vital = output;

    let survivor_names: HashSet<&str> = skeleton
        .joints
        .iter()
        .filter(|j| vital.contains(&j.name) || keyframed.contains(&j.name))
        .map(|j| j.name.as_str())
        .collect();

    let mut new_joints = Vec::new();
    for joint in &skeleton.joints {
        if !survivor_names.contains(joint.name.as_str()) {
            continue;
        }
        let new_parent = if joint.parent_name.is_empty() || survivor_names.contains(joint.parent_name.as_str()) {
            joint.parent_name.clone()
        } else {
            nearest_surviving_ancestor(skeleton, &joint.parent_name, &survivor_names)
        };
        new_joints.push(Joint {
            name: joint.name.clone(),
            parent_name: new_parent,
            joint_type: joint.joint_type,
            offset_mat: joint.offset_mat,
        });
    }

    let new_index_of: HashMap<&str, i32> = new_joints
        .iter()
        .enumerate()
        .map(|(i, j)| (j.name.as_str(), i as i32))
        .collect();
    let index_map: HashMap<i32, i32> = skeleton
        .joints
        .iter()
        .enumerate()
        .map(|(i, j)| (i as i32, *new_index_of.get(j.name.as_str()).unwrap_or(&-1)))
        .collect();

    (
        crate::scene::Skeleton {
            name: skeleton.name.clone(),
            root_transform: skeleton.root_transform,
            joints: new_joints,
        },
        index_map,
    )
}

/// Step 6: per skeleton, shrink to the survivor set (vital joints ∪
/// non-identity-keyframed joints), reparenting removed joints' children
/// onto the nearest surviving ancestor, and remap every bound vertex's
/// joint indices.
pub fn reduce_joints(scene: &mut Scene) {
    let skeletons = std::mem::take(&mut scene.skeletons);
    let mut new_skeletons = Vec::with_capacity(skeletons.len());

    for skeleton in skeletons {
        let (new_skeleton, index_map) = reduce_skeleton(&skeleton, &scene.animations);
        for mesh in &mut scene.meshes {
            if mesh.skeleton_name != skeleton.name {
                continue;
            }
            for vertex in &mut mesh.vertices {
                for influence in &mut vertex.joints {
                    if influence.joint_id != -1 {
                        influence.joint_id = *index_map.get(&influence.joint_id).unwrap_or(&-1);
                    }
                }
            }
        }
        new_skeletons.push(new_skeleton);
    }

    scene.skeletons = new_skeletons;
}

/// Step 7: bake `scene.root_transform` into vertices, joint offsets,
/// translation/rotation keyframes and actor transforms, then reset the
/// root transform to identity.
pub fn apply_root_transform(scene: &mut Scene) {
    let m4 = scene.root_transform.to_mat4();
    let m3 = Mat3::from_mat4(m4);
    let m4_inv = m4.inverse();

    for mesh in &mut scene.meshes {
        for vertex in &mut mesh.vertices {
            let pos = m4.transform_point3(vertex.pos());
            let normal = (m3 * vertex.normal_vec()).normalize_or_zero();
            vertex.position = pos.into();
            vertex.normal = normal.into();
        }
    }

    for skeleton in &mut scene.skeletons {
        for joint in &mut skeleton.joints {
            joint.offset_mat = m4 * joint.offset_mat * m4_inv;
        }
    }

    for anim in &mut scene.animations {
        for joint in &mut anim.joints {
            for (_, t) in &mut joint.translations {
                *t = m4.transform_point3(*t);
            }
            for (_, r) in &mut joint.rotations {
                *r = apply_to_quat(&m3, *r);
            }
        }
    }

    for actor in &mut scene.mesh_actors {
        actor.base.transform.apply_transform(&m4, &m3);
    }
    for l in &mut scene.dlights {
        l.base.transform.apply_transform(&m4, &m3);
    }
    for l in &mut scene.plights {
        l.base.transform.apply_transform(&m4, &m3);
    }
    for l in &mut scene.slights {
        l.base.transform.apply_transform(&m4, &m3);
    }

    scene.root_transform = Transform::default();
}

/// Runs the seven-step pipeline in the one fixed order it's defined for.
pub fn optimize_scene(scene: &mut Scene, asset_dir: &Path) -> DalResult<()> {
    for mesh in &mut scene.meshes {
        reduce_indexed_vertices(mesh);
    }
    info!("reduce_indexed_vertices: {} meshes", scene.meshes.len());

    remove_duplicate_materials(scene);
    info!("remove_duplicate_materials: {} materials remain", scene.materials.len());

    merge_redundant_mesh_actors(scene);

    split_by_transparency(scene, asset_dir)?;
    info!("split_by_transparency: {} meshes after split", scene.meshes.len());

    remove_empty_meshes(scene);
    info!("remove_empty_meshes: {} actors remain", scene.mesh_actors.len());

    reduce_joints(scene);
    apply_root_transform(scene);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ActorBase, JointInfluence, Material, MeshActor, Vertex};
    use glam::{Vec2, Vec3};

    fn vertex(x: f32) -> Vertex {
        Vertex {
            position: Vec3::new(x, 0.0, 0.0).into(),
            normal: Vec3::Z.into(),
            uv: Vec2::ZERO.into(),
            joints: Vec::new(),
        }
    }

    #[test]
    fn reduce_indexed_vertices_dedups_by_value() {
        let mut mesh = Mesh {
            name: "m".into(),
            vertices: vec![vertex(1.0), vertex(1.0), vertex(2.0)],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        reduce_indexed_vertices(&mut mesh);
        assert_eq!(mesh.vertices.len(), 2);
        assert_eq!(mesh.indices, vec![0, 0, 1]);
    }

    #[test]
    fn remove_duplicate_materials_collapses_and_rewrites_render_pairs() {
        let mut scene = Scene::default();
        scene.materials.push(Material {
            name: "a".into(),
            ..Default::default()
        });
        scene.materials.push(Material {
            name: "b".into(),
            ..Default::default()
        });
        scene.mesh_actors.push(MeshActor {
            base: ActorBase::default(),
            render_pairs: vec![RenderPair {
                mesh_name: "mesh".into(),
                material_name: "b".into(),
            }],
        });

        remove_duplicate_materials(&mut scene);
        assert_eq!(scene.materials.len(), 1);
        assert_eq!(scene.materials[0].name, "a");
        assert_eq!(scene.mesh_actors[0].render_pairs[0].material_name, "a");
    }

    #[test]
    fn merge_redundant_mesh_actors_folds_matching_keys() {
        let mut scene = Scene::default();
        scene.mesh_actors.push(MeshActor {
            base: ActorBase::default(),
            render_pairs: vec![RenderPair {
                mesh_name: "m1".into(),
                material_name: "mat".into(),
            }],
        });
        scene.mesh_actors.push(MeshActor {
            base: ActorBase::default(),
            render_pairs: vec![RenderPair {
                mesh_name: "m2".into(),
                material_name: "mat".into(),
            }],
        });

        merge_redundant_mesh_actors(&mut scene);
        assert_eq!(scene.mesh_actors[0].render_pairs.len(), 2);
        assert!(scene.mesh_actors[1].render_pairs.is_empty());
    }

    #[test]
    fn remove_empty_meshes_drops_orphaned_actors_and_reparents_children() {
        let mut scene = Scene::default();
        scene.meshes.push(Mesh {
            name: "empty".into(),
            ..Default::default()
        });
        scene.mesh_actors.push(MeshActor {
            base: ActorBase {
                name: "victim".into(),
                ..Default::default()
            },
            render_pairs: vec![RenderPair {
                mesh_name: "empty".into(),
                material_name: "mat".into(),
            }],
        });
        scene.mesh_actors.push(MeshActor {
            base: ActorBase {
                name: "child".into(),
                parent_name: "victim".into(),
                ..Default::default()
            },
            render_pairs: vec![RenderPair {
                mesh_name: "kept".into(),
                material_name: "mat".into(),
            }],
        });

        remove_empty_meshes(&mut scene);
        assert_eq!(scene.mesh_actors.len(), 1);
        assert_eq!(scene.mesh_actors[0].base.name, "child");
        assert_eq!(scene.mesh_actors[0].base.parent_name, "");
    }

    fn joint(name: &str, parent: &str, jtype: JointType) -> Joint {
        Joint {
            name: name.into(),
            parent_name: parent.into(),
            joint_type: jtype,
            offset_mat: glam::Mat4::IDENTITY,
        }
    }

    #[test]
    fn reduce_joints_keeps_vital_and_keyframed_then_is_idempotent() {
        let mut scene = Scene::default();
        scene.skeletons.push(crate::scene::Skeleton {
            name: "skel".into(),
            joints: vec![
                joint("root", "", JointType::Basic),
                joint("spine", "root", JointType::Basic),
                joint("prop", "spine", JointType::Basic),
                joint("hair_root", "spine", JointType::HairRoot),
                joint("hair_tip", "hair_root", JointType::Basic),
            ],
            ..Default::default()
        });
        scene.animations.push(crate::scene::Animation {
            name: "anim".into(),
            ticks_per_second: 30.0,
            joints: vec![crate::scene::AnimJoint {
                name: "spine".into(),
                translations: vec![(0.0, Vec3::new(1.0, 0.0, 0.0))],
                ..Default::default()
            }],
        });
        scene.meshes.push(Mesh {
            name: "mesh".into(),
            skeleton_name: "skel".into(),
            vertices: vec![Vertex {
                joints: vec![JointInfluence {
                    joint_id: 2,
                    weight: 1.0,
                }],
                ..Default::default()
            }],
            indices: vec![0],
        });

        reduce_joints(&mut scene);
        let names: Vec<&str> = scene.skeletons[0]
            .joints
            .iter()
            .map(|j| j.name.as_str())
            .collect();
        assert!(names.contains(&"root"));
        assert!(names.contains(&"spine"));
        assert!(names.contains(&"hair_root"));
        assert!(names.contains(&"hair_tip"));
        assert!(!names.contains(&"prop"));
        assert_eq!(scene.meshes[0].vertices[0].joints[0].joint_id, -1);

        let first_pass_count = scene.skeletons[0].joints.len();
        reduce_joints(&mut scene);
        assert_eq!(scene.skeletons[0].joints.len(), first_pass_count);
    }

    #[test]
    fn apply_root_transform_resets_root_and_moves_vertices() {
        let mut scene = Scene::default();
        scene.root_transform = Transform {
            translation: Vec3::new(5.0, 0.0, 0.0),
            ..Default::default()
        };
        scene.meshes.push(Mesh {
            name: "m".into(),
            vertices: vec![vertex(0.0)],
            indices: vec![0],
            ..Default::default()
        });

        apply_root_transform(&mut scene);
        assert_eq!(scene.root_transform, Transform::default());
        assert_eq!(scene.meshes[0].vertices[0].pos(), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn split_by_transparency_separates_triangles_by_sampled_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let mut img = image::RgbaImage::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                let alpha = if x >= 2 && y >= 2 { 128 } else { 255 };
                img.put_pixel(x, y, image::Rgba([200, 200, 200, alpha]));
            }
        }
        img.save(dir.path().join("tex.png")).unwrap();

        let mut scene = Scene::default();
        scene.materials.push(Material {
            name: "mat".into(),
            albedo_map: "tex.png".into(),
            ..Default::default()
        });
        let tri_opaque = |u: f32, v: f32| Vertex {
            uv: Vec2::new(u, v).into(),
            ..Default::default()
        };
        scene.meshes.push(Mesh {
            name: "m".into(),
            vertices: vec![
                tri_opaque(0.0, 0.0),
                tri_opaque(0.4, 0.0),
                tri_opaque(0.0, 0.4),
                tri_opaque(0.6, 0.6),
                tri_opaque(1.0, 0.6),
                tri_opaque(0.6, 1.0),
            ],
            indices: vec![0, 1, 2, 3, 4, 5],
            ..Default::default()
        });
        scene.mesh_actors.push(MeshActor {
            base: ActorBase::default(),
            render_pairs: vec![RenderPair {
                mesh_name: "m".into(),
                material_name: "mat".into(),
            }],
        });

        split_by_transparency(&mut scene, dir.path()).unwrap();

        assert_eq!(scene.meshes.len(), 2);
        let opaque = scene.find_mesh_by_name("m").unwrap();
        assert_eq!(opaque.indices.len(), 3);
        let transp = scene.find_mesh_by_name("m#transp").unwrap();
        assert_eq!(transp.indices.len(), 3);

        let actor = &scene.mesh_actors[0];
        assert!(actor
            .render_pairs
            .iter()
            .any(|rp| rp.mesh_name == "m" && rp.material_name == "mat"));
        assert!(actor
            .render_pairs
            .iter()
            .any(|rp| rp.mesh_name == "m#transp" && rp.material_name == "mat#transp"));
    }

    #[test]
    fn split_by_transparency_unions_materials_sharing_a_mesh() {
        let dir = tempfile::tempdir().unwrap();
        let mut opaque_tex = image::RgbaImage::new(2, 2);
        for p in opaque_tex.pixels_mut() {
            *p = image::Rgba([200, 200, 200, 255]);
        }
        opaque_tex.save(dir.path().join("opaque.png")).unwrap();

        let mut transp_tex = image::RgbaImage::new(2, 2);
        for p in transp_tex.pixels_mut() {
            *p = image::Rgba([200, 200, 200, 50]);
        }
        transp_tex.save(dir.path().join("transp.png")).unwrap();

        let mut scene = Scene::default();
        scene.materials.push(Material {
            name: "matA".into(),
            albedo_map: "opaque.png".into(),
            ..Default::default()
        });
        scene.materials.push(Material {
            name: "matB".into(),
            albedo_map: "transp.png".into(),
            ..Default::default()
        });
        scene.meshes.push(Mesh {
            name: "m".into(),
            vertices: vec![
                Vertex {
                    uv: Vec2::new(0.1, 0.1).into(),
                    ..Default::default()
                },
                Vertex {
                    uv: Vec2::new(0.6, 0.1).into(),
                    ..Default::default()
                },
                Vertex {
                    uv: Vec2::new(0.1, 0.6).into(),
                    ..Default::default()
                },
            ],
            indices: vec![0, 1, 2],
            ..Default::default()
        });
        scene.mesh_actors.push(MeshActor {
            base: ActorBase::default(),
            render_pairs: vec![
                RenderPair {
                    mesh_name: "m".into(),
                    material_name: "matA".into(),
                },
                RenderPair {
                    mesh_name: "m".into(),
                    material_name: "matB".into(),
                },
            ],
        });

        split_by_transparency(&mut scene, dir.path()).unwrap();

        // matA's texture is fully opaque on its own, but matB's texture
        // covering the same mesh is transparent there — the triangle must
        // be classified transparent from the union, not from matA alone.
        let transp = scene.find_mesh_by_name("m#transp").unwrap();
        assert_eq!(transp.indices.len(), 3);

        let actor = &scene.mesh_actors[0];
        assert!(actor
            .render_pairs
            .iter()
            .any(|rp| rp.mesh_name == "m#transp" && rp.material_name == "matA#transp"));
        assert!(actor
            .render_pairs
            .iter()
            .any(|rp| rp.mesh_name == "m#transp" && rp.material_name == "matB#transp"));
    }

    #[test]
    fn triangle_is_transparent_wraps_uvs_outside_unit_range() {
        struct TiledImage {
            w: u32,
            h: u32,
            texels: Vec<[u8; 4]>,
        }
        impl ImageSource for TiledImage {
            fn dimensions(&self) -> (u32, u32) {
                (self.w, self.h)
            }
            fn sample_rgba8(&self, x: u32, y: u32) -> [u8; 4] {
                let x = x % self.w;
                let y = y % self.h;
                self.texels[(y * self.w + x) as usize]
            }
        }
        // 2x1: texel 0 opaque, texel 1 transparent.
        let image = TiledImage {
            w: 2,
            h: 1,
            texels: vec![[0, 0, 0, 255], [0, 0, 0, 50]],
        };

        // UVs entirely past [0,1] (a second horizontal tile); in pixel
        // space this triangle sits at x in [3.2, 4.0], which wraps onto
        // texel 1 (transparent), not a clamped-in-range texel 1 as the
        // old `.min((w-1))` bbox clamp coincidentally also produced.
        let uvs = [
            glam::Vec2::new(1.6, 0.0),
            glam::Vec2::new(1.8, 1.0),
            glam::Vec2::new(2.0, 0.0),
        ];
        assert!(triangle_is_transparent(uvs, &image));
    }

    #[test]
    fn flip_uv_vertically_inverts_v_coordinate() {
        let mut scene = Scene::default();
        scene.meshes.push(Mesh {
            name: "m".into(),
            vertices: vec![Vertex {
                uv: Vec2::new(0.25, 0.25).into(),
                ..Default::default()
            }],
            ..Default::default()
        });
        flip_uv_vertically(&mut scene);
        assert_eq!(scene.meshes[0].vertices[0].uv_vec(), Vec2::new(0.25, 0.75));
    }
}
