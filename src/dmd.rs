//! DMD binary model codec (spec §4.6): envelope (magic, compression
//! method, raw size) plus a flat payload of AABB, skeleton, animations,
//! and four homogeneous render-unit lists.
//!
//! Grounded on `original_source/src/dmd/exporter.cpp` and
//! `src/dmd/parser.cpp` for field order; the envelope's compression
//! dispatch matches `original_source/src/common/compression.cpp`'s
//! `compress_with_header` shape (already reused verbatim by
//! `compression::envelope_compress`, but DMD keeps its own method tag
//! rather than that helper's fixed deflate-only envelope, since DMD
//! must support method=0/1/2).

use crate::byte_codec::{ByteReader, ByteWriter};
use crate::compression::{brotli_compress, brotli_decompress, deflate_compress, deflate_decompress};
use crate::error::{DalError, DalResult};
use crate::model::{
    Aabb3, AnimJoint, Animation, IndexedVertex, IndexedVertexJoint, Joint, JointNamed, Material,
    MeshIndexed, MeshIndexedJoint, MeshStraight, MeshStraightJoint, Model, RenderUnit, Skeleton,
};
use crate::scene::JointType;

const MAGIC: &[u8; 8] = b"DALMODEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    None = 0,
    Deflate = 1,
    Brotli = 2,
}

impl CompressionMethod {
    fn from_i32(v: i32) -> DalResult<Self> {
        match v {
            0 => Ok(Self::None),
            1 => Ok(Self::Deflate),
            2 => Ok(Self::Brotli),
            other => Err(DalError::UnsupportedVersion(other as u64)),
        }
    }
}

fn write_material(w: &mut ByteWriter, m: &Material) {
    w.write_f32(m.roughness);
    w.write_f32(m.metallic);
    w.write_bool8(m.transparency);
    w.write_nt_string(&m.albedo_map);
    w.write_nt_string(&m.roughness_map);
    w.write_nt_string(&m.metallic_map);
    w.write_nt_string(&m.normal_map);
}

fn read_material(r: &mut ByteReader) -> DalResult<Material> {
    Ok(Material {
        roughness: r.read_f32()?,
        metallic: r.read_f32()?,
        transparency: r.read_bool8()?,
        albedo_map: r.read_nt_string()?,
        roughness_map: r.read_nt_string()?,
        metallic_map: r.read_nt_string()?,
        normal_map: r.read_nt_string()?,
    })
}

fn write_straight(w: &mut ByteWriter, mesh: &MeshStraight) {
    let v = mesh.positions.len() as i64;
    w.write_i64(v);
    for p in &mesh.positions {
        w.write_f32_arr(&[p.x, p.y, p.z]);
    }
    for uv in &mesh.uvs {
        w.write_f32_arr(&[uv.x, uv.y]);
    }
    for n in &mesh.normals {
        w.write_f32_arr(&[n.x, n.y, n.z]);
    }
}

fn read_straight(r: &mut ByteReader) -> DalResult<MeshStraight> {
    let v = r.read_i64()? as usize;
    let mut positions = Vec::with_capacity(v);
    for _ in 0..v {
        let a = r.read_f32_arr(3)?;
        positions.push(glam::Vec3::new(a[0], a[1], a[2]));
    }
    let mut uvs = Vec::with_capacity(v);
    for _ in 0..v {
        let a = r.read_f32_arr(2)?;
        uvs.push(glam::Vec2::new(a[0], a[1]));
    }
    let mut normals = Vec::with_capacity(v);
    for _ in 0..v {
        let a = r.read_f32_arr(3)?;
        normals.push(glam::Vec3::new(a[0], a[1], a[2]));
    }
    Ok(MeshStraight {
        positions,
        uvs,
        normals,
    })
}

fn write_straight_joint(w: &mut ByteWriter, mesh: &MeshStraightJoint) {
    let v = mesh.positions.len() as i64;
    w.write_i64(v);
    for p in &mesh.positions {
        w.write_f32_arr(&[p.x, p.y, p.z]);
    }
    for uv in &mesh.uvs {
        w.write_f32_arr(&[uv.x, uv.y]);
    }
    for n in &mesh.normals {
        w.write_f32_arr(&[n.x, n.y, n.z]);
    }
    for wt in &mesh.joint_weights {
        w.write_f32_arr(wt);
    }
    for ji in &mesh.joint_indices {
        w.write_i32_arr(ji);
    }
}

fn read_straight_joint(r: &mut ByteReader) -> DalResult<MeshStraightJoint> {
    let v = r.read_i64()? as usize;
    let mut positions = Vec::with_capacity(v);
    for _ in 0..v {
        let a = r.read_f32_arr(3)?;
        positions.push(glam::Vec3::new(a[0], a[1], a[2]));
    }
    let mut uvs = Vec::with_capacity(v);
    for _ in 0..v {
        let a = r.read_f32_arr(2)?;
        uvs.push(glam::Vec2::new(a[0], a[1]));
    }
    let mut normals = Vec::with_capacity(v);
    for _ in 0..v {
        let a = r.read_f32_arr(3)?;
        normals.push(glam::Vec3::new(a[0], a[1], a[2]));
    }
    let mut joint_weights = Vec::with_capacity(v);
    for _ in 0..v {
        let a = r.read_f32_arr(4)?;
        joint_weights.push([a[0], a[1], a[2], a[3]]);
    }
    let mut joint_indices = Vec::with_capacity(v);
    for _ in 0..v {
        let a = r.read_i32_arr(4)?;
        joint_indices.push([a[0], a[1], a[2], a[3]]);
    }
    Ok(MeshStraightJoint {
        positions,
        uvs,
        normals,
        joint_weights,
        joint_indices,
    })
}

fn write_indexed(w: &mut ByteWriter, mesh: &MeshIndexed) {
    w.write_i64(mesh.vertices.len() as i64);
    for vtx in &mesh.vertices {
        w.write_f32_arr(&[vtx.position.x, vtx.position.y, vtx.position.z]);
        w.write_f32_arr(&[vtx.normal.x, vtx.normal.y, vtx.normal.z]);
        w.write_f32_arr(&[vtx.uv.x, vtx.uv.y]);
    }
    w.write_i64(mesh.indices.len() as i64);
    w.write_i32_arr(&mesh.indices);
}

fn read_indexed(r: &mut ByteReader) -> DalResult<MeshIndexed> {
    let v = r.read_i64()? as usize;
    let mut vertices = Vec::with_capacity(v);
    for _ in 0..v {
        let p = r.read_f32_arr(3)?;
        let n = r.read_f32_arr(3)?;
        let uv = r.read_f32_arr(2)?;
        vertices.push(IndexedVertex {
            position: glam::Vec3::new(p[0], p[1], p[2]),
            normal: glam::Vec3::new(n[0], n[1], n[2]),
            uv: glam::Vec2::new(uv[0], uv[1]),
        });
    }
    let i = r.read_i64()? as usize;
    let indices = r.read_i32_arr(i)?;
    Ok(MeshIndexed { vertices, indices })
}

fn write_indexed_joint(w: &mut ByteWriter, mesh: &MeshIndexedJoint) {
    w.write_i64(mesh.vertices.len() as i64);
    for vtx in &mesh.vertices {
        w.write_f32_arr(&[vtx.position.x, vtx.position.y, vtx.position.z]);
        w.write_f32_arr(&[vtx.normal.x, vtx.normal.y, vtx.normal.z]);
        w.write_f32_arr(&[vtx.uv.x, vtx.uv.y]);
        w.write_f32_arr(&vtx.joint_weights);
        w.write_i32_arr(&vtx.joint_indices);
    }
    w.write_i64(mesh.indices.len() as i64);
    w.write_i32_arr(&mesh.indices);
}

fn read_indexed_joint(r: &mut ByteReader) -> DalResult<MeshIndexedJoint> {
    let v = r.read_i64()? as usize;
    let mut vertices = Vec::with_capacity(v);
    for _ in 0..v {
        let p = r.read_f32_arr(3)?;
        let n = r.read_f32_arr(3)?;
        let uv = r.read_f32_arr(2)?;
        let wt = r.read_f32_arr(4)?;
        let ji = r.read_i32_arr(4)?;
        vertices.push(IndexedVertexJoint {
            position: glam::Vec3::new(p[0], p[1], p[2]),
            normal: glam::Vec3::new(n[0], n[1], n[2]),
            uv: glam::Vec2::new(uv[0], uv[1]),
            joint_weights: [wt[0], wt[1], wt[2], wt[3]],
            joint_indices: [ji[0], ji[1], ji[2], ji[3]],
        });
    }
    let i = r.read_i64()? as usize;
    let indices = r.read_i32_arr(i)?;
    Ok(MeshIndexedJoint { vertices, indices })
}

fn write_render_units<M>(w: &mut ByteWriter, units: &[RenderUnit<M>], write_mesh: impl Fn(&mut ByteWriter, &M)) {
    w.write_i64(units.len() as i64);
    for unit in units {
        w.write_nt_string(&unit.name);
        write_material(w, &unit.material);
        write_mesh(w, &unit.mesh);
    }
}

fn read_render_units<M>(
    r: &mut ByteReader,
    read_mesh: impl Fn(&mut ByteReader) -> DalResult<M>,
) -> DalResult<Vec<RenderUnit<M>>> {
    let count = r.read_i64()?;
    if count < 0 {
        return Err(DalError::Corrupted("negative render-unit count".into()));
    }
    let mut units = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = r.read_nt_string()?;
        let material = read_material(r)?;
        let mesh = read_mesh(r)?;
        units.push(RenderUnit { name, material, mesh });
    }
    Ok(units)
}

fn write_payload(model: &Model) -> Vec<u8> {
    let mut w = ByteWriter::new();

    w.write_f32_arr(&[model.aabb.min.x, model.aabb.min.y, model.aabb.min.z]);
    w.write_f32_arr(&[model.aabb.max.x, model.aabb.max.y, model.aabb.max.z]);

    match &model.skeleton {
        Some(skel) => {
            w.write_bool8(true);
            w.write_mat4(&skel.root_mat);
            w.write_i32(skel.joints.len() as i32);
            for j in &skel.joints {
                w.write_nt_string(&j.name);
                w.write_i32(j.joint.parent_index.map(|i| i as i32).unwrap_or(-1));
                w.write_i32(j.joint.joint_type as i32);
                w.write_mat4(&j.joint.offset_mat);
            }
        }
        None => {
            w.write_bool8(false);
            w.write_mat4(&glam::Mat4::IDENTITY);
            w.write_i32(0);
        }
    }

    w.write_i32(model.animations.len() as i32);
    for anim in &model.animations {
        w.write_nt_string(&anim.name);
        w.write_f32(anim.duration_ticks);
        w.write_f32(anim.ticks_per_second);
        w.write_i32(anim.joints.len() as i32);
        for joint in &anim.joints {
            w.write_nt_string(&joint.name);
            w.write_mat4(&glam::Mat4::IDENTITY);

            w.write_i32(joint.translations.len() as i32);
            for (t, v) in &joint.translations {
                w.write_f32(*t);
                w.write_f32_arr(&[v.x, v.y, v.z]);
            }
            w.write_i32(joint.rotations.len() as i32);
            for (t, q) in &joint.rotations {
                w.write_f32(*t);
                w.write_f32_arr(&[q.w, q.x, q.y, q.z]);
            }
            w.write_i32(joint.scales.len() as i32);
            for (t, s) in &joint.scales {
                w.write_f32(*t);
                w.write_f32(*s);
            }
        }
    }

    write_render_units(&mut w, &model.straight, write_straight);
    write_render_units(&mut w, &model.straight_joint, write_straight_joint);
    write_render_units(&mut w, &model.indexed, write_indexed);
    write_render_units(&mut w, &model.indexed_joint, write_indexed_joint);

    w.into_bytes()
}

fn read_payload(bytes: &[u8]) -> DalResult<Model> {
    let mut r = ByteReader::new(bytes);

    let min = r.read_f32_arr(3)?;
    let max = r.read_f32_arr(3)?;
    let aabb = Aabb3 {
        min: glam::Vec3::new(min[0], min[1], min[2]),
        max: glam::Vec3::new(max[0], max[1], max[2]),
    };

    let has_skeleton = r.read_bool8()?;
    let root_mat = r.read_mat4()?;
    let joint_count = r.read_i32()?;
    if joint_count < 0 {
        return Err(DalError::Corrupted("negative joint count".into()));
    }
    let mut joints = Vec::with_capacity(joint_count as usize);
    for _ in 0..joint_count {
        let name = r.read_nt_string()?;
        let parent_index = r.read_i32()?;
        let joint_type_tag = r.read_i32()?;
        let offset_mat = r.read_mat4()?;
        let joint_type = JointType::from_tag(joint_type_tag)
            .ok_or_else(|| DalError::Corrupted(format!("bad joint type tag {joint_type_tag}")))?;
        joints.push(JointNamed {
            name,
            joint: Joint {
                parent_index: if parent_index < 0 {
                    None
                } else {
                    Some(parent_index as u32)
                },
                joint_type,
                offset_mat,
            },
        });
    }
    let skeleton = if has_skeleton {
        Some(Skeleton { root_mat, joints })
    } else {
        None
    };

    let anim_count = r.read_i32()?;
    if anim_count < 0 {
        return Err(DalError::Corrupted("negative animation count".into()));
    }
    let mut animations = Vec::with_capacity(anim_count as usize);
    for _ in 0..anim_count {
        let name = r.read_nt_string()?;
        let duration_ticks = r.read_f32()?;
        let ticks_per_second = r.read_f32()?;
        let joint_count = r.read_i32()?;
        if joint_count < 0 {
            return Err(DalError::Corrupted("negative animation joint count".into()));
        }
        let mut anim_joints = Vec::with_capacity(joint_count as usize);
        for _ in 0..joint_count {
            let jname = r.read_nt_string()?;
            let _reserved = r.read_mat4()?;

            let tcount = r.read_i32()?;
            if tcount < 0 {
                return Err(DalError::Corrupted("negative translation count".into()));
            }
            let mut translations = Vec::with_capacity(tcount as usize);
            for _ in 0..tcount {
                let t = r.read_f32()?;
                let v = r.read_f32_arr(3)?;
                translations.push((t, glam::Vec3::new(v[0], v[1], v[2])));
            }

            let rcount = r.read_i32()?;
            if rcount < 0 {
                return Err(DalError::Corrupted("negative rotation count".into()));
            }
            let mut rotations = Vec::with_capacity(rcount as usize);
            for _ in 0..rcount {
                let t = r.read_f32()?;
                let q = r.read_f32_arr(4)?;
                rotations.push((t, glam::Quat::from_xyzw(q[1], q[2], q[3], q[0])));
            }

            let scount = r.read_i32()?;
            if scount < 0 {
                return Err(DalError::Corrupted("negative scale count".into()));
            }
            let mut scales = Vec::with_capacity(scount as usize);
            for _ in 0..scount {
                let t = r.read_f32()?;
                let s = r.read_f32()?;
                scales.push((t, s));
            }

            anim_joints.push(AnimJoint {
                name: jname,
                translations,
                rotations,
                scales,
            });
        }
        animations.push(Animation {
            name,
            duration_ticks,
            ticks_per_second,
            joints: anim_joints,
        });
    }

    let straight = read_render_units(&mut r, read_straight)?;
    let straight_joint = read_render_units(&mut r, read_straight_joint)?;
    let indexed = read_render_units(&mut r, read_indexed)?;
    let indexed_joint = read_render_units(&mut r, read_indexed_joint)?;

    if !r.is_eof() {
        return Err(DalError::Corrupted(format!(
            "{} trailing bytes after DMD payload",
            r.remaining()
        )));
    }

    Ok(Model {
        aabb,
        skeleton,
        animations,
        straight,
        straight_joint,
        indexed,
        indexed_joint,
    })
}

/// Encodes `model` with the given compression method into the DMD
/// envelope (spec §4.6).
pub fn encode_dmd(model: &Model, method: CompressionMethod) -> DalResult<Vec<u8>> {
    let payload = write_payload(model);
    let raw_size = payload.len() as i64;

    let compressed = match method {
        CompressionMethod::None => payload,
        CompressionMethod::Deflate => deflate_compress(&payload)?,
        CompressionMethod::Brotli => brotli_compress(&payload)?,
    };

    let mut w = ByteWriter::with_capacity(8 + 4 + 8 + compressed.len());
    w.write_raw(MAGIC);
    w.write_i32(method as i32);
    w.write_i64(raw_size);
    w.write_raw(&compressed);
    Ok(w.into_bytes())
}

/// Decodes a DMD envelope back into a `Model`.
pub fn decode_dmd(bytes: &[u8]) -> DalResult<Model> {
    let mut r = ByteReader::new(bytes);
    let magic = r.read_raw(8)?;
    if magic != MAGIC {
        return Err(DalError::MagicMismatch);
    }
    let method = CompressionMethod::from_i32(r.read_i32()?)?;
    let raw_size = r.read_i64()?;
    if raw_size < 0 {
        return Err(DalError::Corrupted("negative raw_size".into()));
    }
    let compressed = r.read_raw(r.remaining())?;

    let payload = match method {
        CompressionMethod::None => compressed.to_vec(),
        CompressionMethod::Deflate => deflate_decompress(compressed, raw_size as usize)?,
        CompressionMethod::Brotli => brotli_decompress(compressed, raw_size as usize)?,
    };
    if payload.len() as i64 != raw_size {
        return Err(DalError::Corrupted(
            "decompressed payload length mismatch".into(),
        ));
    }

    read_payload(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IndexedVertex;

    fn sample_model() -> Model {
        let mesh = MeshIndexed {
            vertices: vec![
                IndexedVertex {
                    position: glam::Vec3::ZERO,
                    normal: glam::Vec3::Z,
                    uv: glam::Vec2::ZERO,
                },
                IndexedVertex {
                    position: glam::Vec3::X,
                    normal: glam::Vec3::Z,
                    uv: glam::Vec2::new(1.0, 0.0),
                },
                IndexedVertex {
                    position: glam::Vec3::Y,
                    normal: glam::Vec3::Z,
                    uv: glam::Vec2::new(0.0, 1.0),
                },
            ],
            indices: vec![0, 1, 2],
        };
        Model {
            aabb: Aabb3 {
                min: glam::Vec3::ZERO,
                max: glam::Vec3::ONE,
            },
            skeleton: None,
            animations: Vec::new(),
            straight: Vec::new(),
            straight_joint: Vec::new(),
            indexed: vec![RenderUnit {
                name: "tri".into(),
                material: Material {
                    albedo_map: "a.png".into(),
                    ..Default::default()
                },
                mesh,
            }],
            indexed_joint: Vec::new(),
        }
    }

    #[test]
    fn round_trips_with_each_compression_method() {
        for method in [
            CompressionMethod::None,
            CompressionMethod::Deflate,
            CompressionMethod::Brotli,
        ] {
            let model = sample_model();
            let bytes = encode_dmd(&model, method).unwrap();
            let decoded = decode_dmd(&bytes).unwrap();
            assert_eq!(decoded, model);
        }
    }

    #[test]
    fn header_has_expected_shape() {
        let model = sample_model();
        let bytes = encode_dmd(&model, CompressionMethod::Brotli).unwrap();
        assert_eq!(&bytes[0..8], b"DALMODEL");
        let method = i32::from_le_bytes(bytes[8..12].try_into().unwrap());
        assert_eq!(method, 2);
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; 32];
        assert!(matches!(decode_dmd(&bytes), Err(DalError::MagicMismatch)));
    }

    #[test]
    fn preserves_a_present_skeleton_with_zero_joints_and_nonidentity_root_mat() {
        let mut model = sample_model();
        model.skeleton = Some(Skeleton {
            root_mat: glam::Mat4::from_translation(glam::Vec3::new(0.0, 3.0, 0.0)),
            joints: Vec::new(),
        });

        let bytes = encode_dmd(&model, CompressionMethod::None).unwrap();
        let decoded = decode_dmd(&bytes).unwrap();
        assert_eq!(decoded, model);
        assert!(decoded.skeleton.is_some());
    }

    #[test]
    fn rejects_trailing_bytes() {
        let model = sample_model();
        let mut bytes = encode_dmd(&model, CompressionMethod::None).unwrap();
        // appended byte makes the (uncompressed) payload one longer than
        // the raw_size recorded in the header.
        bytes.push(0xFF);
        assert!(decode_dmd(&bytes).is_err());
    }
}
