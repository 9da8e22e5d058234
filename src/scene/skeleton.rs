use glam::Mat4;
use serde::{Deserialize, Serialize};

use super::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JointType {
    Basic = 0,
    HairRoot = 1,
    SkirtRoot = 2,
}

impl JointType {
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(JointType::Basic),
            1 => Some(JointType::HairRoot),
            2 => Some(JointType::SkirtRoot),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Joint {
    pub name: String,
    /// Empty means this joint is a root.
    pub parent_name: String,
    pub joint_type: JointType,
    pub offset_mat: Mat4,
}

impl Joint {
    pub fn is_root(&self) -> bool {
        self.parent_name.is_empty()
    }

    pub fn has_parent(&self) -> bool {
        !self.is_root()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Skeleton {
    pub name: String,
    pub root_transform: Transform,
    pub joints: Vec<Joint>,
}

impl Skeleton {
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }
}
