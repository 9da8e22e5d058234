use serde::{Deserialize, Serialize};

/// PBR material. "Physically equal" ignores `name`; "equal" requires
/// every field including `name` (spec §3). `transparency` is the one
/// field the two C++ source branches name `alpha_blend` and
/// `transparency_` — unified here (spec §9 open question).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
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
            name: String::new(),
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
    /// Equal in every field except `name`.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physically_same_ignores_name() {
        let mut a = Material {
            name: "a".into(),
            ..Default::default()
        };
        let mut b = Material {
            name: "b".into(),
            ..Default::default()
        };
        assert!(a.is_physically_same(&b));
        assert_ne!(a, b);

        a.roughness = 0.1;
        b.roughness = 0.2;
        assert!(!a.is_physically_same(&b));
    }
}
