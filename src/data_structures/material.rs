//! Surface materials as described by MTL libraries.

/// A named MTL material. Colours are linear RGB.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub ambient_color: [f32; 3],
    pub diffuse_color: [f32; 3],
    pub specular_color: [f32; 3],
    pub transmission_filter: [f32; 3],
    pub illumination_model: i32,
    pub dissolve_factor: f32,
    pub specular_exponent: f32,
    pub sharpness: f32,
    pub refraction_index: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient_color: [0.0; 3],
            diffuse_color: [0.0; 3],
            specular_color: [0.0; 3],
            transmission_filter: [0.0; 3],
            illumination_model: 1,
            dissolve_factor: 1.0,
            specular_exponent: 1.0,
            sharpness: 60.0,
            refraction_index: 1.0,
        }
    }
}

/**
 * The material as laid out in the uniform block `material` of a shader.
 * Every colour takes a full vec4 slot so the layout matches std140.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub ambient_color: [f32; 4],
    pub diffuse_color: [f32; 4],
    pub specular_color: [f32; 4],
    pub transmission_filter: [f32; 4],
    pub illumination_model: f32,
    pub dissolve_factor: f32,
    pub specular_exponent: f32,
    pub sharpness: f32,
    pub refraction_index: f32,
    pub _padding: [f32; 3],
}

impl Default for MaterialUniform {
    /// Unlit white, used for drawables without a resolvable material.
    fn default() -> Self {
        Self::from(&Material {
            ambient_color: [1.0; 3],
            diffuse_color: [1.0; 3],
            illumination_model: 0,
            ..Default::default()
        })
    }
}

fn rgba([r, g, b]: [f32; 3]) -> [f32; 4] {
    [r, g, b, 1.0]
}

impl From<&Material> for MaterialUniform {
    fn from(material: &Material) -> Self {
        Self {
            ambient_color: rgba(material.ambient_color),
            diffuse_color: rgba(material.diffuse_color),
            specular_color: rgba(material.specular_color),
            transmission_filter: rgba(material.transmission_filter),
            illumination_model: material.illumination_model as f32,
            dissolve_factor: material.dissolve_factor,
            specular_exponent: material.specular_exponent,
            sharpness: material.sharpness,
            refraction_index: material.refraction_index,
            _padding: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_std140_sized() {
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 96);
    }

    #[test]
    fn uniform_carries_material_values() {
        let material = Material {
            diffuse_color: [1.0, 0.0, 0.0],
            illumination_model: 2,
            ..Default::default()
        };
        let uniform = MaterialUniform::from(&material);
        assert_eq!(uniform.diffuse_color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(uniform.illumination_model, 2.0);
        assert_eq!(uniform.sharpness, 60.0);
    }
}
