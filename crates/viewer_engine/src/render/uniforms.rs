//! Uniform buffer layouts and camera math
//!
//! Matrices are stored column major as GLSL expects. The projection is
//! built for Vulkan clip conventions: depth in [0, 1] and Y pointing
//! down in clip space.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use nalgebra::{Matrix4, Point3, Rotation3, Vector3};

/// Per-image camera matrices (descriptor binding 0, vertex stage)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUbo {
    /// Model transform
    pub model: [[f32; 4]; 4],
    /// View transform
    pub view: [[f32; 4]; 4],
    /// Projection transform
    pub proj: [[f32; 4]; 4],
}

/// Per-image light data (descriptor binding 2, fragment stage)
///
/// vec3 members are padded to 16 bytes per std140.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightUbo {
    /// World-space light position
    pub position: [f32; 3],
    _pad0: f32,
    /// World-space viewer position
    pub view_position: [f32; 3],
    _pad1: f32,
}

/// Camera eye position
const EYE: [f32; 3] = [4.0, 4.0, 4.0];
/// Model spin rate, radians per second (90 degrees)
const SPIN_RATE: f32 = std::f32::consts::FRAC_PI_2;
const FOV_Y: f32 = std::f32::consts::FRAC_PI_4;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 10.0;

impl CameraUbo {
    /// Camera state at `elapsed` seconds of wall-clock animation
    pub fn at_time(elapsed: f32, extent: vk::Extent2D) -> Self {
        let model =
            Rotation3::from_axis_angle(&Vector3::z_axis(), elapsed * SPIN_RATE).to_homogeneous();

        let view = Matrix4::look_at_rh(
            &Point3::new(EYE[0], EYE[1], EYE[2]),
            &Point3::origin(),
            &Vector3::z(),
        );

        let aspect = extent.width as f32 / extent.height as f32;
        let proj = perspective_vk(FOV_Y, aspect, Z_NEAR, Z_FAR);

        Self {
            model: model.into(),
            view: view.into(),
            proj: proj.into(),
        }
    }
}

impl LightUbo {
    /// Fixed light above the model and the viewer position for speculars
    pub fn scene_light() -> Self {
        Self {
            position: [0.5, 0.5, 0.5],
            _pad0: 0.0,
            view_position: [2.0, 2.0, 2.0],
            _pad1: 0.0,
        }
    }
}

/// Right-handed perspective projection for Vulkan clip space
///
/// Depth maps to [0, 1] (near plane to 0, far plane to 1) and Y is
/// flipped so the image is not upside down under Vulkan's
/// top-left-origin framebuffer convention.
pub fn perspective_vk(fov_y: f32, aspect: f32, z_near: f32, z_far: f32) -> Matrix4<f32> {
    let f = 1.0 / (fov_y / 2.0).tan();

    #[rustfmt::skip]
    let proj = Matrix4::new(
        f / aspect, 0.0, 0.0,                          0.0,
        0.0,        -f,  0.0,                          0.0,
        0.0,        0.0, z_far / (z_near - z_far),     (z_near * z_far) / (z_near - z_far),
        0.0,        0.0, -1.0,                         0.0,
    );
    proj
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;

    const EPSILON: f32 = 1e-5;

    fn project(proj: &Matrix4<f32>, point: [f32; 3]) -> [f32; 3] {
        let clip = proj * Vector4::new(point[0], point[1], point[2], 1.0);
        [clip.x / clip.w, clip.y / clip.w, clip.z / clip.w]
    }

    #[test]
    fn test_depth_range_is_zero_to_one() {
        let proj = perspective_vk(FOV_Y, 4.0 / 3.0, Z_NEAR, Z_FAR);

        let near = project(&proj, [0.0, 0.0, -Z_NEAR]);
        assert_relative_eq!(near[2], 0.0, epsilon = EPSILON);

        let far = project(&proj, [0.0, 0.0, -Z_FAR]);
        assert_relative_eq!(far[2], 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_y_axis_is_flipped() {
        let proj = perspective_vk(FOV_Y, 1.0, Z_NEAR, Z_FAR);
        // A point above the camera axis lands in the lower half of clip space.
        let projected = project(&proj, [0.0, 1.0, -2.0]);
        assert!(projected[1] < 0.0);
    }

    #[test]
    fn test_model_spins_about_z() {
        // Two seconds at 90 deg/s is a half turn: x maps to -x.
        let ubo = CameraUbo::at_time(2.0, vk::Extent2D { width: 800, height: 600 });
        let model = Matrix4::from(ubo.model);
        let rotated = model * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(rotated.x, -1.0, epsilon = EPSILON);
        assert_relative_eq!(rotated.y, 0.0, epsilon = EPSILON);
        assert_relative_eq!(rotated.z, 0.0, epsilon = EPSILON);
    }

    #[test]
    fn test_ubo_sizes_are_std140_compatible() {
        assert_eq!(std::mem::size_of::<CameraUbo>(), 3 * 64);
        assert_eq!(std::mem::size_of::<LightUbo>(), 32);
    }
}
