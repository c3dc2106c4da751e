//! Math utilities and types
//!
//! Thin aliases over `nalgebra` plus the left-handed [0, 1]-depth projection
//! nalgebra lacks. View matrices come from nalgebra's own
//! `Matrix4::look_at_lh`. Matrices are column-vector form: a point is
//! transformed as `m * p`.

pub use nalgebra::{Matrix4, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 4, the default vertical field of view
    pub const QUARTER_PI: f32 = PI * 0.25;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}

/// Extension trait for Mat4 with projection helpers
pub trait Mat4Ext {
    /// Left-handed perspective projection with a vertical field of view.
    ///
    /// View-space depth `near` maps to 0 and `far` maps to 1.
    fn perspective_fov_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Width/height ratio encoded in a projection built by `perspective_fov_lh`
    fn projection_aspect(&self) -> f32;
}

impl Mat4Ext for Mat4 {
    fn perspective_fov_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let y_scale = 1.0 / (fov_y * 0.5).tan();
        let depth_range = far / (far - near);

        let mut result = Mat4::zeros();
        result[(0, 0)] = y_scale / aspect;
        result[(1, 1)] = y_scale;
        result[(2, 2)] = depth_range;
        result[(2, 3)] = -near * depth_range;
        result[(3, 2)] = 1.0;
        result
    }

    fn projection_aspect(&self) -> f32 {
        self[(1, 1)] / self[(0, 0)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perspective_maps_near_and_far_to_unit_depth() {
        let proj = Mat4::perspective_fov_lh(constants::QUARTER_PI, 4.0 / 3.0, 0.1, 100.0);

        let near = proj * Vec4::new(0.0, 0.0, 0.1, 1.0);
        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);

        let far = proj * Vec4::new(0.0, 0.0, 100.0, 1.0);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_perspective_aspect_round_trips() {
        for &(width, height) in &[(800.0_f32, 600.0_f32), (1920.0, 1080.0), (320.0, 200.0), (1.0, 1.0)] {
            let proj = Mat4::perspective_fov_lh(constants::QUARTER_PI, width / height, 0.1, 100.0);
            assert_relative_eq!(proj.projection_aspect(), width / height, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_deg_to_rad() {
        assert_relative_eq!(utils::deg_to_rad(45.0), constants::QUARTER_PI);
        assert_relative_eq!(utils::deg_to_rad(180.0), constants::PI);
    }
}
