//! Per-frame camera and object matrices

use crate::foundation::math::{constants, Mat4, Mat4Ext, Point3, Vec3};

/// Fixed camera placement and lens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    /// Eye position in world space
    pub eye: Point3,
    /// Point the camera looks at
    pub focus: Point3,
    /// World up direction
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            eye: Point3::new(0.0, 5.0, 10.0),
            focus: Point3::origin(),
            up: Vec3::y(),
            fov_y: constants::QUARTER_PI,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl CameraRig {
    /// Left-handed view matrix; the focus lands on the +Z view axis
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_lh(&self.eye, &self.focus, &self.up)
    }

    /// Left-handed projection for the given width/height ratio
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_fov_lh(self.fov_y, aspect, self.near, self.far)
    }
}

/// World, view and projection consumed by the draw call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSet {
    /// Object to world; identity for the whole session
    pub world: Mat4,
    /// World to view
    pub view: Mat4,
    /// View to clip
    pub projection: Mat4,
}

impl Default for TransformSet {
    fn default() -> Self {
        Self {
            world: Mat4::identity(),
            view: Mat4::identity(),
            projection: Mat4::identity(),
        }
    }
}

impl TransformSet {
    /// Recompute view and projection for the current output aspect ratio
    pub fn compute(camera: &CameraRig, aspect: f32) -> Self {
        Self {
            world: Mat4::identity(),
            view: camera.view(),
            projection: camera.projection(aspect),
        }
    }

    /// Combined object-to-clip matrix
    pub fn world_view_projection(&self) -> Mat4 {
        self.projection * self.view * self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compute_keeps_identity_world() {
        let transforms = TransformSet::compute(&CameraRig::default(), 16.0 / 9.0);
        assert_eq!(transforms.world, Mat4::identity());
    }

    #[test]
    fn test_view_places_focus_on_positive_z() {
        let camera = CameraRig::default();
        let view = camera.view();

        let focus_in_view = view.transform_point(&camera.focus);
        assert_relative_eq!(focus_in_view.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(focus_in_view.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(focus_in_view.z, (camera.eye - camera.focus).norm(), epsilon = 1e-5);

        let eye_in_view = view.transform_point(&camera.eye);
        assert_relative_eq!(eye_in_view.coords.norm(), 0.0, epsilon = 1e-5);
    }

    /// World up stays up in view space for a camera above the target
    #[test]
    fn test_view_keeps_up_positive() {
        let view = CameraRig::default().view();

        let above_focus = view.transform_point(&Point3::new(0.0, 1.0, 0.0));
        assert!(above_focus.y > 0.0);
    }

    #[test]
    fn test_origin_projects_to_screen_center() {
        let transforms = TransformSet::compute(&CameraRig::default(), 4.0 / 3.0);
        let clip = transforms.world_view_projection() * crate::foundation::math::Vec4::new(0.0, 0.0, 0.0, 1.0);

        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
        let depth = clip.z / clip.w;
        assert!(depth > 0.0 && depth < 1.0);
    }

    #[test]
    fn test_projection_tracks_aspect() {
        let camera = CameraRig::default();
        let wide = TransformSet::compute(&camera, 2.0);
        let square = TransformSet::compute(&camera, 1.0);

        assert_relative_eq!(wide.projection.projection_aspect(), 2.0, max_relative = 1e-6);
        assert_relative_eq!(square.projection.projection_aspect(), 1.0, max_relative = 1e-6);
        assert_eq!(wide.view, square.view);
    }
}
