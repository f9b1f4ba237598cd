use glam::{const_vec3, EulerRot, Mat3, Mat4, Quat, Vec3};

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: const_vec3!([0., 0., 10.]),
            target: Vec3::ZERO,
            fov: 50.,
            aspect_ratio: 16. / 9.,
            near: 0.1,
            far: 2000.,
        }
    }
}

impl Camera {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov.to_radians(),
            self.aspect_ratio,
            self.near,
            self.far,
        )
    }
}

/// Linear fog by view depth, blending towards `color`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Fog {
    pub color: Vec3,
    pub near: f32,
    pub far: f32,
}

impl Default for Fog {
    fn default() -> Self {
        let grey = srgb_to_linear(0x11 as f32 / 255.);
        Self {
            color: Vec3::splat(grey),
            near: 10.01,
            far: 15.,
        }
    }
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Where the backdrop sits and the point billboards turn towards.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Anchor {
    pub position: Vec3,
    pub look_target: Vec3,
}

impl Anchor {
    /// Anchor at `position` whose look target sits 3 units in front of it.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            look_target: position + const_vec3!([0., 0., 3.]),
        }
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self::at(const_vec3!([3., -0.8, 0.]))
    }
}

pub fn euler_rotation(angles: Vec3) -> Quat {
    Quat::from_euler(EulerRot::XYZ, angles.x, angles.y, angles.z)
}

/// Rotation turning local +Z towards `direction`, keeping +Y as close to up as possible.
pub fn look_rotation(direction: Vec3) -> Quat {
    let forward = direction.normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let mut right = Vec3::Y.cross(forward);
    if right.length_squared() < 1e-8 {
        right = Vec3::X;
    }
    let right = right.normalize();
    let up = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_rotation_points_z_at_target() {
        for direction in [Vec3::X, -Vec3::Z, Vec3::new(1., 2., 3.), Vec3::Y, -Vec3::Y] {
            let rotation = look_rotation(direction);
            let facing = rotation * Vec3::Z;
            assert!(facing.distance(direction.normalize()) < 1e-4, "{:?}", direction);
        }
        assert_eq!(look_rotation(Vec3::ZERO), Quat::IDENTITY);
    }

    #[test]
    fn default_anchor_looks_out_of_the_backdrop() {
        let anchor = Anchor::default();
        assert_eq!(anchor.look_target - anchor.position, Vec3::new(0., 0., 3.));
    }

    #[test]
    fn fog_colour_matches_backdrop_grey() {
        let fog = Fog::default();
        assert!(fog.color.x > 0.0 && fog.color.x < 0.01);
        assert!(fog.near < fog.far);
    }
}
