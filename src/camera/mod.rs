/// Camera system with orbit controls
/// Mouse drag rotates, zooms and pans around a target; WASDQE moves it
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Camera orbiting `-position` at `distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub x_angle: f32, // Rotation around X axis (radians)
    pub y_angle: f32, // Rotation around Y axis (radians)
    pub distance: f32,
    pub position: Vec3,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            x_angle: 0.0,
            y_angle: 0.0,
            distance: 0.0,
            position: Vec3::ZERO,
        }
    }
}

impl OrbitCamera {
    pub fn new(distance: f32, x_angle: f32, y_angle: f32) -> Self {
        Self {
            x_angle,
            y_angle,
            distance,
            position: Vec3::ZERO,
        }
    }

    #[inline]
    fn rotation(&self) -> Mat4 {
        Mat4::from_rotation_x(self.x_angle) * Mat4::from_rotation_y(self.y_angle)
    }

    /// Get view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, -self.distance))
            * self.rotation()
            * Mat4::from_translation(self.position)
    }

    /// Eye position in world space
    pub fn eye(&self) -> Vec3 {
        (self.view_matrix().inverse() * Vec4::W).truncate()
    }

    pub fn add_x_angle(&mut self, delta: f32) {
        self.x_angle += delta;
    }

    pub fn add_y_angle(&mut self, delta: f32) {
        self.y_angle += delta;
    }

    /// Zoom; the distance never becomes negative
    pub fn add_distance(&mut self, delta: f32) {
        self.distance = (self.distance + delta).max(0.0);
    }

    /// Move along one of the camera's own axes (0 = right, 1 = up, 2 = back)
    fn add_position_along(&mut self, axis: usize, delta: f32) {
        let row = self.rotation().row(axis).truncate();
        self.position += row * delta;
    }

    pub fn add_x_position(&mut self, delta: f32) {
        self.add_position_along(0, delta);
    }

    pub fn add_y_position(&mut self, delta: f32) {
        self.add_position_along(1, delta);
    }

    pub fn add_z_position(&mut self, delta: f32) {
        self.add_position_along(2, delta);
    }
}

/// Perspective projection; `far = inf` gives an infinite far plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub fovy: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            fovy: std::f32::consts::FRAC_PI_2,
            aspect_ratio: 1.0,
            near: 1.0,
            far: f32::INFINITY,
        }
    }
}

impl PerspectiveCamera {
    /// Get projection matrix (OpenGL clip space, z in [-w, w])
    pub fn projection_matrix(&self) -> Mat4 {
        if self.far.is_finite() {
            return Mat4::perspective_rh_gl(self.fovy, self.aspect_ratio, self.near, self.far);
        }
        let f = 1.0 / (self.fovy * 0.5).tan();
        Mat4::from_cols(
            Vec4::new(f / self.aspect_ratio, 0.0, 0.0, 0.0),
            Vec4::new(0.0, f, 0.0, 0.0),
            Vec4::new(0.0, 0.0, -1.0, -1.0),
            Vec4::new(0.0, 0.0, -2.0 * self.near, 0.0),
        )
    }

    /// Update aspect ratio (call when window resizes)
    pub fn set_aspect_ratio(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect_ratio = width as f32 / height as f32;
        }
    }
}

/// Which mouse buttons are held during a drag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseButtons {
    pub left: bool,
    pub middle: bool,
    pub right: bool,
}

/// Camera movement keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraKey {
    W,
    S,
    A,
    D,
    Q,
    E,
}

/// Camera controller - turns input into orbit camera updates
#[derive(Debug, Clone, Copy)]
pub struct CameraController {
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub buttons: MouseButtons,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            sensitivity: 0.01,
            zoom_speed: 0.1,
            buttons: MouseButtons::default(),
        }
    }
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Left drag rotates, right drag zooms, middle drag pans
    pub fn mouse_motion(&self, camera: &mut OrbitCamera, delta: Vec2, window: Vec2) {
        if self.buttons.left {
            camera.add_x_angle(delta.y * self.sensitivity);
            camera.add_y_angle(delta.x * self.sensitivity);
        }
        if self.buttons.right {
            camera.add_distance(delta.y * self.zoom_speed);
        }
        if self.buttons.middle && window.x > 0.0 && window.y > 0.0 {
            camera.add_x_position(camera.distance * delta.x / window.x * 2.0);
            camera.add_y_position(-camera.distance * delta.y / window.y * 2.0);
        }
    }

    /// One key press; `slow` (shift) moves a tenth of the step
    pub fn key(&self, camera: &mut OrbitCamera, key: CameraKey, slow: bool) {
        let speed = if slow { 0.1 } else { 1.0 };
        match key {
            CameraKey::A => camera.add_x_position(speed),
            CameraKey::D => camera.add_x_position(-speed),
            CameraKey::W => camera.add_z_position(speed),
            CameraKey::S => camera.add_z_position(-speed),
            CameraKey::E => camera.add_y_position(-speed),
            CameraKey::Q => camera.add_y_position(speed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_sits_at_orbit_distance() {
        let camera = OrbitCamera::new(35.0, 0.0, (-20.0f32).to_radians());
        assert!((camera.eye().length() - 35.0).abs() < 1e-3);
        // no rotation: eye on +Z looking at the origin
        let straight = OrbitCamera::new(10.0, 0.0, 0.0);
        assert!((straight.eye() - Vec3::new(0.0, 0.0, 10.0)).length() < 1e-5);
    }

    #[test]
    fn infinite_projection_maps_near_plane_to_minus_one() {
        let proj = PerspectiveCamera { near: 0.5, ..PerspectiveCamera::default() }.projection_matrix();
        let clip = proj * Vec4::new(0.0, 0.0, -0.5, 1.0);
        assert!((clip.z / clip.w + 1.0).abs() < 1e-6);
        let far = proj * Vec4::new(0.0, 0.0, -1e6, 1.0);
        assert!(far.z / far.w < 1.0);
    }

    #[test]
    fn pan_moves_target_in_camera_plane() {
        let mut camera = OrbitCamera::new(10.0, 0.0, 0.0);
        CameraController::new().key(&mut camera, CameraKey::A, false);
        assert_eq!(camera.position, Vec3::new(1.0, 0.0, 0.0));
        CameraController::new().key(&mut camera, CameraKey::Q, true);
        assert!((camera.position.y - 0.1).abs() < 1e-6);
    }

    #[test]
    fn zoom_does_not_go_negative() {
        let mut camera = OrbitCamera::new(1.0, 0.0, 0.0);
        let controller = CameraController {
            buttons: MouseButtons { right: true, ..MouseButtons::default() },
            ..CameraController::default()
        };
        controller.mouse_motion(&mut camera, Vec2::new(0.0, -100.0), Vec2::new(500.0, 500.0));
        assert_eq!(camera.distance, 0.0);
    }
}
