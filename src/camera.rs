// First-person camera

use glam::{Mat4, Vec2, Vec3, Vec4};
use winit::keyboard::KeyCode;

use crate::{
    device::{GraphicsDevice, Uniform},
    input::InputSource,
};

/// Keys that move the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveBindings {
    pub forward: KeyCode,
    pub back: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
}

impl Default for MoveBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            back: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub position: Vec3,
    /// Yaw and pitch in radians.
    pub angles: Vec2,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// World units per second.
    pub speed: f32,
    pub mouse_sensitivity: f32,
    pub bindings: MoveBindings,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            angles: Vec2::ZERO,
            fov: 60.0_f32.to_radians(),
            near: 0.01,
            far: 1000.0,
            speed: 30.0,
            mouse_sensitivity: 0.15,
            bindings: MoveBindings::default(),
        }
    }
}

/// Distance fog parameters published alongside the projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: Vec4,
    pub near: f32,
    pub far: f32,
}

/// Fly camera driven by held keys and mouse motion.
///
/// Right-handed and looking down -Z when both angles are zero. Pitch is not
/// clamped, so the camera can rotate past straight up or down.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    angles: Vec2,
    fov: f32,
    near: f32,
    far: f32,
    speed: f32,
    mouse_sensitivity: f32,
    bindings: MoveBindings,
    world: Mat4,
    view: Mat4,
    projection: Mat4,
    view_projection: Mat4,
    forward: Vec3,
    right: Vec3,
}

impl Camera {
    /// `viewport` is the drawable size in pixels; its height must be non-zero.
    pub fn new(config: &CameraConfig, viewport: (u32, u32)) -> Self {
        let mut camera = Self {
            position: config.position,
            angles: config.angles,
            fov: config.fov,
            near: config.near,
            far: config.far,
            speed: config.speed,
            mouse_sensitivity: config.mouse_sensitivity,
            bindings: config.bindings,
            world: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            forward: Vec3::NEG_Z,
            right: Vec3::X,
        };
        camera.create_perspective(config.fov, config.near, config.far, viewport);
        camera.update_matrices();
        camera
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Takes effect on the next `render`.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn angles(&self) -> Vec2 {
        self.angles
    }

    /// Takes effect on the next `render`.
    pub fn set_angles(&mut self, angles: Vec2) {
        self.angles = angles;
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Rebuild the projection. The aspect ratio is read from `viewport` on
    /// every call.
    pub fn create_perspective(&mut self, fov: f32, near: f32, far: f32, viewport: (u32, u32)) {
        self.fov = fov;
        self.near = near;
        self.far = far;

        let aspect = viewport.0 as f32 / viewport.1 as f32;
        self.projection = Mat4::perspective_rh(fov, aspect, near, far);
        self.view_projection = self.projection * self.view;
    }

    /// Integrate input, derive this frame's matrices and publish the
    /// projection and fog uniforms.
    pub fn render(
        &mut self,
        delta_time: f32,
        input: &mut dyn InputSource,
        device: &mut dyn GraphicsDevice,
        fog: &Fog,
    ) {
        self.process_controls(delta_time, input);
        self.update_matrices();

        device.set_uniform_mat4(Uniform::Projection, self.projection);
        device.set_uniform_vec4(Uniform::FogColor, fog.color);
        device.set_uniform_float(Uniform::FogNear, fog.near);
        device.set_uniform_float(Uniform::FogFar, fog.far);
    }

    // Movement uses the basis from the previous frame; the new angles only
    // apply once `update_matrices` runs.
    fn process_controls(&mut self, delta_time: f32, input: &mut dyn InputSource) {
        let step = self.speed * delta_time;

        if input.is_key_held(self.bindings.forward) {
            self.position += self.forward * step;
        }
        if input.is_key_held(self.bindings.left) {
            self.position -= self.right * step;
        }
        if input.is_key_held(self.bindings.back) {
            self.position -= self.forward * step;
        }
        if input.is_key_held(self.bindings.right) {
            self.position += self.right * step;
        }

        let delta = input.consume_mouse_delta();
        self.angles += delta * delta_time * self.mouse_sensitivity;
    }

    fn update_matrices(&mut self) {
        self.world = Mat4::from_translation(self.position)
            * Mat4::from_rotation_y(-self.angles.x)
            * Mat4::from_rotation_x(-self.angles.y);
        self.view = self.world.inverse();
        self.view_projection = self.projection * self.view;

        self.forward = -self.world.z_axis.truncate();
        self.right = self.forward.cross(Vec3::Y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{device::UniformValue, headless::HeadlessDevice, input::InputState};
    use approx::assert_relative_eq;

    fn fog() -> Fog {
        Fog {
            color: Vec4::new(0.1, 0.2, 0.3, 1.0),
            near: 1.0,
            far: 50.0,
        }
    }

    fn assert_vec3_eq(actual: Vec3, expected: Vec3) {
        assert!(
            actual.abs_diff_eq(expected, 1e-4),
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn default_basis_looks_down_negative_z() {
        let camera = Camera::new(&CameraConfig::default(), (800, 600));
        assert_vec3_eq(camera.forward(), Vec3::NEG_Z);
        assert_vec3_eq(camera.right(), Vec3::X);
    }

    #[test]
    fn view_maps_camera_origin_to_zero() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut input = InputState::new();
        let poses = [
            (Vec3::ZERO, Vec2::ZERO),
            (Vec3::new(4.0, -2.0, 9.0), Vec2::new(0.3, -0.2)),
            (Vec3::new(-100.0, 3.0, 0.5), Vec2::new(7.0, 2.5)),
        ];

        for (position, angles) in poses {
            let mut camera = Camera::new(&CameraConfig::default(), (800, 600));
            camera.set_position(position);
            camera.set_angles(angles);
            camera.render(0.0, &mut input, &mut device, &fog());

            assert_vec3_eq(camera.view().transform_point3(position), Vec3::ZERO);
            let round_trip = camera.view() * camera.world_matrix();
            assert!(round_trip.abs_diff_eq(Mat4::IDENTITY, 1e-4));
        }
    }

    #[test]
    fn forward_key_advances_by_speed_times_delta() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut input = InputState::new();
        let mut camera = Camera::new(&CameraConfig::default(), (800, 600));
        let forward = camera.forward();

        input.press(KeyCode::KeyW);
        camera.render(0.1, &mut input, &mut device, &fog());

        assert_vec3_eq(camera.position(), forward * 3.0);
    }

    #[test]
    fn strafe_and_back_keys_use_right_and_negative_forward() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut input = InputState::new();
        let mut camera = Camera::new(&CameraConfig::default(), (800, 600));

        input.press(KeyCode::KeyD);
        camera.render(1.0, &mut input, &mut device, &fog());
        assert_vec3_eq(camera.position(), Vec3::new(30.0, 0.0, 0.0));

        input.release(KeyCode::KeyD);
        input.press(KeyCode::KeyS);
        camera.render(0.5, &mut input, &mut device, &fog());
        assert_vec3_eq(camera.position(), Vec3::new(30.0, 0.0, 15.0));

        input.release(KeyCode::KeyS);
        input.press(KeyCode::KeyA);
        camera.render(1.0, &mut input, &mut device, &fog());
        assert_vec3_eq(camera.position(), Vec3::new(0.0, 0.0, 15.0));
    }

    #[test]
    fn movement_lags_rotation_by_one_frame() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut input = InputState::new();
        let mut camera = Camera::new(&CameraConfig::default(), (800, 600));

        input.press(KeyCode::KeyW);
        // Turns the camera a quarter to the right during this frame.
        let quarter_turn = std::f32::consts::FRAC_PI_2 / (1.0 * 0.15);
        input.add_mouse_delta(quarter_turn, 0.0);
        camera.render(1.0, &mut input, &mut device, &fog());

        assert_vec3_eq(camera.position(), Vec3::new(0.0, 0.0, -30.0));
        assert_vec3_eq(camera.forward(), Vec3::X);

        camera.render(1.0, &mut input, &mut device, &fog());
        assert_vec3_eq(camera.position(), Vec3::new(30.0, 0.0, -30.0));
    }

    #[test]
    fn mouse_delta_scales_with_time_and_sensitivity() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut input = InputState::new();
        let mut camera = Camera::new(&CameraConfig::default(), (800, 600));

        input.add_mouse_delta(10.0, -4.0);
        camera.render(0.5, &mut input, &mut device, &fog());

        assert_relative_eq!(camera.angles().x, 10.0 * 0.5 * 0.15, epsilon = 1e-6);
        assert_relative_eq!(camera.angles().y, -4.0 * 0.5 * 0.15, epsilon = 1e-6);
    }

    #[test]
    fn pitch_is_not_clamped() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut input = InputState::new();
        let mut camera = Camera::new(&CameraConfig::default(), (800, 600));

        input.add_mouse_delta(0.0, 100.0);
        camera.render(1.0, &mut input, &mut device, &fog());
        assert_relative_eq!(camera.angles().y, 15.0, epsilon = 1e-5);
    }

    #[test]
    fn perspective_rereads_aspect() {
        let mut camera = Camera::new(&CameraConfig::default(), (800, 600));
        let fov = camera.fov();

        camera.create_perspective(fov, 0.1, 100.0, (800, 600));
        assert_eq!(camera.projection(), Mat4::perspective_rh(fov, 800.0 / 600.0, 0.1, 100.0));

        camera.create_perspective(fov, 0.1, 100.0, (400, 400));
        assert_eq!(camera.projection(), Mat4::perspective_rh(fov, 1.0, 0.1, 100.0));
        assert_eq!(camera.near(), 0.1);
        assert_eq!(camera.far(), 100.0);
    }

    #[test]
    fn render_publishes_projection_and_fog() {
        let mut device = HeadlessDevice::new(800, 600);
        let mut input = InputState::new();
        let mut camera = Camera::new(&CameraConfig::default(), (800, 600));
        camera.render(0.016, &mut input, &mut device, &fog());

        assert_eq!(
            device.uniform(Uniform::Projection),
            Some(UniformValue::Mat4(camera.projection()))
        );
        assert_eq!(
            device.uniform(Uniform::FogColor),
            Some(UniformValue::Vec4(fog().color))
        );
        assert_eq!(device.uniform(Uniform::FogNear), Some(UniformValue::Float(1.0)));
        assert_eq!(device.uniform(Uniform::FogFar), Some(UniformValue::Float(50.0)));
        assert_eq!(
            camera.view_projection(),
            camera.projection() * camera.view()
        );
    }
}
