//! Camera, projection and keyboard/mouse camera control.
//!
//! The controller is assembled from two small pieces of input state,
//! [`KeyInputState`] and [`FocusState`], which are handed to
//! [`CameraController::new`]. Input only moves the camera while the
//! controller has focus.

use std::collections::HashSet;

use cgmath::{InnerSpace, Matrix4, Point3, Quaternion, Rad, Rotation3, Vector3};
use instant::Duration;
use winit::{
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Lowest height the camera may sink to with the down key.
const MIN_DESCEND_HEIGHT: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub forward: Vector3<f32>,
    pub up: Vector3<f32>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Point3::new(0.0, 5.0, 10.0), Vector3::new(0.0, 0.0, -1.0))
    }
}

impl Camera {
    /// A zero `forward` falls back to looking down -Z.
    pub fn new<P: Into<Point3<f32>>, V: Into<Vector3<f32>>>(position: P, forward: V) -> Self {
        let mut camera = Self {
            position: position.into(),
            forward: -Vector3::unit_z(),
            up: Vector3::unit_y(),
        };
        camera.look_towards(forward);
        camera
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward, self.up)
    }

    pub fn set_position<P: Into<Point3<f32>>>(&mut self, position: P) {
        self.position = position.into();
    }

    pub fn look_towards<V: Into<Vector3<f32>>>(&mut self, direction: V) {
        let direction = direction.into();
        if direction.magnitude2() > f32::EPSILON {
            self.forward = direction.normalize();
        }
    }

    pub fn look_at<P: Into<Point3<f32>>>(&mut self, target: P) {
        self.look_towards(target.into() - self.position);
    }

    pub fn translate<V: Into<Vector3<f32>>>(&mut self, offset: V) {
        self.position += offset.into();
    }

    pub fn right(&self) -> Vector3<f32> {
        self.forward.cross(self.up).normalize()
    }

    pub fn move_forward(&mut self, amount: f32) {
        self.position += self.forward * amount;
    }

    pub fn move_right(&mut self, amount: f32) {
        self.position += self.right() * amount;
    }

    pub fn move_up(&mut self, amount: f32) {
        self.position += self.up * amount;
    }

    /// Turns right by `yaw` and up by `pitch`. Pitch stops short of straight up or down.
    pub fn turn(&mut self, yaw: Rad<f32>, pitch: Rad<f32>) {
        let up = self.up.normalize();
        let yawed = (Quaternion::from_axis_angle(up, -yaw) * self.forward).normalize();
        let right = yawed.cross(up).normalize();
        let pitched = (Quaternion::from_axis_angle(right, pitch) * yawed).normalize();
        self.forward = if pitched.dot(up).abs() < 0.99 {
            pitched
        } else {
            yawed
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// The `projectionMatrix` and `viewMatrix` uniforms.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new(camera: &Camera, projection: &Projection) -> Self {
        Self {
            projection: projection.calc_matrix().into(),
            view: camera.view_matrix().into(),
        }
    }
}

/// Physical keys currently held down.
#[derive(Debug, Default)]
pub struct KeyInputState {
    pressed: HashSet<KeyCode>,
}

impl KeyInputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key(&mut self, code: KeyCode, pressed: bool) {
        if pressed {
            self.pressed.insert(code);
        } else {
            self.pressed.remove(&code);
        }
    }

    pub fn is_pressed(&self, code: KeyCode) -> bool {
        self.pressed.contains(&code)
    }

    pub fn release_all(&mut self) {
        self.pressed.clear();
    }
}

/// Whether the pointer is captured by the view, with a hook run on every change.
#[derive(Default)]
pub struct FocusState {
    focused: bool,
    on_change: Option<Box<dyn FnMut(bool)>>,
}

impl FocusState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(on_change: impl FnMut(bool) + 'static) -> Self {
        Self {
            focused: false,
            on_change: Some(Box::new(on_change)),
        }
    }

    pub fn set_focused(&mut self, focused: bool) {
        if self.focused == focused {
            return;
        }
        self.focused = focused;
        if let Some(on_change) = self.on_change.as_mut() {
            on_change(focused);
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }
}

/// WASD + Space/Shift movement and mouse look.
pub struct CameraController {
    pub keys: KeyInputState,
    pub focus: FocusState,
    speed: f32,
    sensitivity: f32,
    turn: (f32, f32),
}

impl CameraController {
    pub fn new(keys: KeyInputState, focus: FocusState, speed: f32, sensitivity: f32) -> Self {
        Self {
            keys,
            focus,
            speed,
            sensitivity,
            turn: (0.0, 0.0),
        }
    }

    /// Returns `true` if the event was used by the controller.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.focus.set_focused(false);
                true
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                self.keys.handle_key(*code, state.is_pressed());
                true
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                self.focus.set_focused(true);
                true
            }
            WindowEvent::Focused(false) => {
                self.keys.release_all();
                self.focus.set_focused(false);
                true
            }
            _ => false,
        }
    }

    /// Raw mouse motion. Ignored without focus.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        if self.focus.is_focused() {
            self.turn.0 += dx as f32;
            self.turn.1 += dy as f32;
        }
    }

    pub fn update(&mut self, camera: &mut Camera, dt: Duration) {
        let (dx, dy) = std::mem::take(&mut self.turn);
        if !self.focus.is_focused() {
            return;
        }
        let step = self.speed * dt.as_secs_f32();
        let axis = |positive: KeyCode, negative: KeyCode| {
            let held = |key| self.keys.is_pressed(key) as i32 as f32;
            held(positive) - held(negative)
        };

        camera.move_forward(axis(KeyCode::KeyW, KeyCode::KeyS) * step);
        camera.move_right(axis(KeyCode::KeyD, KeyCode::KeyA) * step);
        if self.keys.is_pressed(KeyCode::Space) {
            camera.move_up(step);
        }
        if self.keys.is_pressed(KeyCode::ShiftLeft) && camera.position.y >= MIN_DESCEND_HEIGHT {
            camera.move_up(-step);
        }
        if dx != 0.0 || dy != 0.0 {
            camera.turn(
                Rad(dx * self.sensitivity * dt.as_secs_f32()),
                Rad(-dy * self.sensitivity * dt.as_secs_f32()),
            );
        }
    }
}
