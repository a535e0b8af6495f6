// Math utilities for the scene runtime

use std::cell::Cell;

use glam::{Mat4, Vec3};

/// Position, rotation and scale of a single scene object.
///
/// The local-to-world matrix is cached and only rebuilt on the first read
/// after one of the setters ran, so reads take `&self`.
#[derive(Debug, Clone)]
pub struct Transform {
    position: Vec3,
    rotation: Mat4,
    scale: Vec3,
    matrix: Cell<Mat4>,
    dirty: Cell<bool>,
}

impl Transform {
    /// Create a new transform
    pub fn new(position: Vec3, rotation: Mat4, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
            matrix: Cell::new(Mat4::IDENTITY),
            dirty: Cell::new(true),
        }
    }

    /// Create an identity transform
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Mat4::IDENTITY,
            scale: Vec3::ONE,
            matrix: Cell::new(Mat4::IDENTITY),
            dirty: Cell::new(false),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Mat4 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.dirty.set(true);
    }

    pub fn set_rotation(&mut self, rotation: Mat4) {
        self.rotation = rotation;
        self.dirty.set(true);
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.dirty.set(true);
    }

    /// Local-to-world matrix: `translate(position) * rotation * scale`.
    pub fn matrix(&self) -> Mat4 {
        if self.dirty.get() {
            let matrix = Mat4::from_translation(self.position)
                * self.rotation
                * Mat4::from_scale(self.scale);
            self.matrix.set(matrix);
            self.dirty.set(false);
        }
        self.matrix.get()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
