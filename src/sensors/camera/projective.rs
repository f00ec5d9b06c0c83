extern crate nalgebra as na;

use na::{Matrix3x4, Vector2, Vector4};
use crate::Float;

/**
 * Uncalibrated camera given only by its 3x4 projection matrix, defined up to scale.
 */
#[derive(Debug,Copy,Clone,PartialEq)]
pub struct ProjectiveCamera {
    projection: Matrix3x4<Float>
}

impl ProjectiveCamera {
    pub fn new(projection: Matrix3x4<Float>) -> ProjectiveCamera {
        ProjectiveCamera { projection }
    }

    pub fn canonical() -> ProjectiveCamera {
        ProjectiveCamera::new(Matrix3x4::<Float>::identity())
    }

    pub fn projection_matrix(&self) -> &Matrix3x4<Float> {
        &self.projection
    }

    pub fn project(&self, point: &Vector4<Float>) -> Option<Vector2<Float>> {
        let x = self.projection*point;
        match x[2] {
            w if w.abs() < Float::EPSILON => None,
            w => Some(Vector2::<Float>::new(x[0]/w, x[1]/w))
        }
    }
}
