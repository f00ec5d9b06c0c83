use nalgebra as na;

use na::{Vector2,Vector3};
use serde::{Serialize, Deserialize};
use crate::Float;

pub mod matches;

pub trait Feature {
    fn get_x_image_float(&self) -> Float;
    fn get_y_image_float(&self) -> Float;
    fn get_as_2d_point(&self) -> Vector2<Float> {
        Vector2::<Float>::new(self.get_x_image_float(), self.get_y_image_float())
    }
    fn get_as_homogeneous_point(&self) -> Vector3<Float> {
        Vector3::<Float>::new(self.get_x_image_float(), self.get_y_image_float(), 1.0)
    }
}

/**
 * A sub-pixel 2D observation in image coordinates.
 */
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointFeature {
    pub x: Float,
    pub y: Float
}

impl PointFeature {
    pub fn new(x: Float, y: Float) -> PointFeature {
        PointFeature { x, y }
    }
}

impl From<Vector2<Float>> for PointFeature {
    fn from(v: Vector2<Float>) -> PointFeature {
        PointFeature::new(v.x, v.y)
    }
}

impl Feature for PointFeature {
    fn get_x_image_float(&self) -> Float { self.x }
    fn get_y_image_float(&self) -> Float { self.y }
}
