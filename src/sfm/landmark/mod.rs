extern crate nalgebra as na;

use na::Vector4;
use crate::Float;

pub mod euclidean_landmark;

use euclidean_landmark::PointStructure;

#[derive(Debug,Copy,Clone,PartialEq)]
pub enum Structure {
    Point(PointStructure)
}

impl Structure {
    pub fn coords(&self) -> &Vector4<Float> {
        match self {
            Structure::Point(p) => p.coords()
        }
    }

    pub fn as_point(&self) -> Option<&PointStructure> {
        match self {
            Structure::Point(p) => Some(p)
        }
    }

    pub fn as_point_mut(&mut self) -> Option<&mut PointStructure> {
        match self {
            Structure::Point(p) => Some(p)
        }
    }
}

impl From<PointStructure> for Structure {
    fn from(point: PointStructure) -> Structure {
        Structure::Point(point)
    }
}
