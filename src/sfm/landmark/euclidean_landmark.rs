extern crate nalgebra as na;

use na::{Matrix4, Point3, Vector3, Vector4};
use crate::Float;

/**
 * A scene point in homogeneous coordinates. Finite points are kept with a unit last coordinate.
 */
#[derive(Debug,Copy,Clone,PartialEq)]
pub struct PointStructure {
    coords: Vector4<Float>
}

impl PointStructure {
    pub fn new(coords: Vector4<Float>) -> PointStructure {
        PointStructure { coords: normalize_homogeneous(coords) }
    }

    pub fn from_euclidean(point: &Vector3<Float>) -> PointStructure {
        PointStructure { coords: point.push(1.0) }
    }

    pub fn coords(&self) -> &Vector4<Float> {
        &self.coords
    }

    pub fn set_coords(&mut self, coords: Vector4<Float>) -> () {
        self.coords = normalize_homogeneous(coords);
    }

    pub fn is_finite(&self) -> bool {
        self.coords[3] != 0.0
    }

    pub fn get_euclidean_representation(&self) -> Option<Point3<Float>> {
        match self.is_finite() {
            true => Some(Point3::<Float>::new(self.coords[0], self.coords[1], self.coords[2])),
            false => None
        }
    }

    pub fn update(&mut self, perturb: &Vector3<Float>) -> () {
        if self.is_finite() {
            let mut v = self.coords.fixed_rows_mut::<3>(0);
            v += perturb;
        }
    }

    pub fn transform(&mut self, homography: &Matrix4<Float>) -> () {
        self.coords = normalize_homogeneous(homography*self.coords);
    }
}

fn normalize_homogeneous(coords: Vector4<Float>) -> Vector4<Float> {
    let w = coords[3];
    match w.abs() > 1e-12*coords.norm() {
        true => coords/w,
        false => {
            let mut at_infinity = coords;
            at_infinity[3] = 0.0;
            at_infinity
        }
    }
}
