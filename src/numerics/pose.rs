extern crate nalgebra as na;

use na::{Vector3, Matrix3};
use crate::Float;

/**
 * 3D Rotations - Kanatani p.35
 * Closest rotation in the Frobenius sense.
 */
pub fn optimal_correction_of_rotation(rotation: &Matrix3<Float>) -> Option<Matrix3<Float>> {
    let svd = rotation.svd(true,true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let d = Matrix3::<Float>::from_diagonal(&Vector3::<Float>::new(1.0, 1.0, (u*v_t).determinant()));
    Some(u*d*v_t)
}

/**
 * Least-Squares Fitting of Two 3-D Point Sets - Arun et al.
 * Finds R,t such that target ~ R*source + t.
 */
#[allow(non_snake_case)]
pub fn pose_from_point_sets(source: &[Vector3<Float>], target: &[Vector3<Float>]) -> Option<(Matrix3<Float>, Vector3<Float>)> {
    if source.len() != target.len() || source.len() < 3 {
        return None;
    }
    let n = source.len() as Float;
    let source_centroid = source.iter().fold(Vector3::<Float>::zeros(), |acc, p| acc + p) / n;
    let target_centroid = target.iter().fold(Vector3::<Float>::zeros(), |acc, p| acc + p) / n;

    let H = source.iter().zip(target.iter()).fold(Matrix3::<Float>::zeros(), |acc, (s, t)| {
        acc + (s - source_centroid) * (t - target_centroid).transpose()
    });
    let svd = H.svd(true, true);
    let u = svd.u?;
    let v = svd.v_t?.transpose();
    let d = Matrix3::<Float>::from_diagonal(&Vector3::<Float>::new(1.0, 1.0, (v*u.transpose()).determinant()));
    let R = v*d*u.transpose();
    let t = target_centroid - R*source_centroid;
    Some((R, t))
}
