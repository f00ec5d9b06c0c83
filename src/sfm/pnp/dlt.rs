extern crate nalgebra as na;

use na::{DMatrix, Matrix3x4, Vector2, Vector3};
use crate::Float;
use crate::numerics::{hartley_normalization_2d, hartley_normalization_3d, apply_normalization_2d, smallest_right_singular_vector};

/**
 * Multiple View Geometry - Hartley & Zisserman p.178
 * Normalised direct linear transform for P from six or more 2D-3D correspondences.
 */
#[allow(non_snake_case)]
pub fn projection_dlt(image_points: &[Vector2<Float>], world_points: &[Vector3<Float>]) -> Option<Matrix3x4<Float>> {
    let n = image_points.len();
    if n < 6 || world_points.len() != n {
        return None;
    }
    let T = hartley_normalization_2d(image_points)?;
    let U = hartley_normalization_3d(world_points)?;

    let mut A = DMatrix::<Float>::zeros(2*n, 12);
    for (i, (x, X)) in image_points.iter().zip(world_points.iter()).enumerate() {
        let x_n = apply_normalization_2d(&T, x);
        let X_n = U*X.push(1.0);
        for j in 0..4 {
            A[(2*i, 4 + j)] = -X_n[j];
            A[(2*i, 8 + j)] = x_n.y*X_n[j];
            A[(2*i + 1, j)] = X_n[j];
            A[(2*i + 1, 8 + j)] = -x_n.x*X_n[j];
        }
    }

    let p = smallest_right_singular_vector(&A)?;
    let P_n = Matrix3x4::<Float>::from_row_slice(p.as_slice());
    let P = T.try_inverse()?*P_n*U;
    let norm = P.norm();
    match norm {
        n if n > 0.0 => Some(P/n),
        _ => None
    }
}
