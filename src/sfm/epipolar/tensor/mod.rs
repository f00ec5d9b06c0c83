extern crate nalgebra as na;

use na::{Matrix3, Matrix3x4, Vector2, Vector3};
use crate::Float;
use crate::numerics::lie::skew_symmetric;
use crate::sfm::triangulation::linear_triangulation_svd;

pub mod fundamental;

/**
 * E = K_b^T F K_a for x_b^T F x_a = 0.
 */
#[allow(non_snake_case)]
pub fn essential_from_fundamental(F: &Matrix3<Float>, K_a: &Matrix3<Float>, K_b: &Matrix3<Float>) -> Matrix3<Float> {
    K_b.transpose()*F*K_a
}

/**
 * Multiple View Geometry - Hartley & Zisserman p.259
 * The four (R,t) with x_b ~ R*X_a + t that are consistent with E. The translation has unit length.
 */
#[allow(non_snake_case)]
pub fn decompose_essential(E: &Matrix3<Float>) -> Option<[(Matrix3<Float>, Vector3<Float>); 4]> {
    let svd = E.svd(true, true);
    let mut u = svd.u?;
    let mut v_t = svd.v_t?;
    if u.determinant() < 0.0 {
        u = -u;
    }
    if v_t.determinant() < 0.0 {
        v_t = -v_t;
    }

    let W = Matrix3::<Float>::new(0.0, -1.0, 0.0,
                                  1.0, 0.0, 0.0,
                                  0.0, 0.0, 1.0);
    let R_1 = u*W*v_t;
    let R_2 = u*W.transpose()*v_t;
    let t = u.column(2).normalize();

    Some([(R_1, t), (R_1, -t), (R_2, t), (R_2, -t)])
}

/**
 * Counts the correspondences (in normalised image coordinates) that triangulate in front of both [I|0] and [R|t].
 */
#[allow(non_snake_case)]
pub fn count_points_in_front(R: &Matrix3<Float>, t: &Vector3<Float>, normalized_correspondences: &[(Vector2<Float>, Vector2<Float>)]) -> usize {
    let P_a = Matrix3x4::<Float>::identity();
    let mut P_b = Matrix3x4::<Float>::zeros();
    P_b.fixed_view_mut::<3,3>(0,0).copy_from(R);
    P_b.fixed_view_mut::<3,1>(0,3).copy_from(t);

    normalized_correspondences.iter().filter(|(a, b)| {
        match linear_triangulation_svd(&[(*a, P_a), (*b, P_b)]) {
            Some(X) if X[3].abs() > Float::EPSILON => {
                let X_a = X.fixed_rows::<3>(0)/X[3];
                let X_b = R*X_a + t;
                X_a[2] > 0.0 && X_b[2] > 0.0
            },
            _ => false
        }
    }).count()
}

/**
 * Selects the decomposition of E with the most points in front of both cameras.
 * Returns the pose and the number of supporting points.
 */
#[allow(non_snake_case)]
pub fn relative_pose_from_essential(E: &Matrix3<Float>, normalized_correspondences: &[(Vector2<Float>, Vector2<Float>)]) -> Option<(Matrix3<Float>, Vector3<Float>, usize)> {
    decompose_essential(E)?.iter()
        .map(|(R, t)| (*R, *t, count_points_in_front(R, t, normalized_correspondences)))
        .max_by_key(|(_, _, count)| *count)
}

/**
 * Multiple View Geometry - Hartley & Zisserman p.256
 * Second camera of the canonical pair [I|0], [[e']_x F | e'] where F^T e' = 0.
 */
#[allow(non_snake_case)]
pub fn projective_camera_from_fundamental(F: &Matrix3<Float>) -> Option<Matrix3x4<Float>> {
    let svd = F.svd(true, false);
    let u = svd.u?;
    let e_prime = u.column(2).into_owned();
    let M = skew_symmetric(&e_prime)*F;
    let mut P = Matrix3x4::<Float>::zeros();
    P.fixed_view_mut::<3,3>(0,0).copy_from(&M);
    P.fixed_view_mut::<3,1>(0,3).copy_from(&e_prime);
    Some(P)
}
