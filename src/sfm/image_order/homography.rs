extern crate nalgebra as na;

use na::{DMatrix, Matrix3, Vector2};
use crate::Float;
use crate::numerics::{hartley_normalization_2d, apply_normalization_2d, null_space, ransac::Estimator};
use crate::sfm::epipolar::tensor::fundamental::Correspondence;

/**
 * Multiple View Geometry - Hartley & Zisserman p.109
 * Normalised DLT for H with x_b ~ H x_a from four or more correspondences.
 */
#[allow(non_snake_case)]
pub fn homography_dlt(correspondences: &[Correspondence]) -> Option<Matrix3<Float>> {
    if correspondences.len() < 4 {
        return None;
    }
    let points_a = correspondences.iter().map(|(a, _)| *a).collect::<Vec<Vector2<Float>>>();
    let points_b = correspondences.iter().map(|(_, b)| *b).collect::<Vec<Vector2<Float>>>();
    let T_a = hartley_normalization_2d(&points_a)?;
    let T_b = hartley_normalization_2d(&points_b)?;

    let mut A = DMatrix::<Float>::zeros(2*correspondences.len(), 9);
    for (i, (a, b)) in correspondences.iter().enumerate() {
        let a_n = apply_normalization_2d(&T_a, a);
        let b_n = apply_normalization_2d(&T_b, b);
        let x = [a_n.x, a_n.y, 1.0];
        for j in 0..3 {
            A[(2*i, 3 + j)] = -x[j];
            A[(2*i, 6 + j)] = b_n.y*x[j];
            A[(2*i + 1, j)] = x[j];
            A[(2*i + 1, 6 + j)] = -b_n.x*x[j];
        }
    }

    let (mut vectors, _) = null_space(&A, 1)?;
    let h = vectors.pop()?;
    let H_norm = Matrix3::<Float>::new(h[0], h[1], h[2],
                                       h[3], h[4], h[5],
                                       h[6], h[7], h[8]);
    let H = T_b.try_inverse()?*H_norm*T_a;
    match H[(2, 2)] {
        v if v.abs() > Float::EPSILON => Some(H/v),
        _ => Some(H/H.norm())
    }
}

/**
 * Distance between x_b and the transfer of x_a.
 */
#[allow(non_snake_case)]
pub fn transfer_error(H: &Matrix3<Float>, a: &Vector2<Float>, b: &Vector2<Float>) -> Float {
    let x = H*a.push(1.0);
    match x.z.abs() > Float::EPSILON {
        true => (Vector2::<Float>::new(x.x/x.z, x.y/x.z) - b).norm(),
        false => Float::INFINITY
    }
}

pub struct HomographyEstimator;

impl Estimator for HomographyEstimator {
    type Datum = Correspondence;
    type Model = Matrix3<Float>;

    const MIN_SAMPLES: usize = 4;

    fn fit(&self, data: &[Self::Datum], sample: &[usize]) -> Vec<Self::Model> {
        self.refit(data, sample).into_iter().collect()
    }

    fn residual(&self, model: &Self::Model, datum: &Self::Datum) -> Float {
        transfer_error(model, &datum.0, &datum.1)
    }

    fn refit(&self, data: &[Self::Datum], inliers: &[usize]) -> Option<Self::Model> {
        let correspondences = inliers.iter().map(|&i| data[i]).collect::<Vec<Correspondence>>();
        homography_dlt(&correspondences)
    }
}
