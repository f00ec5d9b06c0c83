extern crate nalgebra as na;

use na::{DMatrix, DVector, Matrix3, Vector2, Vector3};
use crate::Float;
use crate::numerics::{hartley_normalization_2d, apply_normalization_2d, null_space, real_cubic_roots, ransac::Estimator};

pub type Correspondence = (Vector2<Float>, Vector2<Float>);

/**
 * Row of the linear system x_b^T F x_a = 0 for a row major vectorisation of F.
 */
fn linear_coefficients(a: &Vector2<Float>, b: &Vector2<Float>) -> [Float; 9] {
    [b.x*a.x, b.x*a.y, b.x,
     b.y*a.x, b.y*a.y, b.y,
     a.x, a.y, 1.0]
}

fn to_fundamental(f: &DVector<Float>) -> Matrix3<Float> {
    Matrix3::<Float>::new(f[0], f[1], f[2],
                          f[3], f[4], f[5],
                          f[6], f[7], f[8])
}

#[allow(non_snake_case)]
fn normalized_system(correspondences: &[Correspondence]) -> Option<(DMatrix<Float>, Matrix3<Float>, Matrix3<Float>)> {
    let points_a = correspondences.iter().map(|(a, _)| *a).collect::<Vec<Vector2<Float>>>();
    let points_b = correspondences.iter().map(|(_, b)| *b).collect::<Vec<Vector2<Float>>>();
    let T_a = hartley_normalization_2d(&points_a)?;
    let T_b = hartley_normalization_2d(&points_b)?;

    let mut A = DMatrix::<Float>::zeros(correspondences.len(), 9);
    for (i, (a, b)) in correspondences.iter().enumerate() {
        let a_n = apply_normalization_2d(&T_a, a);
        let b_n = apply_normalization_2d(&T_b, b);
        let coefficients = linear_coefficients(&a_n, &b_n);
        for j in 0..9 {
            A[(i, j)] = coefficients[j];
        }
    }
    Some((A, T_a, T_b))
}

#[allow(non_snake_case)]
fn denormalize(F_norm: &Matrix3<Float>, T_a: &Matrix3<Float>, T_b: &Matrix3<Float>) -> Matrix3<Float> {
    let F = T_b.transpose()*F_norm*T_a;
    let norm = F.norm();
    match norm {
        n if n > 0.0 => F/n,
        _ => F
    }
}

#[allow(non_snake_case)]
pub fn enforce_rank_two(F: &Matrix3<Float>) -> Option<Matrix3<Float>> {
    let svd = F.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut sigma = svd.singular_values;
    sigma[2] = 0.0;
    Some(u*Matrix3::<Float>::from_diagonal(&sigma)*v_t)
}

/**
 * In Defense of the Eight-Point Algorithm - Hartley
 * Least squares fundamental matrix from eight or more correspondences with x_b^T F x_a = 0.
 */
#[allow(non_snake_case)]
pub fn eight_point_hartley(correspondences: &[Correspondence]) -> Option<Matrix3<Float>> {
    if correspondences.len() < 8 {
        return None;
    }
    let (A, T_a, T_b) = normalized_system(correspondences)?;
    let (mut vectors, _) = null_space(&A, 1)?;
    let F_norm = enforce_rank_two(&to_fundamental(&vectors.pop()?))?;
    Some(denormalize(&F_norm, &T_a, &T_b))
}

/**
 * Multiple View Geometry - Hartley & Zisserman p.281
 * Up to three fundamental matrices from exactly seven correspondences.
 * F = l*F1 + (1-l)*F2 where det(F) = 0 is a cubic in l, sampled at l = 0, 1, -1, 2.
 */
#[allow(non_snake_case)]
pub fn seven_point(correspondences: &[Correspondence]) -> Vec<Matrix3<Float>> {
    if correspondences.len() != 7 {
        return Vec::new();
    }
    let (A, T_a, T_b) = match normalized_system(correspondences) {
        Some(v) => v,
        None => return Vec::new()
    };
    let (vectors, _) = match null_space(&A, 2) {
        Some(v) => v,
        None => return Vec::new()
    };
    let F1 = to_fundamental(&vectors[0]);
    let F2 = to_fundamental(&vectors[1]);
    let det_at = |l: Float| (l*F1 + (1.0 - l)*F2).determinant();

    let d_0 = det_at(0.0);
    let d_1 = det_at(1.0);
    let d_m1 = det_at(-1.0);
    let d_2 = det_at(2.0);

    let b = 0.5*(d_1 + d_m1) - d_0;
    let a = (d_2 - 4.0*b - d_1 + d_m1 - d_0)/6.0;
    let c = 0.5*(d_1 - d_m1) - a;

    real_cubic_roots(a, b, c, d_0).into_iter()
        .map(|l| denormalize(&(l*F1 + (1.0 - l)*F2), &T_a, &T_b))
        .collect()
}

/**
 * First order geometric error of a correspondence, in pixels.
 */
#[allow(non_snake_case)]
pub fn sampson_distance(F: &Matrix3<Float>, a: &Vector2<Float>, b: &Vector2<Float>) -> Float {
    let x_a = Vector3::<Float>::new(a.x, a.y, 1.0);
    let x_b = Vector3::<Float>::new(b.x, b.y, 1.0);
    let F_x_a = F*x_a;
    let F_t_x_b = F.transpose()*x_b;
    let r = x_b.dot(&F_x_a);
    let denom = F_x_a[0].powi(2) + F_x_a[1].powi(2) + F_t_x_b[0].powi(2) + F_t_x_b[1].powi(2);
    match denom {
        d if d > 0.0 => (r*r/d).sqrt(),
        _ => Float::INFINITY
    }
}

pub struct FundamentalEstimator;

impl Estimator for FundamentalEstimator {
    type Datum = Correspondence;
    type Model = Matrix3<Float>;

    const MIN_SAMPLES: usize = 7;

    fn fit(&self, data: &[Self::Datum], sample: &[usize]) -> Vec<Self::Model> {
        let subset = sample.iter().map(|&i| data[i]).collect::<Vec<Correspondence>>();
        seven_point(&subset)
    }

    fn residual(&self, model: &Self::Model, datum: &Self::Datum) -> Float {
        sampson_distance(model, &datum.0, &datum.1)
    }

    fn refit(&self, data: &[Self::Datum], inliers: &[usize]) -> Option<Self::Model> {
        let subset = inliers.iter().map(|&i| data[i]).collect::<Vec<Correspondence>>();
        eight_point_hartley(&subset)
    }
}
