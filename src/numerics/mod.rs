extern crate nalgebra as na;

use na::{DMatrix, DVector, Matrix3, Matrix4, Vector2, Vector3};
use crate::{Float, float};

pub mod lie;
pub mod pose;
pub mod least_squares;
pub mod ransac;

/**
 * Returns the right singular vectors belonging to the `count` smallest singular values of `a`,
 * smallest first, together with all singular values in descending order.
 * Wide matrices are padded with zero rows so that the full null space is available.
 */
pub fn null_space(a: &DMatrix<Float>, count: usize) -> Option<(Vec<DVector<Float>>, DVector<Float>)> {
    let cols = a.ncols();
    let padded = match a.nrows() < cols {
        true => {
            let mut m = DMatrix::<Float>::zeros(cols, cols);
            m.view_mut((0, 0), (a.nrows(), cols)).copy_from(a);
            m
        },
        false => a.clone()
    };

    let svd = padded.svd(false, true);
    let v_t = svd.v_t?;
    if v_t.nrows() < count || count > cols {
        return None;
    }
    let vectors = (0..count).map(|i| v_t.row(cols - 1 - i).transpose()).collect::<Vec<DVector<Float>>>();
    Some((vectors, svd.singular_values))
}

pub fn smallest_right_singular_vector(a: &DMatrix<Float>) -> Option<DVector<Float>> {
    null_space(a, 1).and_then(|(mut vectors, _)| vectors.pop())
}

/**
 * Multiple View Geometry - Hartley & Zisserman p.107
 * Similarity that moves the centroid to the origin and the mean distance to sqrt(2).
 */
pub fn hartley_normalization_2d(points: &[Vector2<Float>]) -> Option<Matrix3<Float>> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as Float;
    let centroid = points.iter().fold(Vector2::<Float>::zeros(), |acc, p| acc + p) / n;
    let mean_distance = points.iter().map(|p| (p - centroid).norm()).sum::<Float>() / n;
    if mean_distance <= Float::EPSILON {
        return None;
    }
    let s = (2.0 as Float).sqrt() / mean_distance;
    Some(Matrix3::<Float>::new(s, 0.0, -s * centroid.x,
                               0.0, s, -s * centroid.y,
                               0.0, 0.0, 1.0))
}

pub fn hartley_normalization_3d(points: &[Vector3<Float>]) -> Option<Matrix4<Float>> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as Float;
    let centroid = points.iter().fold(Vector3::<Float>::zeros(), |acc, p| acc + p) / n;
    let mean_distance = points.iter().map(|p| (p - centroid).norm()).sum::<Float>() / n;
    if mean_distance <= Float::EPSILON {
        return None;
    }
    let s = (3.0 as Float).sqrt() / mean_distance;
    let mut t = Matrix4::<Float>::identity() * s;
    t[(3, 3)] = 1.0;
    t.fixed_view_mut::<3, 1>(0, 3).copy_from(&(-s * centroid));
    Some(t)
}

pub fn apply_normalization_2d(normalization: &Matrix3<Float>, point: &Vector2<Float>) -> Vector2<Float> {
    let h = normalization * point.push(1.0);
    Vector2::<Float>::new(h.x / h.z, h.y / h.z)
}

/**
 * Real roots of a*x^3 + b*x^2 + c*x + d.
 * Degrades to the quadratic / linear case when leading coefficients vanish.
 */
pub fn real_cubic_roots(a: Float, b: Float, c: Float, d: Float) -> Vec<Float> {
    let scale = a.abs().max(b.abs()).max(c.abs()).max(d.abs());
    if scale == 0.0 {
        return Vec::new();
    }
    if a.abs() <= 1e-12 * scale {
        return real_quadratic_roots(b, c, d);
    }

    let (b, c, d) = (b / a, c / a, d / a);
    let q = (3.0 * c - b * b) / 9.0;
    let r = (9.0 * b * c - 27.0 * d - 2.0 * b * b * b) / 54.0;
    let discriminant = q * q * q + r * r;
    let shift = b / 3.0;

    if discriminant > 0.0 {
        let sqrt_disc = discriminant.sqrt();
        let s = (r + sqrt_disc).cbrt();
        let t = (r - sqrt_disc).cbrt();
        vec![s + t - shift]
    } else {
        let theta = match q {
            q if q < 0.0 => (r / (-q * q * q).sqrt()).clamp(-1.0, 1.0).acos(),
            _ => 0.0
        };
        let m = 2.0 * (-q).max(0.0).sqrt();
        let pi = float::consts::PI;
        vec![m * (theta / 3.0).cos() - shift,
             m * ((theta + 2.0 * pi) / 3.0).cos() - shift,
             m * ((theta + 4.0 * pi) / 3.0).cos() - shift]
    }
}

pub fn real_quadratic_roots(a: Float, b: Float, c: Float) -> Vec<Float> {
    if a == 0.0 {
        return match b {
            b if b != 0.0 => vec![-c / b],
            _ => Vec::new()
        };
    }
    let det = b.powi(2) - 4.0 * a * c;
    match det {
        det if det > 0.0 => {
            let det_sqrt = det.sqrt();
            vec![(-b - det_sqrt) / (2.0 * a), (-b + det_sqrt) / (2.0 * a)]
        },
        det if det < 0.0 => Vec::new(),
        _ => vec![-b / (2.0 * a)]
    }
}

pub fn rms(squared_norms: &[Float]) -> Float {
    match squared_norms.len() {
        0 => 0.0,
        n => (squared_norms.iter().sum::<Float>() / n as Float).sqrt()
    }
}

pub fn max_norm(vector: &DVector<Float>) -> Float {
    vector.amax()
}
