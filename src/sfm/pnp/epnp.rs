extern crate nalgebra as na;

use na::{DMatrix, DVector, Matrix3, SymmetricEigen, Vector2, Vector3};
use crate::Float;
use crate::numerics::{null_space, pose::pose_from_point_sets};

const DEGENERATE_EIGENVALUE_RATIO: Float = 1e-10;

struct ControlPoints {
    world: Vec<Vector3<Float>>,
    alphas: Vec<Vec<Float>>
}

/**
 * Centroid plus the principal axes of the point cloud, scaled by their standard deviation.
 * Coplanar points only get the two in-plane axes, so three control points. Collinear points have none.
 */
fn control_points(world: &[Vector3<Float>]) -> Option<ControlPoints> {
    let n = world.len() as Float;
    let centroid = world.iter().fold(Vector3::<Float>::zeros(), |acc, p| acc + p) / n;
    let covariance = world.iter().fold(Matrix3::<Float>::zeros(), |acc, p| {
        let d = p - centroid;
        acc + d*d.transpose()
    }) / n;

    let eigen = SymmetricEigen::new(covariance);
    let mut order = [0usize, 1, 2];
    order.sort_by(|a, b| eigen.eigenvalues[*b].total_cmp(&eigen.eigenvalues[*a]));
    let max_value = eigen.eigenvalues[order[0]];
    if max_value <= 0.0 || eigen.eigenvalues[order[1]] < DEGENERATE_EIGENVALUE_RATIO*max_value {
        return None;
    }
    let axes = match eigen.eigenvalues[order[2]] < DEGENERATE_EIGENVALUE_RATIO*max_value {
        true => &order[..2],
        false => &order[..]
    };

    let directions = axes.iter().map(|&i| (eigen.eigenvectors.column(i).into_owned(), eigen.eigenvalues[i].sqrt())).collect::<Vec<(Vector3<Float>, Float)>>();
    let mut control = vec![centroid];
    control.extend(directions.iter().map(|(v, s)| centroid + v*(*s)));

    let alphas = world.iter().map(|p| {
        let d = p - centroid;
        let coefficients = directions.iter().map(|(v, s)| v.dot(&d)/s).collect::<Vec<Float>>();
        let mut alpha = vec![1.0 - coefficients.iter().sum::<Float>()];
        alpha.extend(coefficients);
        alpha
    }).collect::<Vec<Vec<Float>>>();

    Some(ControlPoints { world: control, alphas })
}

fn camera_points(alphas: &[Vec<Float>], control: &[Vector3<Float>]) -> Vec<Vector3<Float>> {
    alphas.iter().map(|a| control.iter().zip(a.iter()).fold(Vector3::<Float>::zeros(), |acc, (c, alpha)| acc + c*(*alpha))).collect()
}

fn control_from_vector(x: &DVector<Float>) -> Vec<Vector3<Float>> {
    (0..x.len()/3).map(|j| Vector3::<Float>::new(x[3*j], x[3*j + 1], x[3*j + 2])).collect()
}

fn pairs(n_control: usize) -> Vec<(usize, usize)> {
    (0..n_control).flat_map(|i| (i + 1..n_control).map(move |j| (i, j))).collect()
}

fn solution_with_one_vector(v: &DVector<Float>, control_world: &[Vector3<Float>]) -> Option<Vec<Vector3<Float>>> {
    let control = control_from_vector(v);
    let (mut num, mut denom) = (0.0, 0.0);
    for (i, j) in pairs(control.len()) {
        let d_c = (control[i] - control[j]).norm();
        let d_w = (control_world[i] - control_world[j]).norm();
        num += d_c*d_w;
        denom += d_c*d_c;
    }
    if denom <= Float::EPSILON {
        return None;
    }
    let beta = num/denom;
    Some(control_from_vector(&(v*beta)))
}

#[allow(non_snake_case)]
fn solution_with_two_vectors(v_1: &DVector<Float>, v_2: &DVector<Float>, control_world: &[Vector3<Float>]) -> Option<Vec<Vector3<Float>>> {
    let c_1 = control_from_vector(v_1);
    let c_2 = control_from_vector(v_2);
    let pairs = pairs(c_1.len());
    let mut L = DMatrix::<Float>::zeros(pairs.len(), 3);
    let mut rho = DVector::<Float>::zeros(pairs.len());
    for (k, (i, j)) in pairs.iter().enumerate() {
        let a = c_1[*i] - c_1[*j];
        let b = c_2[*i] - c_2[*j];
        L[(k, 0)] = a.dot(&a);
        L[(k, 1)] = 2.0*a.dot(&b);
        L[(k, 2)] = b.dot(&b);
        rho[k] = (control_world[*i] - control_world[*j]).norm_squared();
    }
    let betas = L.svd(true, true).solve(&rho, 1e-12).ok()?;
    let beta_1 = betas[0].abs().sqrt();
    if beta_1 <= Float::EPSILON {
        return None;
    }
    let beta_2 = betas[1]/beta_1;
    Some(control_from_vector(&(v_1*beta_1 + v_2*beta_2)))
}

/**
 * EPnP: An Accurate O(n) Solution to the PnP Problem - Lepetit et al.
 * Pose of a calibrated camera from five or more correspondences given in normalised image coordinates.
 * Coplanar structure is handled with three control points.
 * Returns R,t with x ~ R*X + t.
 */
#[allow(non_snake_case)]
pub fn epnp(normalized_image: &[Vector2<Float>], world: &[Vector3<Float>]) -> Option<(Matrix3<Float>, Vector3<Float>)> {
    let n = world.len();
    if n < 5 || normalized_image.len() != n {
        return None;
    }
    let control = control_points(world)?;
    let n_control = control.world.len();

    let mut M = DMatrix::<Float>::zeros(2*n, 3*n_control);
    for (i, (a, uv)) in control.alphas.iter().zip(normalized_image.iter()).enumerate() {
        for (j, &alpha) in a.iter().enumerate() {
            let c = 3*j;
            M[(2*i, c)] = alpha;
            M[(2*i, c + 2)] = -uv.x*alpha;
            M[(2*i + 1, c + 1)] = alpha;
            M[(2*i + 1, c + 2)] = -uv.y*alpha;
        }
    }

    let (vectors, _) = null_space(&M, 2)?;
    let candidates = [
        solution_with_one_vector(&vectors[0], &control.world),
        solution_with_two_vectors(&vectors[0], &vectors[1], &control.world)
    ];

    candidates.iter().flatten().filter_map(|control_camera| {
        let mut points = camera_points(&control.alphas, control_camera);
        if points.iter().map(|p| p.z).sum::<Float>() < 0.0 {
            points.iter_mut().for_each(|p| *p = -*p);
        }
        let (R, t) = pose_from_point_sets(world, &points)?;
        let error = world.iter().zip(normalized_image.iter()).map(|(X, x)| {
            let p = R*X + t;
            match p.z {
                z if z > 0.0 => (Vector2::<Float>::new(p.x/z, p.y/z) - x).norm_squared(),
                _ => Float::INFINITY
            }
        }).sum::<Float>();
        Some((R, t, error))
    })
    .min_by(|a, b| a.2.total_cmp(&b.2))
    .map(|(R, t, _)| (R, t))
}
