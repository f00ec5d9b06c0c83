extern crate nalgebra as na;

use na::{DMatrix, Matrix3, Matrix3x4, Matrix4, RowVector4, SymmetricEigen, Vector2, Vector4};
use crate::Float;
use crate::image::features::{Feature, matches::Matches};
use crate::numerics::null_space;
use crate::sensors::camera::{Camera, decompose_projection, pinhole::PinholeCamera, projective::ProjectiveCamera};
use crate::sfm::{error::{ReconstructionError, Result}, reconstruction::{CameraId, Reconstruction}, runtime_parameters::ReconstructionParameters};

const MIN_VIEWS: usize = 3;

/**
 * Position of Q_ab (a <= b) in the parameter vector (q00,q01,q02,q03,q11,q12,q13,q22,q23,q33).
 */
fn quadric_index(a: usize, b: usize) -> usize {
    const INDEX: [[usize; 4]; 4] = [[0, 1, 2, 3],
                                     [1, 4, 5, 6],
                                     [2, 5, 7, 8],
                                     [3, 6, 8, 9]];
    INDEX[a][b]
}

/**
 * Coefficients of p^T Q r as a linear function of the ten entries of a symmetric Q.
 */
fn quadric_coefficients(p: &RowVector4<Float>, r: &RowVector4<Float>) -> [Float; 10] {
    let mut coefficients = [0.0; 10];
    for a in 0..4 {
        for b in a..4 {
            coefficients[quadric_index(a, b)] = match a == b {
                true => p[a]*r[a],
                false => p[a]*r[b] + p[b]*r[a]
            };
        }
    }
    coefficients
}

#[allow(non_snake_case)]
fn quadric_from_vector(q: &[Float]) -> Matrix4<Float> {
    let mut Q = Matrix4::<Float>::zeros();
    for a in 0..4 {
        for b in 0..4 {
            Q[(a, b)] = q[quadric_index(a.min(b), a.max(b))];
        }
    }
    Q
}

/**
 * Moves the principal point to the origin and scales by the spread of the observations,
 * so that zero skew, unit aspect ratio and a centred principal point hold for the normalised camera.
 */
fn image_normalization(matches: &Matches, camera: CameraId, parameters: &ReconstructionParameters) -> Result<Matrix3<Float>> {
    let observations = matches.features_in_image(camera.image()).map(|(_, f)| f.get_as_2d_point()).collect::<Vec<Vector2<Float>>>();
    if observations.is_empty() {
        return Err(ReconstructionError::DegenerateConfiguration(format!("image {} has no observations", camera.image())));
    }
    let n = observations.len() as Float;
    let principal_point = match parameters.metric_upgrade.principal_point {
        Some([x, y]) => Vector2::<Float>::new(x, y),
        None => observations.iter().fold(Vector2::<Float>::zeros(), |acc, x| acc + x)/n
    };
    let spread = observations.iter().map(|x| (x - principal_point).norm()).sum::<Float>()/n;
    let s = match spread {
        v if v > Float::EPSILON => v,
        _ => 1.0
    };
    Ok(Matrix3::<Float>::new(1.0/s, 0.0, -principal_point.x/s,
                             0.0, 1.0/s, -principal_point.y/s,
                             0.0, 0.0, 1.0))
}

/**
 * How far the normalised intrinsics of an upgraded camera are from zero skew, unit aspect ratio and a centred principal point.
 */
#[allow(non_snake_case)]
pub fn intrinsics_deviation(K: &Matrix3<Float>) -> Float {
    let f = K[(0,0)];
    match f.abs() {
        v if v < Float::EPSILON => Float::INFINITY,
        _ => [K[(0,1)]/f, K[(1,1)]/f - 1.0, K[(0,2)]/f, K[(1,2)]/f].iter().fold(0.0, |acc: Float, v| acc.max(v.abs()))
    }
}

/**
 * Multiple View Geometry - Hartley & Zisserman p.464
 * Linear estimate of the dual absolute quadric from w = P Q P^T with w_01 = w_02 = w_12 = 0 and w_00 = w_11.
 */
#[allow(non_snake_case)]
pub fn estimate_absolute_quadric(normalized_projections: &[Matrix3x4<Float>], rank_tolerance: Float) -> Result<Matrix4<Float>> {
    if normalized_projections.len() < MIN_VIEWS {
        return Err(ReconstructionError::DegenerateConfiguration(
            format!("absolute quadric needs at least {} views, got {}", MIN_VIEWS, normalized_projections.len())));
    }

    let mut A = DMatrix::<Float>::zeros(4*normalized_projections.len(), 10);
    for (i, P) in normalized_projections.iter().enumerate() {
        let p_0 = P.row(0).into_owned();
        let p_1 = P.row(1).into_owned();
        let p_2 = P.row(2).into_owned();
        let w_00 = quadric_coefficients(&p_0, &p_0);
        let w_11 = quadric_coefficients(&p_1, &p_1);
        let rows = [quadric_coefficients(&p_0, &p_1), quadric_coefficients(&p_0, &p_2), quadric_coefficients(&p_1, &p_2)];
        for (k, row) in rows.iter().enumerate() {
            for j in 0..10 {
                A[(4*i + k, j)] = row[j];
            }
        }
        for j in 0..10 {
            A[(4*i + 3, j)] = w_00[j] - w_11[j];
        }
    }

    let (vectors, singular_values) = null_space(&A, 1)
        .ok_or_else(|| ReconstructionError::DegenerateConfiguration("SVD of the quadric system failed".to_string()))?;
    let largest = singular_values[0];
    let second_smallest = singular_values[singular_values.len() - 2];
    if largest <= 0.0 || second_smallest < rank_tolerance*largest {
        return Err(ReconstructionError::DegenerateConfiguration("quadric system has more than one solution".to_string()));
    }

    Ok(quadric_from_vector(vectors[0].as_slice()))
}

/**
 * H with Q = H diag(1,1,1,0) H^T, after forcing Q to rank three with a positive spectrum.
 */
#[allow(non_snake_case)]
pub fn rectifying_homography(Q: &Matrix4<Float>) -> Result<Matrix4<Float>> {
    let eigen = SymmetricEigen::new(*Q);
    let mut order = [0usize, 1, 2, 3];
    order.sort_by(|a, b| eigen.eigenvalues[*b].abs().total_cmp(&eigen.eigenvalues[*a].abs()));

    let sign = match order[..3].iter().map(|&i| eigen.eigenvalues[i]).sum::<Float>() {
        s if s < 0.0 => -1.0,
        _ => 1.0
    };

    let mut H = Matrix4::<Float>::zeros();
    for (column, &i) in order[..3].iter().enumerate() {
        let value = sign*eigen.eigenvalues[i];
        if value <= 0.0 {
            return Err(ReconstructionError::DegenerateConfiguration("absolute quadric is not positive semi-definite".to_string()));
        }
        H.set_column(column, &(eigen.eigenvectors.column(i)*value.sqrt()));
    }
    H.set_column(3, &eigen.eigenvectors.column(order[3]));
    Ok(H)
}

/**
 * Upgrades the projective reconstruction in the store to a metric one.
 * Every camera is replaced by its pinhole decomposition and every point is mapped through the inverse rectification.
 * The store is left untouched if any upgraded camera is not metric in the normalised image frame,
 * which is what a wrong principal point produces.
 */
#[allow(non_snake_case)]
pub fn upgrade_to_metric(matches: &Matches, parameters: &ReconstructionParameters, reconstruction: &mut Reconstruction) -> Result<()> {
    let projections = reconstruction.cameras().iter().map(|(id, camera)| (*id, camera.projection_matrix())).collect::<Vec<(CameraId, Matrix3x4<Float>)>>();
    if projections.len() < MIN_VIEWS {
        return Err(ReconstructionError::DegenerateConfiguration(
            format!("metric upgrade needs at least {} cameras, got {}", MIN_VIEWS, projections.len())));
    }

    let mut normalizations = Vec::<Matrix3<Float>>::with_capacity(projections.len());
    let mut normalized = Vec::<Matrix3x4<Float>>::with_capacity(projections.len());
    for (id, P) in projections.iter() {
        let T = image_normalization(matches, *id, parameters)?;
        let P_n = T*P;
        normalizations.push(T);
        normalized.push(P_n/P_n.norm());
    }

    let Q = estimate_absolute_quadric(&normalized, parameters.metric_upgrade.rank_tolerance)?;
    let mut H = rectifying_homography(&Q)?;
    let mut H_inv = H.try_inverse()
        .ok_or_else(|| ReconstructionError::DegenerateConfiguration("rectifying homography is singular".to_string()))?;

    let mut votes: i64 = 0;
    for (id, P) in projections.iter() {
        let camera = Camera::Projective(ProjectiveCamera::new(P*H));
        for (track, _) in matches.features_in_image(id.image()) {
            if let Some(structure) = reconstruction.structure(track) {
                let X: Vector4<Float> = H_inv*structure.coords();
                let depth = match X[3] {
                    w if w.abs() > Float::EPSILON => camera.depth(&(X/w)),
                    _ => 0.0
                };
                votes += match depth {
                    d if d > 0.0 => 1,
                    d if d < 0.0 => -1,
                    _ => 0
                };
            }
        }
    }
    if votes < 0 {
        let mirror = Matrix4::<Float>::from_diagonal(&Vector4::<Float>::new(-1.0, -1.0, -1.0, 1.0));
        H = H*mirror;
        H_inv = mirror*H_inv;
    }

    let mut upgraded = Vec::<(CameraId, PinholeCamera)>::with_capacity(projections.len());
    for ((id, P), T) in projections.iter().zip(normalizations.iter()) {
        let camera = decompose_projection(&(P*H))
            .ok_or_else(|| ReconstructionError::DegenerateConfiguration(format!("upgraded camera {} cannot be decomposed", id.image())))?;
        let deviation = decompose_projection(&(T*P*H)).map_or(Float::INFINITY, |c| intrinsics_deviation(c.intrinsics()));
        if deviation.is_nan() || deviation > parameters.metric_upgrade.max_intrinsics_deviation {
            return Err(ReconstructionError::DegenerateConfiguration(
                format!("upgraded camera {} is not metric, intrinsics deviate by {}", id.image(), deviation)));
        }
        upgraded.push((*id, camera));
    }

    for (id, camera) in upgraded {
        reconstruction.insert_camera(id, Camera::Pinhole(camera));
    }
    for (_, structure) in reconstruction.structures_mut() {
        if let Some(point) = structure.as_point_mut() {
            point.transform(&H_inv);
        }
    }

    log::info!("metric upgrade of {} cameras, cheirality vote {}", projections.len(), votes);
    Ok(())
}
