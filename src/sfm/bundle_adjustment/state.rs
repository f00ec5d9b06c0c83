extern crate nalgebra as na;

use std::collections::HashMap;
use na::{DMatrix, DVector, Matrix2x3, Matrix3x4, Vector2, Vector3, Vector4};
use crate::Float;
use crate::image::features::{Feature, matches::Matches};
use crate::numerics::lie::left_jacobian_around_identity;
use crate::sensors::camera::{Camera, pinhole::PinholeCamera, projective::ProjectiveCamera};
use crate::sfm::{landmark::Structure, reconstruction::{CameraId, Reconstruction, StructureId}};

pub const PINHOLE_PARAM_SIZE: usize = 6;
pub const PROJECTIVE_PARAM_SIZE: usize = 12;
pub const LANDMARK_PARAM_SIZE: usize = 3;

/**
 * A camera of the adjustment. Fixed cameras hold the gauge and carry no parameters.
 */
#[derive(Debug, Clone)]
pub struct CameraBlock {
    pub id: CameraId,
    pub camera: Camera,
    pub offset: Option<usize>
}

impl CameraBlock {
    pub fn param_size(&self) -> usize {
        match (self.offset, &self.camera) {
            (None, _) => 0,
            (Some(_), Camera::Pinhole(_)) => PINHOLE_PARAM_SIZE,
            (Some(_), Camera::Projective(_)) => PROJECTIVE_PARAM_SIZE
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub camera: usize,
    pub point: usize,
    pub feature: Vector2<Float>
}

/**
 * Residual of one observation and its derivatives w.r.t. the camera block and the point.
 * The camera jacobian has as many columns as the camera block has parameters.
 */
pub struct LinearizedObservation {
    pub residual: Vector2<Float>,
    pub camera_jacobian: DMatrix<Float>,
    pub point_jacobian: Matrix2x3<Float>
}

/**
 * This is ordered [cam_1,cam_2,..,cam_n,point_1,point_2,...,point_m] with variable camera block sizes.
 * Pinhole cameras are parameterized by [u_1,u_2,u_3,w_1,w_2,w_3], projective cameras by the rows of P.
 * Points are parameterized by [x,y,z].
 */
#[derive(Debug, Clone)]
pub struct State {
    pub cameras: Vec<CameraBlock>,
    pub points: Vec<(StructureId, Vector3<Float>)>,
    pub observations: Vec<Observation>,
    pub n_camera_params: usize
}

impl State {
    /**
     * Collects every observation whose image has a camera and whose track has finite structure.
     * The camera with the smallest id is held fixed.
     */
    pub fn from_reconstruction(matches: &Matches, reconstruction: &Reconstruction) -> State {
        let mut cameras = Vec::<CameraBlock>::with_capacity(reconstruction.camera_count());
        let mut n_camera_params = 0;
        for (i, (id, camera)) in reconstruction.cameras().iter().enumerate() {
            let offset = match i {
                0 => None,
                _ => Some(n_camera_params)
            };
            let block = CameraBlock { id: *id, camera: *camera, offset };
            n_camera_params += block.param_size();
            cameras.push(block);
        }

        let mut points = Vec::<(StructureId, Vector3<Float>)>::new();
        let mut point_index = HashMap::<StructureId, usize>::new();
        let mut observations = Vec::<Observation>::new();
        for (camera_index, block) in cameras.iter().enumerate() {
            for (track, feature) in matches.features_in_image(block.id.image()) {
                let position = match reconstruction.structure(track) {
                    Some(Structure::Point(p)) => match p.get_euclidean_representation() {
                        Some(position) => position.coords,
                        None => continue
                    },
                    None => continue
                };
                let id = StructureId(track);
                let point = *point_index.entry(id).or_insert_with(|| {
                    points.push((id, position));
                    points.len() - 1
                });
                observations.push(Observation { camera: camera_index, point, feature: feature.get_as_2d_point() });
            }
        }

        State { cameras, points, observations, n_camera_params }
    }

    pub fn n_params(&self) -> usize {
        self.n_camera_params + LANDMARK_PARAM_SIZE*self.points.len()
    }

    pub fn parameter_norm(&self) -> Float {
        let camera_norm = self.cameras.iter().filter(|b| b.offset.is_some()).map(|b| match &b.camera {
            Camera::Pinhole(c) => c.translation().norm_squared(),
            Camera::Projective(c) => c.projection_matrix().norm_squared()
        }).sum::<Float>();
        let point_norm = self.points.iter().map(|(_, p)| p.norm_squared()).sum::<Float>();
        (camera_norm + point_norm).sqrt()
    }

    /**
     * Residual of an observation against the current estimate, None if the point has no image.
     */
    pub fn residual(&self, observation: &Observation) -> Option<Vector2<Float>> {
        let camera = &self.cameras[observation.camera].camera;
        let (_, point) = &self.points[observation.point];
        camera.project(&point.push(1.0)).map(|x| x - observation.feature)
    }

    pub fn residuals(&self) -> Option<DVector<Float>> {
        let mut residuals = DVector::<Float>::zeros(2*self.observations.len());
        for (i, observation) in self.observations.iter().enumerate() {
            residuals.fixed_rows_mut::<2>(2*i).copy_from(&self.residual(observation)?);
        }
        Some(residuals)
    }

    pub fn linearize(&self, observation: &Observation) -> Option<LinearizedObservation> {
        let block = &self.cameras[observation.camera];
        let (_, point) = &self.points[observation.point];
        let residual = self.residual(observation)?;
        let (camera_jacobian, point_jacobian) = match &block.camera {
            Camera::Pinhole(c) => pinhole_jacobians(c, point)?,
            Camera::Projective(c) => projective_jacobians(c, point)?
        };
        let camera_jacobian = match block.offset {
            Some(_) => camera_jacobian,
            None => DMatrix::<Float>::zeros(2, 0)
        };
        Some(LinearizedObservation { residual, camera_jacobian, point_jacobian })
    }

    /**
     * Returns a new state moved by the perturbation, laid out as [cameras, points].
     */
    pub fn perturbed(&self, perturb: &DVector<Float>) -> State {
        let mut new_state = self.clone();
        for block in new_state.cameras.iter_mut() {
            let offset = match block.offset {
                Some(o) => o,
                None => continue
            };
            block.camera = match &block.camera {
                Camera::Pinhole(c) => {
                    let u = Vector3::<Float>::new(perturb[offset], perturb[offset + 1], perturb[offset + 2]);
                    let w = Vector3::<Float>::new(perturb[offset + 3], perturb[offset + 4], perturb[offset + 5]);
                    Camera::Pinhole(c.left_perturbed(&u, &w))
                },
                Camera::Projective(c) => {
                    let delta = Matrix3x4::<Float>::from_row_slice(&perturb.as_slice()[offset..offset + PROJECTIVE_PARAM_SIZE]);
                    Camera::Projective(ProjectiveCamera::new(c.projection_matrix() + delta))
                }
            };
        }
        for (i, (_, point)) in new_state.points.iter_mut().enumerate() {
            let offset = self.n_camera_params + LANDMARK_PARAM_SIZE*i;
            *point += perturb.fixed_rows::<LANDMARK_PARAM_SIZE>(offset);
        }
        new_state
    }
}

fn pinhole_jacobians(camera: &PinholeCamera, point: &Vector3<Float>) -> Option<(DMatrix<Float>, Matrix2x3<Float>)> {
    let transformed_point = camera.transform_to_camera_frame(point);
    let projection_jacobian = camera.get_jacobian_with_respect_to_position_in_camera_frame(&transformed_point)?;
    let lie_jacobian = left_jacobian_around_identity(&transformed_point);
    let camera_jacobian = projection_jacobian*lie_jacobian;
    let point_jacobian = projection_jacobian*camera.rotation();
    Some((DMatrix::<Float>::from_column_slice(2, PINHOLE_PARAM_SIZE, camera_jacobian.as_slice()), point_jacobian))
}

#[allow(non_snake_case)]
fn projective_jacobians(camera: &ProjectiveCamera, point: &Vector3<Float>) -> Option<(DMatrix<Float>, Matrix2x3<Float>)> {
    let P = camera.projection_matrix();
    let X: Vector4<Float> = point.push(1.0);
    let x = P*X;
    let w = x[2];
    if w.abs() < Float::EPSILON {
        return None;
    }
    let u = x[0]/w;
    let v = x[1]/w;

    let mut camera_jacobian = DMatrix::<Float>::zeros(2, PROJECTIVE_PARAM_SIZE);
    for j in 0..4 {
        camera_jacobian[(0, j)] = X[j]/w;
        camera_jacobian[(0, 8 + j)] = -u*X[j]/w;
        camera_jacobian[(1, 4 + j)] = X[j]/w;
        camera_jacobian[(1, 8 + j)] = -v*X[j]/w;
    }

    let mut point_jacobian = Matrix2x3::<Float>::zeros();
    for j in 0..3 {
        point_jacobian[(0, j)] = (P[(0, j)] - u*P[(2, j)])/w;
        point_jacobian[(1, j)] = (P[(1, j)] - v*P[(2, j)])/w;
    }
    Some((camera_jacobian, point_jacobian))
}
