extern crate nalgebra as na;

use na::{Matrix3, Matrix3x4, Vector2, Vector3};
use crate::Float;
use crate::image::features::{Feature, matches::{Matches, ImageId, TrackId}};
use crate::numerics::ransac::{ransac, Estimator};
use crate::sensors::camera::{Camera, pinhole::PinholeCamera, projective::ProjectiveCamera};
use crate::sfm::{error::{ReconstructionError, Result}, reconstruction::Reconstruction, runtime_parameters::{ReconstructionParameters, PoseRefinementParameters}};

pub mod dlt;
pub mod epnp;
pub mod solver;

const MIN_UNCALIBRATED_CORRESPONDENCES: usize = 6;
const MIN_CALIBRATED_CORRESPONDENCES: usize = 5;

pub type PointCorrespondence = (Vector2<Float>, Vector3<Float>);

pub struct ProjectionEstimator;

impl Estimator for ProjectionEstimator {
    type Datum = PointCorrespondence;
    type Model = Matrix3x4<Float>;

    const MIN_SAMPLES: usize = MIN_UNCALIBRATED_CORRESPONDENCES;

    fn fit(&self, data: &[Self::Datum], sample: &[usize]) -> Vec<Self::Model> {
        self.refit(data, sample).into_iter().collect()
    }

    fn residual(&self, model: &Self::Model, datum: &Self::Datum) -> Float {
        match ProjectiveCamera::new(*model).project(&datum.1.push(1.0)) {
            Some(x) => (x - datum.0).norm(),
            None => Float::INFINITY
        }
    }

    fn refit(&self, data: &[Self::Datum], inliers: &[usize]) -> Option<Self::Model> {
        let image = inliers.iter().map(|&i| data[i].0).collect::<Vec<Vector2<Float>>>();
        let world = inliers.iter().map(|&i| data[i].1).collect::<Vec<Vector3<Float>>>();
        dlt::projection_dlt(&image, &world)
    }
}

pub struct PoseEstimator {
    intrinsics: Matrix3<Float>,
    intrinsics_inv: Matrix3<Float>,
    refinement: PoseRefinementParameters
}

#[allow(non_snake_case)]
impl PoseEstimator {
    pub fn new(K: &Matrix3<Float>, refinement: &PoseRefinementParameters) -> Option<PoseEstimator> {
        Some(PoseEstimator { intrinsics: *K, intrinsics_inv: K.try_inverse()?, refinement: refinement.clone() })
    }

    fn normalize(&self, x: &Vector2<Float>) -> Vector2<Float> {
        let h = self.intrinsics_inv*x.push(1.0);
        Vector2::<Float>::new(h.x/h.z, h.y/h.z)
    }

    fn solve(&self, data: &[PointCorrespondence], indices: &[usize]) -> Option<PinholeCamera> {
        let image = indices.iter().map(|&i| self.normalize(&data[i].0)).collect::<Vec<Vector2<Float>>>();
        let world = indices.iter().map(|&i| data[i].1).collect::<Vec<Vector3<Float>>>();
        let (R, t) = epnp::epnp(&image, &world)?;
        Some(PinholeCamera::new(self.intrinsics, R, t))
    }
}

impl Estimator for PoseEstimator {
    type Datum = PointCorrespondence;
    type Model = PinholeCamera;

    const MIN_SAMPLES: usize = MIN_CALIBRATED_CORRESPONDENCES;

    fn fit(&self, data: &[Self::Datum], sample: &[usize]) -> Vec<Self::Model> {
        self.solve(data, sample).into_iter().collect()
    }

    fn residual(&self, model: &Self::Model, datum: &Self::Datum) -> Float {
        let p = model.transform_to_camera_frame(&datum.1);
        match p.z > 0.0 {
            true => model.project_from_camera_frame(&p).map_or(Float::INFINITY, |x| (x - datum.0).norm()),
            false => Float::INFINITY
        }
    }

    fn refit(&self, data: &[Self::Datum], inliers: &[usize]) -> Option<Self::Model> {
        let initial = self.solve(data, inliers)?;
        let image = inliers.iter().map(|&i| data[i].0).collect::<Vec<Vector2<Float>>>();
        let world = inliers.iter().map(|&i| data[i].1).collect::<Vec<Vector3<Float>>>();
        Some(solver::refine_pose(&initial, &world, &image, &self.refinement))
    }
}

/**
 * Tracks of `image` that already have finite structure, with their observation and 3D position.
 */
fn reconstructed_correspondences(matches: &Matches, image: ImageId, reconstruction: &Reconstruction) -> (Vec<TrackId>, Vec<PointCorrespondence>) {
    matches.features_in_image(image)
        .filter_map(|(track, feature)| {
            let point = reconstruction.structure(track)?.as_point()?.get_euclidean_representation()?;
            Some((track, (feature.get_as_2d_point(), point.coords)))
        })
        .unzip()
}

fn resection_inliers(matches: &Matches, image: ImageId, tracks: &[TrackId], inliers: &[usize], reconstruction: &mut Reconstruction) -> Matches {
    let mut is_inlier = vec![false; tracks.len()];
    for &i in inliers {
        is_inlier[i] = true;
    }
    let outliers = tracks.iter().zip(is_inlier.iter()).filter(|(_, inlier)| !**inlier).map(|(t, _)| *t).collect::<Vec<TrackId>>();
    for &i in inliers {
        if let Some(feature) = matches.get(image, tracks[i]) {
            reconstruction.matches_mut().insert(image, tracks[i], *feature);
        }
    }
    log::debug!("resection of image {}: {} inliers, {} outliers", image, inliers.len(), outliers.len());
    matches.without_observations(image, &outliers)
}

/**
 * Adds a projective camera for `image` from the structure it observes. Needs six reconstructed tracks.
 */
pub fn uncalibrated_camera_resection(
    matches: &Matches,
    image: ImageId,
    parameters: &ReconstructionParameters,
    reconstruction: &mut Reconstruction) -> Result<Matches> {
    let (tracks, correspondences) = reconstructed_correspondences(matches, image, reconstruction);
    if correspondences.len() < MIN_UNCALIBRATED_CORRESPONDENCES {
        return Err(ReconstructionError::InsufficientCorrespondences { required: MIN_UNCALIBRATED_CORRESPONDENCES, found: correspondences.len() });
    }

    let result = ransac(&ProjectionEstimator, &correspondences, &parameters.resection)
        .ok_or_else(|| ReconstructionError::NoGeometricSolution(format!("no projection matrix for image {}", image)))?;

    reconstruction.insert_camera(image, Camera::Projective(ProjectiveCamera::new(result.model)));
    log::info!("uncalibrated resection of image {}: rms {}", image, result.inlier_rms);
    Ok(resection_inliers(matches, image, &tracks, &result.inliers, reconstruction))
}

/**
 * Adds a calibrated camera for `image` from the structure it observes. Needs five reconstructed tracks.
 */
#[allow(non_snake_case)]
pub fn calibrated_camera_resection(
    matches: &Matches,
    image: ImageId,
    K: &Matrix3<Float>,
    parameters: &ReconstructionParameters,
    reconstruction: &mut Reconstruction) -> Result<Matches> {
    let (tracks, correspondences) = reconstructed_correspondences(matches, image, reconstruction);
    if correspondences.len() < MIN_CALIBRATED_CORRESPONDENCES {
        return Err(ReconstructionError::InsufficientCorrespondences { required: MIN_CALIBRATED_CORRESPONDENCES, found: correspondences.len() });
    }

    let estimator = PoseEstimator::new(K, &parameters.pose_refinement)
        .ok_or_else(|| ReconstructionError::DegenerateConfiguration("singular intrinsics".to_string()))?;
    let result = ransac(&estimator, &correspondences, &parameters.resection)
        .ok_or_else(|| ReconstructionError::NoGeometricSolution(format!("no pose for image {}", image)))?;

    reconstruction.insert_camera(image, Camera::Pinhole(result.model));
    log::info!("calibrated resection of image {}: rms {}", image, result.inlier_rms);
    Ok(resection_inliers(matches, image, &tracks, &result.inliers, reconstruction))
}
