extern crate nalgebra as na;

use na::{Matrix3, Matrix4, Vector2};
use crate::Float;
use crate::image::features::{Feature, matches::{Matches, ImageId, TrackId}};
use crate::numerics::ransac::ransac;
use crate::sensors::camera::{Camera, pinhole::PinholeCamera, projective::ProjectiveCamera};
use crate::sfm::{error::{ReconstructionError, Result}, reconstruction::{CameraId, Reconstruction}, runtime_parameters::ReconstructionParameters};

pub mod tensor;

use tensor::{essential_from_fundamental, projective_camera_from_fundamental, relative_pose_from_essential, fundamental::{Correspondence, FundamentalEstimator}};

const MIN_TWO_VIEW_CORRESPONDENCES: usize = 7;

struct EpipolarConsensus {
    fundamental: Matrix3<Float>,
    inlier_tracks: Vec<TrackId>,
    inlier_correspondences: Vec<Correspondence>,
    inlier_matches: Matches
}

/**
 * Robust fundamental matrix between two images over their common tracks.
 * The returned matches are the input without the outlier observations of both images.
 */
fn epipolar_consensus(matches: &Matches, image_one: ImageId, image_two: ImageId, parameters: &ReconstructionParameters) -> Result<EpipolarConsensus> {
    let tracks = matches.common_tracks(&[image_one, image_two]);
    if tracks.len() < MIN_TWO_VIEW_CORRESPONDENCES {
        return Err(ReconstructionError::InsufficientCorrespondences { required: MIN_TWO_VIEW_CORRESPONDENCES, found: tracks.len() });
    }

    let correspondences = tracks.iter()
        .filter_map(|track| Some((matches.get(image_one, *track)?.get_as_2d_point(), matches.get(image_two, *track)?.get_as_2d_point())))
        .collect::<Vec<Correspondence>>();

    let result = ransac(&FundamentalEstimator, &correspondences, &parameters.two_view)
        .ok_or_else(|| ReconstructionError::NoGeometricSolution(format!("no fundamental matrix between images {} and {}", image_one, image_two)))?;

    let mut is_inlier = vec![false; tracks.len()];
    for &i in &result.inliers {
        is_inlier[i] = true;
    }
    let outlier_tracks = tracks.iter().zip(is_inlier.iter()).filter(|(_, inlier)| !**inlier).map(|(t, _)| *t).collect::<Vec<TrackId>>();
    let inlier_tracks = result.inliers.iter().map(|&i| tracks[i]).collect::<Vec<TrackId>>();
    let inlier_correspondences = result.inliers.iter().map(|&i| correspondences[i]).collect::<Vec<Correspondence>>();

    log::debug!("two view {}-{}: {} of {} common tracks are inliers", image_one, image_two, inlier_tracks.len(), tracks.len());

    let inlier_matches = matches
        .without_observations(image_one, &outlier_tracks)
        .without_observations(image_two, &outlier_tracks);

    Ok(EpipolarConsensus { fundamental: result.model, inlier_tracks, inlier_correspondences, inlier_matches })
}

fn record_inliers(reconstruction: &mut Reconstruction, matches: &Matches, images: &[ImageId], tracks: &[TrackId]) -> () {
    for &image in images {
        for &track in tracks {
            if let Some(feature) = matches.get(image, track) {
                reconstruction.matches_mut().insert(image, track, *feature);
            }
        }
    }
}

/**
 * Initialises a projective reconstruction from two uncalibrated images.
 * The first image keeps its camera if it has one, otherwise it gets [I|0]. The second camera is derived from F.
 */
#[allow(non_snake_case)]
pub fn reconstruct_from_two_uncalibrated_views(
    matches: &Matches,
    image_one: ImageId,
    image_two: ImageId,
    parameters: &ReconstructionParameters,
    reconstruction: &mut Reconstruction) -> Result<Matches> {
    let consensus = epipolar_consensus(matches, image_one, image_two, parameters)?;

    let P_b_canonical = projective_camera_from_fundamental(&consensus.fundamental)
        .ok_or_else(|| ReconstructionError::NoGeometricSolution("fundamental matrix has no epipole".to_string()))?;

    let P_b = match reconstruction.camera(image_one).map(|c| c.projection_matrix()) {
        None => {
            reconstruction.insert_camera(image_one, Camera::Projective(ProjectiveCamera::canonical()));
            P_b_canonical
        },
        Some(P_a) => {
            let mut H = Matrix4::<Float>::identity();
            H.fixed_view_mut::<3,4>(0,0).copy_from(&P_a);
            if H.fixed_view::<3,3>(0,0).determinant().abs() < Float::EPSILON {
                return Err(ReconstructionError::DegenerateConfiguration(format!("camera of image {} has a singular left block", image_one)));
            }
            P_b_canonical*H
        }
    };

    let norm = P_b.norm();
    reconstruction.insert_camera(image_two, Camera::Projective(ProjectiveCamera::new(P_b/norm)));
    record_inliers(reconstruction, &consensus.inlier_matches, &[image_one, image_two], &consensus.inlier_tracks);

    log::info!("uncalibrated two view reconstruction of images {} and {} with {} inliers", image_one, image_two, consensus.inlier_tracks.len());
    Ok(consensus.inlier_matches)
}

/**
 * Initialises a metric reconstruction from two calibrated images.
 * The second camera is placed relative to the first with a unit baseline.
 */
#[allow(non_snake_case)]
pub fn reconstruct_from_two_calibrated_views(
    matches: &Matches,
    image_one: ImageId,
    image_two: ImageId,
    K_one: &Matrix3<Float>,
    K_two: &Matrix3<Float>,
    parameters: &ReconstructionParameters,
    reconstruction: &mut Reconstruction) -> Result<Matches> {
    let existing = match reconstruction.camera(image_one) {
        None => None,
        Some(Camera::Pinhole(c)) => Some(*c),
        Some(Camera::Projective(_)) => return Err(ReconstructionError::CameraModelMismatch { camera: CameraId(image_one), expected: "pinhole" })
    };

    let consensus = epipolar_consensus(matches, image_one, image_two, parameters)?;

    let K_one_inv = K_one.try_inverse().ok_or_else(|| ReconstructionError::DegenerateConfiguration("singular intrinsics".to_string()))?;
    let K_two_inv = K_two.try_inverse().ok_or_else(|| ReconstructionError::DegenerateConfiguration("singular intrinsics".to_string()))?;
    let normalize = |K_inv: &Matrix3<Float>, x: &Vector2<Float>| {
        let h = K_inv*x.push(1.0);
        Vector2::<Float>::new(h.x/h.z, h.y/h.z)
    };
    let normalized = consensus.inlier_correspondences.iter()
        .map(|(a, b)| (normalize(&K_one_inv, a), normalize(&K_two_inv, b)))
        .collect::<Vec<_>>();

    let E = essential_from_fundamental(&consensus.fundamental, K_one, K_two);
    let (R_rel, t_rel, in_front) = relative_pose_from_essential(&E, &normalized)
        .ok_or_else(|| ReconstructionError::NoGeometricSolution("essential matrix decomposition failed".to_string()))?;

    if in_front == 0 || 2*in_front <= normalized.len() {
        return Err(ReconstructionError::NoGeometricSolution(
            format!("best essential decomposition has only {} of {} points in front of both cameras", in_front, normalized.len())));
    }

    let camera_one = match existing {
        Some(c) => c,
        None => {
            let c = PinholeCamera::at_world_origin(*K_one);
            reconstruction.insert_camera(image_one, Camera::Pinhole(c));
            c
        }
    };

    let R_two = R_rel*camera_one.rotation();
    let t_two = R_rel*camera_one.translation() + t_rel;
    reconstruction.insert_camera(image_two, Camera::Pinhole(PinholeCamera::new(*K_two, R_two, t_two)));
    record_inliers(reconstruction, &consensus.inlier_matches, &[image_one, image_two], &consensus.inlier_tracks);

    log::info!("calibrated two view reconstruction of images {} and {}: {} inliers, {} in front", image_one, image_two, consensus.inlier_tracks.len(), in_front);
    Ok(consensus.inlier_matches)
}
