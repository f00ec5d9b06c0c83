extern crate nalgebra as na;

use approx::assert_relative_eq;
use na::{Matrix3, Vector3};
use vision_sfm::image::features::{PointFeature, matches::Matches};
use vision_sfm::sensors::camera::{Camera, pinhole::PinholeCamera, projective::ProjectiveCamera};
use vision_sfm::sfm::epipolar::{reconstruct_from_two_calibrated_views, reconstruct_from_two_uncalibrated_views};
use vision_sfm::sfm::error::ReconstructionError;
use vision_sfm::sfm::reconstruction::{CameraId, Reconstruction};
use vision_sfm::sfm::runtime_parameters::ReconstructionParameters;
use vision_sfm::sfm::synthetic::{generate_matches, n_view_dataset, NViewDataSet, NViewDataSetConfig};
use vision_sfm::Float;

fn first_tracks(data: &NViewDataSet, n_tracks: usize) -> Matches {
    let mut matches = Matches::new();
    for view in 0..2 {
        for p in 0..n_tracks {
            matches.insert(view, p, PointFeature::from(data.observations[view][p]));
        }
    }
    matches
}

fn pinhole(reconstruction: &Reconstruction, id: usize) -> PinholeCamera {
    *reconstruction.camera(id).and_then(|c| c.as_pinhole()).expect("pinhole camera")
}

#[test]
fn six_correspondences_are_not_enough() {
    let data = n_view_dataset(3, 20, &NViewDataSetConfig::default());
    let matches = first_tracks(&data, 6);
    let mut reconstruction = Reconstruction::new();

    let result = reconstruct_from_two_uncalibrated_views(&matches, 0, 1, &ReconstructionParameters::default(), &mut reconstruction);

    match result {
        Err(ReconstructionError::InsufficientCorrespondences { required, found }) => {
            assert_eq!(required, 7);
            assert_eq!(found, 6);
        },
        other => panic!("unexpected result {:?}", other)
    }
    assert_eq!(reconstruction.camera_count(), 0);
}

#[test]
fn seven_correspondences_are_enough() {
    let data = n_view_dataset(3, 20, &NViewDataSetConfig::default());
    let matches = first_tracks(&data, 7);
    let mut reconstruction = Reconstruction::new();

    let inliers = reconstruct_from_two_uncalibrated_views(&matches, 0, 1, &ReconstructionParameters::default(), &mut reconstruction)
        .expect("seven point reconstruction");

    assert_eq!(reconstruction.camera_count(), 2);
    assert_eq!(reconstruction.camera(0usize), Some(&Camera::Projective(ProjectiveCamera::canonical())));
    assert_eq!(inliers.common_tracks(&[0, 1]).len(), 7);
}

#[test]
fn calibrated_two_views_recover_the_relative_pose() {
    let data = n_view_dataset(6, 100, &NViewDataSetConfig::default());
    let matches = generate_matches(&data, 0, 1);
    let intrinsics = data.intrinsics[0];

    let mut reconstruction = Reconstruction::new();
    reconstruction.insert_camera(0usize, Camera::Pinhole(data.camera(0)));
    reconstruct_from_two_calibrated_views(&matches, 0, 1, &intrinsics, &intrinsics, &ReconstructionParameters::default(), &mut reconstruction)
        .expect("calibrated reconstruction");

    assert_eq!(reconstruction.camera_count(), 2);
    let camera_0 = pinhole(&reconstruction, 0);
    assert_eq!(*camera_0.rotation(), data.rotations[0]);
    assert_eq!(*camera_0.translation(), data.translations[0]);

    let camera_1 = pinhole(&reconstruction, 1);
    assert_relative_eq!(*camera_1.rotation(), data.rotations[1], epsilon = 1e-8);

    let relative_rotation = data.rotations[1]*data.rotations[0].transpose();
    let expected_direction = (data.translations[1] - relative_rotation*data.translations[0]).normalize();
    let estimated = camera_1.translation() - camera_1.rotation()*camera_0.rotation().transpose()*camera_0.translation();
    assert_relative_eq!(estimated.norm(), 1.0, epsilon = 1e-8);
    assert_relative_eq!(estimated, expected_direction, epsilon = 1e-8);
}

#[test]
fn calibrated_two_views_start_at_the_origin() {
    let data = n_view_dataset(3, 50, &NViewDataSetConfig::default());
    let matches = generate_matches(&data, 0, 1);
    let intrinsics = data.intrinsics[0];

    let mut reconstruction = Reconstruction::new();
    let inliers = reconstruct_from_two_calibrated_views(&matches, 0, 1, &intrinsics, &intrinsics, &ReconstructionParameters::default(), &mut reconstruction)
        .expect("calibrated reconstruction");

    let camera_0 = pinhole(&reconstruction, 0);
    assert_eq!(*camera_0.rotation(), Matrix3::<Float>::identity());
    assert_eq!(*camera_0.translation(), Vector3::<Float>::zeros());
    assert_relative_eq!(pinhole(&reconstruction, 1).translation().norm(), 1.0, epsilon = 1e-8);
    assert_eq!(inliers.common_tracks(&[0, 1]).len(), 50);
    assert_eq!(reconstruction.matches().common_tracks(&[0, 1]).len(), 50);
}

#[test]
fn calibrated_two_views_reject_a_projective_reference() {
    let data = n_view_dataset(3, 20, &NViewDataSetConfig::default());
    let matches = generate_matches(&data, 0, 1);
    let intrinsics = data.intrinsics[0];

    let mut reconstruction = Reconstruction::new();
    reconstruction.insert_camera(0usize, Camera::Projective(ProjectiveCamera::canonical()));
    let result = reconstruct_from_two_calibrated_views(&matches, 0, 1, &intrinsics, &intrinsics, &ReconstructionParameters::default(), &mut reconstruction);

    match result {
        Err(ReconstructionError::CameraModelMismatch { camera, .. }) => assert_eq!(camera, CameraId(0)),
        other => panic!("unexpected result {:?}", other)
    }
    assert_eq!(reconstruction.camera_count(), 1);
}
