extern crate nalgebra as na;

use approx::assert_relative_eq;
use na::{Matrix3, Vector3};
use vision_sfm::image::features::{PointFeature, matches::Matches};
use vision_sfm::numerics::lie::exp_so3;
use vision_sfm::sensors::camera::{Camera, pinhole::PinholeCamera};
use vision_sfm::sfm::epipolar::reconstruct_from_two_calibrated_views;
use vision_sfm::sfm::error::ReconstructionError;
use vision_sfm::sfm::landmark::{Structure, euclidean_landmark::PointStructure};
use vision_sfm::sfm::pnp::{calibrated_camera_resection, uncalibrated_camera_resection};
use vision_sfm::sfm::reconstruction::Reconstruction;
use vision_sfm::sfm::runtime_parameters::ReconstructionParameters;
use vision_sfm::sfm::synthetic::{generate_matches, n_view_dataset, NViewDataSet, NViewDataSetConfig};
use vision_sfm::sfm::triangulation::point_structure_triangulation;
use vision_sfm::Float;

const PRECISION_ORIENTATION: f64 = 5e-2;
const PRECISION_POSITION: f64 = 5e-2;

fn pinhole(reconstruction: &Reconstruction, id: usize) -> PinholeCamera {
    *reconstruction.camera(id).and_then(|c| c.as_pinhole()).expect("pinhole camera")
}

/**
 * Two-view initialisation against the true first camera, with the second camera moved to the true baseline length.
 */
fn initialise_at_true_scale(data: &NViewDataSet, matches: &Matches, parameters: &ReconstructionParameters, reconstruction: &mut Reconstruction) -> Matches {
    reconstruction.insert_camera(0usize, Camera::Pinhole(data.camera(0)));
    let inliers = reconstruct_from_two_calibrated_views(matches, 0, 1, &data.intrinsics[0], &data.intrinsics[1], parameters, reconstruction)
        .expect("calibrated two view reconstruction");

    let camera_0 = data.camera(0);
    let mut camera_1 = pinhole(reconstruction, 1);
    let relative_rotation = camera_1.rotation()*camera_0.rotation().transpose();
    let estimated_baseline = camera_1.translation() - relative_rotation*camera_0.translation();
    let true_baseline = data.translations[1] - data.rotations[1]*data.rotations[0].transpose()*data.translations[0];
    let scale = true_baseline.norm()/estimated_baseline.norm();
    camera_1.set_translation(relative_rotation*camera_0.translation() + estimated_baseline*scale);
    reconstruction.insert_camera(1usize, Camera::Pinhole(camera_1));
    inliers
}

#[test]
fn six_views_with_outliers() {
    let n_views = 6;
    let n_points = 100;
    let n_outliers = 40;
    let data = n_view_dataset(n_views, n_points, &NViewDataSetConfig::default());
    let matches = generate_matches(&data, n_outliers, 7);
    let parameters = ReconstructionParameters::default();
    let mut reconstruction = Reconstruction::new();

    let mut inliers = initialise_at_true_scale(&data, &matches, &parameters, &mut reconstruction);
    assert_eq!(reconstruction.camera_count(), 2);
    let camera_1 = pinhole(&reconstruction, 1);
    assert_relative_eq!(*camera_1.rotation(), data.rotations[1], epsilon = PRECISION_ORIENTATION);
    assert_relative_eq!(*camera_1.translation(), data.translations[1], epsilon = PRECISION_POSITION);

    let triangulated = point_structure_triangulation(&inliers, 1, 2, &parameters, &mut reconstruction);
    assert!(triangulated >= n_points - n_outliers);

    for i in 2..n_views {
        inliers = calibrated_camera_resection(&inliers, i, &data.intrinsics[i], &parameters, &mut reconstruction)
            .expect("calibrated resection");
        assert_eq!(reconstruction.camera_count(), i + 1);

        let camera = pinhole(&reconstruction, i);
        assert_relative_eq!(*camera.rotation(), data.rotations[i], epsilon = PRECISION_ORIENTATION);
        assert_relative_eq!(*camera.translation(), data.translations[i], epsilon = PRECISION_POSITION);

        point_structure_triangulation(&inliers, i, 3, &parameters, &mut reconstruction);
    }

    reconstruction.clear_cameras();
    reconstruction.clear_structures();
    assert_eq!(reconstruction.camera_count(), 0);
    assert_eq!(reconstruction.structure_count(), 0);
}

#[test]
fn triangulation_is_idempotent() {
    let data = n_view_dataset(3, 60, &NViewDataSetConfig::default());
    let matches = generate_matches(&data, 0, 1);
    let parameters = ReconstructionParameters::default();
    let mut reconstruction = Reconstruction::new();
    let inliers = initialise_at_true_scale(&data, &matches, &parameters, &mut reconstruction);

    let first = point_structure_triangulation(&inliers, 1, 2, &parameters, &mut reconstruction);
    assert_eq!(first, 60);
    let structures = reconstruction.structures().clone();

    let second = point_structure_triangulation(&inliers, 1, 2, &parameters, &mut reconstruction);
    assert_eq!(second, 0);
    assert_eq!(reconstruction.structures(), &structures);

    for (id, structure) in reconstruction.structures().iter() {
        let point = structure.as_point().and_then(|p| p.get_euclidean_representation()).expect("finite point");
        assert_relative_eq!(point.coords, data.points[id.track()], epsilon = 1e-6);
    }
}

#[test]
fn triangulation_waits_for_enough_views() {
    let data = n_view_dataset(3, 30, &NViewDataSetConfig::default());
    let matches = generate_matches(&data, 0, 1);
    let parameters = ReconstructionParameters::default();
    let mut reconstruction = Reconstruction::new();
    let inliers = initialise_at_true_scale(&data, &matches, &parameters, &mut reconstruction);

    assert_eq!(point_structure_triangulation(&inliers, 1, 3, &parameters, &mut reconstruction), 0);
    assert_eq!(reconstruction.structure_count(), 0);
}

#[test]
fn resection_without_structure_fails() {
    let data = n_view_dataset(3, 30, &NViewDataSetConfig::default());
    let matches = generate_matches(&data, 0, 1);
    let parameters = ReconstructionParameters::default();
    let mut reconstruction = Reconstruction::new();

    match calibrated_camera_resection(&matches, 2, &data.intrinsics[2], &parameters, &mut reconstruction) {
        Err(ReconstructionError::InsufficientCorrespondences { required, found }) => {
            assert_eq!(required, 5);
            assert_eq!(found, 0);
        },
        other => panic!("unexpected result {:?}", other)
    }
    match uncalibrated_camera_resection(&matches, 2, &parameters, &mut reconstruction) {
        Err(ReconstructionError::InsufficientCorrespondences { required, found }) => {
            assert_eq!(required, 6);
            assert_eq!(found, 0);
        },
        other => panic!("unexpected result {:?}", other)
    }
    assert_eq!(reconstruction.camera_count(), 0);
}

#[test]
fn resection_minimal_structure() {
    let data = n_view_dataset(3, 30, &NViewDataSetConfig::default());
    let matches = generate_matches(&data, 0, 1);
    let parameters = ReconstructionParameters::default();
    let mut reconstruction = Reconstruction::new();

    for p in 0..5usize {
        reconstruction.insert_structure(p, Structure::Point(PointStructure::from_euclidean(&data.points[p])));
    }
    let result = uncalibrated_camera_resection(&matches, 2, &parameters, &mut reconstruction);
    assert!(matches!(result, Err(ReconstructionError::InsufficientCorrespondences { required: 6, found: 5 })));

    reconstruction.insert_structure(5usize, Structure::Point(PointStructure::from_euclidean(&data.points[5])));
    uncalibrated_camera_resection(&matches, 2, &parameters, &mut reconstruction).expect("six point resection");
    let projection = *reconstruction.camera(2usize).and_then(|c| c.as_projective()).expect("projective camera").projection_matrix();
    let expected = data.projection(2);
    assert_relative_eq!(projection/projection.norm()*projection[(2, 3)].signum(),
                        expected/expected.norm()*expected[(2, 3)].signum(), epsilon = 1e-6);
}

#[test]
fn calibrated_resection_from_true_structure() {
    let data = n_view_dataset(4, 40, &NViewDataSetConfig::default());
    let matches = generate_matches(&data, 0, 1);
    let parameters = ReconstructionParameters::default();
    let mut reconstruction = Reconstruction::new();
    for (p, point) in data.points.iter().enumerate() {
        reconstruction.insert_structure(p, Structure::Point(PointStructure::from_euclidean(point)));
    }

    let inliers = calibrated_camera_resection(&matches, 3, &data.intrinsics[3], &parameters, &mut reconstruction)
        .expect("calibrated resection");

    let camera = pinhole(&reconstruction, 3);
    assert_relative_eq!(*camera.rotation(), data.rotations[3], epsilon = 1e-8);
    assert_relative_eq!(*camera.translation(), data.translations[3], epsilon = 1e-8);
    assert_eq!(inliers.tracks_in_image(3).len(), 40);
    assert_eq!(reconstruction.matches().tracks_in_image(3).len(), 40);
}

#[test]
fn calibrated_resection_of_a_planar_scene() {
    let intrinsics = Matrix3::<Float>::new(1000.0, 0.0, 500.0,
                                           0.0, 1000.0, 500.0,
                                           0.0, 0.0, 1.0);
    let truth = PinholeCamera::new(intrinsics, exp_so3(&Vector3::new(0.3, -0.1, 0.2)), Vector3::new(0.1, -0.2, 4.0));
    let mut matches = Matches::new();
    let mut reconstruction = Reconstruction::new();
    for p in 0..40usize {
        let point = Vector3::<Float>::new((0.37*p as Float).sin(), (0.91*p as Float + 0.5).cos(), 0.0);
        let x = truth.project_from_camera_frame(&truth.transform_to_camera_frame(&point)).expect("point in front of the camera");
        matches.insert(2, p, PointFeature::new(x.x, x.y));
        reconstruction.insert_structure(p, Structure::Point(PointStructure::from_euclidean(&point)));
    }

    let inliers = calibrated_camera_resection(&matches, 2, &intrinsics, &ReconstructionParameters::default(), &mut reconstruction)
        .expect("planar calibrated resection");

    let camera = pinhole(&reconstruction, 2);
    assert_relative_eq!(*camera.rotation(), *truth.rotation(), epsilon = 1e-6);
    assert_relative_eq!(*camera.translation(), *truth.translation(), epsilon = 1e-6);
    assert_eq!(inliers.tracks_in_image(2).len(), 40);
}
