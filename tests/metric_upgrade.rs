extern crate nalgebra as na;

use approx::assert_relative_eq;
use na::Matrix3;
use vision_sfm::image::features::matches::Matches;
use vision_sfm::sensors::camera::Camera;
use vision_sfm::sfm::bundle_adjustment::reprojection_rms;
use vision_sfm::sfm::epipolar::reconstruct_from_two_uncalibrated_views;
use vision_sfm::sfm::error::ReconstructionError;
use vision_sfm::sfm::metric_upgrade::{intrinsics_deviation, upgrade_to_metric};
use vision_sfm::sfm::pnp::uncalibrated_camera_resection;
use vision_sfm::sfm::reconstruction::Reconstruction;
use vision_sfm::sfm::runtime_parameters::ReconstructionParameters;
use vision_sfm::sfm::synthetic::{generate_matches, n_view_dataset, NViewDataSetConfig};
use vision_sfm::sfm::triangulation::point_structure_triangulation;
use vision_sfm::Float;

fn projective_reconstruction(matches: &Matches, n_views: usize, parameters: &ReconstructionParameters, reconstruction: &mut Reconstruction) -> Matches {
    let mut inliers = reconstruct_from_two_uncalibrated_views(matches, 0, 1, parameters, reconstruction)
        .expect("uncalibrated two view reconstruction");
    point_structure_triangulation(&inliers, 1, 2, parameters, reconstruction);
    for i in 2..n_views {
        inliers = uncalibrated_camera_resection(&inliers, i, parameters, reconstruction)
            .expect("uncalibrated resection");
        point_structure_triangulation(&inliers, i, 2, parameters, reconstruction);
    }
    inliers
}

#[test]
fn projective_reconstruction_upgrades_to_the_true_intrinsics() {
    let n_views = 6;
    let data = n_view_dataset(n_views, 80, &NViewDataSetConfig::default());
    let matches = generate_matches(&data, 0, 1);
    let mut parameters = ReconstructionParameters::default();
    parameters.metric_upgrade.principal_point = Some([500.0, 500.0]);
    let mut reconstruction = Reconstruction::new();

    let inliers = projective_reconstruction(&matches, n_views, &parameters, &mut reconstruction);
    assert_eq!(reconstruction.camera_count(), n_views);
    assert!(reconstruction.cameras().values().all(|c| matches!(c, Camera::Projective(_))));
    assert!(reprojection_rms(&inliers, &reconstruction) < 1e-3);

    upgrade_to_metric(&inliers, &parameters, &mut reconstruction).expect("metric upgrade");

    for (id, camera) in reconstruction.cameras().iter() {
        let pinhole = camera.as_pinhole().expect("upgraded camera is a pinhole camera");
        let intrinsics = pinhole.intrinsics();
        assert_relative_eq!(pinhole.get_fx(), 1000.0, max_relative = 1e-3);
        assert_relative_eq!(pinhole.get_fy(), 1000.0, max_relative = 1e-3);
        assert_relative_eq!(intrinsics[(0, 2)], 500.0, max_relative = 1e-3);
        assert_relative_eq!(intrinsics[(1, 2)], 500.0, max_relative = 1e-3);
        assert!(intrinsics[(0, 1)].abs() < 1.0, "camera {:?} has skew {}", id, intrinsics[(0, 1)]);
    }

    for (track, structure) in reconstruction.structures().iter() {
        for image in inliers.images_observing(track.track()) {
            let camera = reconstruction.camera(image).expect("camera");
            assert!(camera.depth(structure.coords()) > 0.0);
        }
    }
    assert!(reprojection_rms(&inliers, &reconstruction) < 1e-3);
}

#[test]
fn metric_upgrade_needs_three_cameras() {
    let data = n_view_dataset(3, 30, &NViewDataSetConfig::default());
    let matches = generate_matches(&data, 0, 1);
    let parameters = ReconstructionParameters::default();
    let mut reconstruction = Reconstruction::new();

    let inliers = projective_reconstruction(&matches, 2, &parameters, &mut reconstruction);
    let result = upgrade_to_metric(&inliers, &parameters, &mut reconstruction);

    assert!(matches!(result, Err(ReconstructionError::DegenerateConfiguration(_))));
    assert!(reconstruction.cameras().values().all(|c| matches!(c, Camera::Projective(_))));
}

#[test]
fn wrong_principal_point_does_not_produce_a_metric_store() {
    let n_views = 6;
    let data = n_view_dataset(n_views, 80, &NViewDataSetConfig::default());
    let matches = generate_matches(&data, 0, 1);
    let parameters = ReconstructionParameters::default();
    let mut reconstruction = Reconstruction::new();

    let inliers = projective_reconstruction(&matches, n_views, &parameters, &mut reconstruction);
    let before = reconstruction.clone();
    let result = upgrade_to_metric(&inliers, &parameters, &mut reconstruction);

    assert!(matches!(result, Err(ReconstructionError::DegenerateConfiguration(_))));
    assert_eq!(reconstruction.cameras(), before.cameras());
    assert_eq!(reconstruction.structures(), before.structures());
}

#[test]
fn intrinsics_deviation_measures_skew_aspect_and_principal_point() {
    let metric = Matrix3::<Float>::new(2.0, 0.0, 0.0,
                                       0.0, 2.0, 0.0,
                                       0.0, 0.0, 1.0);
    assert_relative_eq!(intrinsics_deviation(&metric), 0.0);

    let skewed = Matrix3::<Float>::new(2.0, 0.4, 0.0,
                                       0.0, 2.0, 0.0,
                                       0.0, 0.0, 1.0);
    assert_relative_eq!(intrinsics_deviation(&skewed), 0.2);

    let stretched = Matrix3::<Float>::new(2.0, 0.0, 0.1,
                                          0.0, 3.0, 0.0,
                                          0.0, 0.0, 1.0);
    assert_relative_eq!(intrinsics_deviation(&stretched), 0.5);
}
