extern crate nalgebra as na;

use approx::assert_relative_eq;
use vision_sfm::sensors::camera::Camera;
use vision_sfm::sfm::bundle_adjustment::reprojection_rms;
use vision_sfm::sfm::image_order::select_efficient_image_order;
use vision_sfm::sfm::incremental::{reconstruct_component, Intrinsics};
use vision_sfm::sfm::runtime_parameters::ReconstructionParameters;
use vision_sfm::sfm::synthetic::{generate_matches, n_view_dataset, NViewDataSetConfig};

#[test]
fn calibrated_component_is_reconstructed() {
    let n_views = 5;
    let data = n_view_dataset(n_views, 80, &NViewDataSetConfig { pixel_noise: 0.2, ..Default::default() });
    let matches = generate_matches(&data, 20, 3);
    let parameters = ReconstructionParameters::default();
    let intrinsics = (0..n_views).map(|i| (i, data.intrinsics[i])).collect::<Intrinsics>();

    let components = select_efficient_image_order(&matches, &parameters);
    assert_eq!(components.len(), 1);
    let order = &components[0];
    assert_eq!(order.len(), n_views);

    let reconstruction = reconstruct_component(&matches, order, Some(&intrinsics), &parameters).expect("reconstruction");

    assert_eq!(reconstruction.camera_count(), n_views);
    assert!(reconstruction.structure_count() >= 60);
    assert!(reprojection_rms(reconstruction.matches(), &reconstruction) < 1.0);

    let first = order[0];
    for &image in order.iter() {
        let camera = reconstruction.camera(image).and_then(|c| c.as_pinhole()).expect("pinhole camera");
        let expected = data.rotations[image]*data.rotations[first].transpose();
        let first_camera = reconstruction.camera(first).and_then(|c| c.as_pinhole()).expect("pinhole camera");
        let estimated = camera.rotation()*first_camera.rotation().transpose();
        assert_relative_eq!(estimated, expected, epsilon = 1e-2);
    }
}

#[test]
fn uncalibrated_component_is_upgraded_to_metric() {
    let n_views = 6;
    let data = n_view_dataset(n_views, 80, &NViewDataSetConfig::default());
    let matches = generate_matches(&data, 0, 1);
    let mut parameters = ReconstructionParameters::default();
    parameters.metric_upgrade.principal_point = Some([500.0, 500.0]);
    let order = (0..n_views).collect::<Vec<usize>>();

    let reconstruction = reconstruct_component(&matches, &order, None, &parameters).expect("reconstruction");

    assert_eq!(reconstruction.camera_count(), n_views);
    assert_eq!(reconstruction.structure_count(), 80);
    for camera in reconstruction.cameras().values() {
        let pinhole = camera.as_pinhole().expect("pinhole camera");
        assert_relative_eq!(pinhole.get_fx(), 1000.0, max_relative = 1e-3);
    }
    assert!(reprojection_rms(&matches, &reconstruction) < 1e-3);
}

#[test]
fn failed_metric_upgrade_keeps_the_projective_reconstruction() {
    let n_views = 6;
    let data = n_view_dataset(n_views, 80, &NViewDataSetConfig::default());
    let matches = generate_matches(&data, 0, 1);
    let order = (0..n_views).collect::<Vec<usize>>();

    let reconstruction = reconstruct_component(&matches, &order, None, &ReconstructionParameters::default()).expect("reconstruction");

    assert_eq!(reconstruction.camera_count(), n_views);
    assert!(reconstruction.cameras().values().all(|c| matches!(c, Camera::Projective(_))));
    assert!(reprojection_rms(&matches, &reconstruction) < 1e-3);
}

#[test]
fn a_single_image_is_not_a_component() {
    let data = n_view_dataset(2, 20, &NViewDataSetConfig::default());
    let matches = generate_matches(&data, 0, 1);
    assert!(reconstruct_component(&matches, &[0], None, &ReconstructionParameters::default()).is_err());
}
