extern crate nalgebra as na;

use std::collections::BTreeMap;
use na::Matrix3;
use crate::Float;
use crate::image::features::matches::{Matches, ImageId};
use crate::sfm::{
    bundle_adjustment::bundle_adjust,
    epipolar::{reconstruct_from_two_calibrated_views, reconstruct_from_two_uncalibrated_views},
    error::{ReconstructionError, Result},
    metric_upgrade::upgrade_to_metric,
    pnp::{calibrated_camera_resection, uncalibrated_camera_resection},
    reconstruction::Reconstruction,
    runtime_parameters::ReconstructionParameters,
    triangulation::point_structure_triangulation
};

pub type Intrinsics = BTreeMap<ImageId, Matrix3<Float>>;

fn intrinsics_of(intrinsics: &Intrinsics, image: ImageId) -> Result<&Matrix3<Float>> {
    intrinsics.get(&image)
        .ok_or_else(|| ReconstructionError::DegenerateConfiguration(format!("no intrinsics for image {}", image)))
}

/**
 * Reconstructs one ordered component: the first two images initialise the scene, the remaining ones
 * are resected in order with new tracks triangulated after every camera. Images that cannot be resected are skipped.
 * With intrinsics the reconstruction is metric from the start, otherwise it is upgraded once all images are in.
 * A failed upgrade leaves the projective cameras in place.
 * Finishes with a bundle adjustment.
 */
pub fn reconstruct_component(
    matches: &Matches,
    order: &[ImageId],
    intrinsics: Option<&Intrinsics>,
    parameters: &ReconstructionParameters) -> Result<Reconstruction> {
    let (first, second) = match order {
        [first, second, ..] => (*first, *second),
        _ => return Err(ReconstructionError::DegenerateConfiguration(format!("a component needs two images, got {}", order.len())))
    };

    let mut reconstruction = Reconstruction::new();
    let mut inlier_matches = match intrinsics {
        Some(k) => reconstruct_from_two_calibrated_views(
            matches, first, second, intrinsics_of(k, first)?, intrinsics_of(k, second)?, parameters, &mut reconstruction)?,
        None => reconstruct_from_two_uncalibrated_views(matches, first, second, parameters, &mut reconstruction)?
    };
    point_structure_triangulation(&inlier_matches, second, 2, parameters, &mut reconstruction);

    for &image in order[2..].iter() {
        let resected = match intrinsics {
            Some(k) => intrinsics_of(k, image)
                .and_then(|camera_intrinsics| calibrated_camera_resection(&inlier_matches, image, camera_intrinsics, parameters, &mut reconstruction)),
            None => uncalibrated_camera_resection(&inlier_matches, image, parameters, &mut reconstruction)
        };
        match resected {
            Ok(updated) => {
                inlier_matches = updated;
                point_structure_triangulation(&inlier_matches, image, 2, parameters, &mut reconstruction);
            },
            Err(e) => log::warn!("image {} skipped: {}", image, e)
        }
    }

    if intrinsics.is_none() {
        if let Err(e) = upgrade_to_metric(&inlier_matches, parameters, &mut reconstruction) {
            log::warn!("metric upgrade failed, keeping the projective reconstruction: {}", e);
        }
    }

    match bundle_adjust(&inlier_matches, parameters, &mut reconstruction) {
        Ok(rms) => log::info!("component of {} images reconstructed with {} cameras, {} points, rms {}",
            order.len(), reconstruction.camera_count(), reconstruction.structure_count(), rms),
        Err(ReconstructionError::NonConvergence { iterations, rms }) =>
            log::warn!("bundle adjustment did not converge in {} iterations, keeping rms {}", iterations, rms),
        Err(e) => return Err(e)
    }
    Ok(reconstruction)
}
