extern crate nalgebra as na;

use na::{DMatrix, Matrix3x4, Vector2, Vector4};
use crate::Float;
use crate::image::features::{Feature, matches::{Matches, ImageId}};
use crate::numerics::smallest_right_singular_vector;
use crate::sensors::camera::Camera;
use crate::sfm::{landmark::{Structure, euclidean_landmark::PointStructure}, reconstruction::Reconstruction, runtime_parameters::ReconstructionParameters};

/**
 * Linear triangulation up to scale from two or more views.
 * Each observation contributes the rows u*p3 - p1 and v*p3 - p2, normalised to unit length.
 * See Triangulation by Hartley et al.
 */
#[allow(non_snake_case)]
pub fn linear_triangulation_svd(observations: &[(Vector2<Float>, Matrix3x4<Float>)]) -> Option<Vector4<Float>> {
    if observations.len() < 2 {
        return None;
    }
    let mut A = DMatrix::<Float>::zeros(2*observations.len(), 4);
    for (j, (point, projection)) in observations.iter().enumerate() {
        let p_1 = projection.row(0);
        let p_2 = projection.row(1);
        let p_3 = projection.row(2);
        let row_u = point.x*p_3 - p_1;
        let row_v = point.y*p_3 - p_2;
        for (offset, row) in [row_u, row_v].iter().enumerate() {
            let norm = row.norm();
            if norm > 0.0 {
                A.row_mut(2*j + offset).copy_from(&(row/norm));
            }
        }
    }

    let x = smallest_right_singular_vector(&A)?;
    let mut point = Vector4::<Float>::new(x[0], x[1], x[2], x[3]);
    if point[3] < 0.0 {
        point = -point;
    }
    Some(point)
}

/**
 * Triangulates every track seen in `image` that has no structure yet and is observed by at least `min_views` cameras.
 * Tracks that cannot be triangulated now are left for later calls. Returns the number of inserted points.
 */
pub fn point_structure_triangulation(
    matches: &Matches,
    image: ImageId,
    min_views: usize,
    parameters: &ReconstructionParameters,
    reconstruction: &mut Reconstruction) -> usize {
    let min_views = min_views.max(2);
    let max_error = parameters.triangulation.max_reprojection_error;
    let mut inserted = 0;
    let mut rejected = 0;

    for track in matches.tracks_in_image(image) {
        if reconstruction.has_structure(track) {
            continue;
        }

        let observing = matches.images_observing(track).into_iter()
            .filter_map(|other| {
                let camera = reconstruction.camera(other)?;
                let feature = matches.get(other, track)?;
                Some((feature.get_as_2d_point(), camera))
            })
            .collect::<Vec<(Vector2<Float>, &Camera)>>();

        if observing.len() < min_views {
            continue;
        }

        let projections = observing.iter().map(|(x, camera)| (*x, camera.projection_matrix())).collect::<Vec<_>>();
        let point = match linear_triangulation_svd(&projections) {
            Some(p) if p[3].abs() > Float::EPSILON*p.norm() => p/p[3],
            _ => {
                rejected += 1;
                continue;
            }
        };

        let admissible = observing.iter().all(|(x, camera)| {
            let in_front = match camera {
                Camera::Pinhole(_) => camera.depth(&point) > 0.0,
                Camera::Projective(_) => true
            };
            let consistent = match (max_error, camera.project(&point)) {
                (None, _) => true,
                (Some(threshold), Some(projected)) => (projected - x).norm() <= threshold,
                (Some(_), None) => false
            };
            in_front && consistent
        });

        if admissible {
            reconstruction.insert_structure(track, Structure::Point(PointStructure::new(point)));
            inserted += 1;
        } else {
            rejected += 1;
        }
    }

    log::debug!("triangulation of image {}: {} points inserted, {} rejected", image, inserted, rejected);
    inserted
}
