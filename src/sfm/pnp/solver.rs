extern crate nalgebra as na;

use na::{DMatrix, DVector, Vector2, Vector3};
use crate::Float;
use crate::numerics::{lie::left_jacobian_around_identity, least_squares::{gauss_newton_step, accepted_damping}};
use crate::sensors::camera::pinhole::PinholeCamera;
use crate::sfm::runtime_parameters::PoseRefinementParameters;

const CAMERA_PARAM_SIZE: usize = 6;

#[allow(non_snake_case)]
fn compute_residual(camera: &PinholeCamera, world: &[Vector3<Float>], image: &[Vector2<Float>], residuals: &mut DVector<Float>) -> bool {
    for (i, (X, x)) in world.iter().zip(image.iter()).enumerate() {
        let projected = match camera.project_from_camera_frame(&camera.transform_to_camera_frame(X)) {
            Some(p) => p,
            None => return false
        };
        residuals.fixed_rows_mut::<2>(2*i).copy_from(&(projected - x));
    }
    true
}

#[allow(non_snake_case)]
fn compute_jacobian(camera: &PinholeCamera, world: &[Vector3<Float>], jacobian: &mut DMatrix<Float>) -> bool {
    for (i, X) in world.iter().enumerate() {
        let transformed_point = camera.transform_to_camera_frame(X);
        let lie_jacobian = left_jacobian_around_identity(&transformed_point);
        let projection_jacobian = match camera.get_jacobian_with_respect_to_position_in_camera_frame(&transformed_point) {
            Some(j) => j,
            None => return false
        };
        jacobian.fixed_view_mut::<2,CAMERA_PARAM_SIZE>(2*i,0).copy_from(&(projection_jacobian*lie_jacobian));
    }
    true
}

fn perturb(camera: &PinholeCamera, h: &DVector<Float>) -> PinholeCamera {
    camera.left_perturbed(&Vector3::<Float>::new(h[0], h[1], h[2]), &Vector3::<Float>::new(h[3], h[4], h[5]))
}

/**
 * Levenberg-Marquardt refinement of a calibrated camera pose on the reprojection error of 2D-3D correspondences.
 * Perturbations are applied on the left, T <- exp(delta)*T.
 */
pub fn refine_pose(camera: &PinholeCamera, world: &[Vector3<Float>], image: &[Vector2<Float>], parameters: &PoseRefinementParameters) -> PinholeCamera {
    let n = world.len();
    let mut state = *camera;
    if n == 0 || image.len() != n {
        return state;
    }

    let mut residuals = DVector::<Float>::zeros(2*n);
    let mut new_residuals = DVector::<Float>::zeros(2*n);
    let mut jacobian = DMatrix::<Float>::zeros(2*n, CAMERA_PARAM_SIZE);
    if !compute_residual(&state, world, image, &mut residuals) || !compute_jacobian(&state, world, &mut jacobian) {
        return state;
    }

    let mut cost = 0.5*residuals.norm_squared();
    let mut mu: Option<Float> = None;
    let mut nu: Float = 2.0;

    for _ in 0..parameters.max_iterations {
        let (h, g, gain_ratio_denom, mu_val) = match gauss_newton_step(&residuals, &jacobian, mu, parameters.tau) {
            Some(v) => v,
            None => break
        };
        if g.amax() < 1e-12 || h.norm() < 1e-14 {
            break;
        }
        let candidate = perturb(&state, &h);
        let valid = compute_residual(&candidate, world, image, &mut new_residuals);
        let new_cost = 0.5*new_residuals.norm_squared();
        let gain_ratio = (cost - new_cost)/gain_ratio_denom;

        if valid && gain_ratio_denom > 0.0 && gain_ratio > 0.0 {
            state = candidate;
            cost = new_cost;
            residuals.copy_from(&new_residuals);
            if !compute_jacobian(&state, world, &mut jacobian) {
                break;
            }
            mu = Some(accepted_damping(mu_val, gain_ratio));
            nu = 2.0;
        } else {
            mu = Some(nu*mu_val);
            nu *= 2.0;
        }

        if nu.is_infinite() || mu.map_or(false, |v| v.is_infinite()) {
            break;
        }
    }

    state
}
