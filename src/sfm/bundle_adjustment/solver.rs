extern crate nalgebra as na;

use na::{DMatrix, DVector, Matrix3, Vector3};
use crate::Float;
use crate::numerics::{max_norm, least_squares::accepted_damping};
use crate::sfm::bundle_adjustment::state::{State, LANDMARK_PARAM_SIZE};
use crate::sfm::runtime_parameters::BundleAdjustmentParameters;

/**
 * Normal equations in arrowhead form. U holds the camera blocks, V the 3x3 point blocks
 * and W the camera-point coupling, stored per point as (camera offset, block).
 */
#[allow(non_snake_case)]
struct ArrowHead {
    U: DMatrix<Float>,
    V: Vec<Matrix3<Float>>,
    W: Vec<Vec<(usize, DMatrix<Float>)>>,
    g_cameras: DVector<Float>,
    g_points: Vec<Vector3<Float>>,
    diag_max: Float
}

#[allow(non_snake_case)]
fn compute_arrow_head(state: &State) -> Option<ArrowHead> {
    let n_c = state.n_camera_params;
    let n_p = state.points.len();
    let mut U = DMatrix::<Float>::zeros(n_c, n_c);
    let mut V = vec![Matrix3::<Float>::zeros(); n_p];
    let mut W = vec![Vec::<(usize, DMatrix<Float>)>::new(); n_p];
    let mut g_cameras = DVector::<Float>::zeros(n_c);
    let mut g_points = vec![Vector3::<Float>::zeros(); n_p];

    for observation in state.observations.iter() {
        let linearized = state.linearize(observation)?;
        let J_p = &linearized.point_jacobian;
        let r = &linearized.residual;
        V[observation.point] += J_p.transpose()*J_p;
        g_points[observation.point] += J_p.transpose()*r;

        if let Some(offset) = state.cameras[observation.camera].offset {
            let J_c = &linearized.camera_jacobian;
            let k = J_c.ncols();
            let mut U_block = U.view_mut((offset, offset), (k, k));
            U_block += J_c.transpose()*J_c;
            let mut g_block = g_cameras.rows_mut(offset, k);
            g_block += J_c.transpose()*r;
            let J_p_dyn = DMatrix::<Float>::from_column_slice(2, LANDMARK_PARAM_SIZE, J_p.as_slice());
            W[observation.point].push((offset, J_c.transpose()*J_p_dyn));
        }
    }

    let diag_max = V.iter().map(|v| v.diagonal().max())
        .chain(U.diagonal().iter().copied())
        .fold(0.0, Float::max);
    Some(ArrowHead { U, V, W, g_cameras, g_points, diag_max })
}

/**
 * Damped step of the full problem obtained by eliminating the points through the Schur complement.
 * Returns the step in [cameras, points] order, the gradient, the denominator of the gain ratio and the damping used.
 */
#[allow(non_snake_case)]
pub fn gauss_newton_step_with_schur(state: &State, mu: Option<Float>, tau: Float) -> Option<(DVector<Float>, DVector<Float>, Float, Float)> {
    let arrow_head = compute_arrow_head(state)?;
    let n_c = state.n_camera_params;
    let n_p = state.points.len();
    let mu_val = match mu {
        None => tau*arrow_head.diag_max,
        Some(v) => v
    };

    let V_star_inv = arrow_head.V.iter()
        .map(|v| (v + Matrix3::<Float>::identity()*mu_val).try_inverse())
        .collect::<Option<Vec<Matrix3<Float>>>>()?;

    let mut schur_complement = arrow_head.U.clone() + DMatrix::<Float>::identity(n_c, n_c)*mu_val;
    let mut res_a_augment = -(&arrow_head.g_cameras);
    for p in 0..n_p {
        let V_inv = DMatrix::<Float>::from_column_slice(3, 3, V_star_inv[p].as_slice());
        let g_p = DVector::<Float>::from_column_slice(arrow_head.g_points[p].as_slice());
        for (offset_a, W_a) in arrow_head.W[p].iter() {
            let W_a_V_inv = W_a*&V_inv;
            let mut res_block = res_a_augment.rows_mut(*offset_a, W_a.nrows());
            res_block += &W_a_V_inv*&g_p;
            for (offset_b, W_b) in arrow_head.W[p].iter() {
                let mut block = schur_complement.view_mut((*offset_a, *offset_b), (W_a.nrows(), W_b.nrows()));
                block -= &W_a_V_inv*W_b.transpose();
            }
        }
    }

    let h_a = match n_c {
        0 => DVector::<Float>::zeros(0),
        _ => schur_complement.cholesky()?.solve(&res_a_augment)
    };

    let mut h = DVector::<Float>::zeros(state.n_params());
    let mut g = DVector::<Float>::zeros(state.n_params());
    h.rows_mut(0, n_c).copy_from(&h_a);
    g.rows_mut(0, n_c).copy_from(&arrow_head.g_cameras);
    for p in 0..n_p {
        let mut res_b = -arrow_head.g_points[p];
        for (offset, W_a) in arrow_head.W[p].iter() {
            let coupling = W_a.transpose()*h_a.rows(*offset, W_a.nrows());
            res_b -= Vector3::<Float>::new(coupling[0], coupling[1], coupling[2]);
        }
        let row = n_c + LANDMARK_PARAM_SIZE*p;
        h.fixed_rows_mut::<LANDMARK_PARAM_SIZE>(row).copy_from(&(V_star_inv[p]*res_b));
        g.fixed_rows_mut::<LANDMARK_PARAM_SIZE>(row).copy_from(&arrow_head.g_points[p]);
    }

    let gain_ratio_denom = 0.5*h.dot(&(mu_val*(&h) - (&g)));
    Some((h, g, gain_ratio_denom, mu_val))
}

pub struct OptimizationSummary {
    pub state: State,
    pub iterations: usize,
    pub converged: bool
}

fn cost_of(state: &State) -> Option<Float> {
    state.residuals().map(|r| 0.5*r.norm_squared())
}

/**
 * Levenberg-Marquardt on the reprojection error of every observation in the state.
 * Returns None if the initial state cannot be evaluated.
 */
pub fn optimize(initial_state: State, parameters: &BundleAdjustmentParameters) -> Option<OptimizationSummary> {
    let mut state = initial_state;
    let mut cost = cost_of(&state)?;
    let mut mu: Option<Float> = None;
    let mut nu: Float = 2.0;
    let mut converged = false;
    let mut iteration_count = 0;

    while iteration_count < parameters.max_iterations {
        iteration_count += 1;
        let (h, g, gain_ratio_denom, mu_val) = match gauss_newton_step_with_schur(&state, mu, parameters.tau) {
            Some(v) => v,
            None => break
        };
        if max_norm(&g) <= parameters.eps_gradient || h.norm() <= parameters.eps_step*(state.parameter_norm() + parameters.eps_step) {
            converged = true;
            break;
        }
        if gain_ratio_denom <= parameters.eps_cost*cost {
            converged = true;
            break;
        }

        let new_state = state.perturbed(&h);
        let new_cost = cost_of(&new_state).unwrap_or(Float::INFINITY);
        let gain_ratio = (cost - new_cost)/gain_ratio_denom;
        log::debug!("it: {}, cost: {}, new cost: {}, mu: {}, gain: {}, nu: {}", iteration_count, cost, new_cost, mu_val, gain_ratio, nu);

        if gain_ratio > 0.0 {
            let relative_decrease = (cost - new_cost)/cost;
            state = new_state;
            cost = new_cost;
            mu = Some(accepted_damping(mu_val, gain_ratio));
            nu = 2.0;
            if relative_decrease < parameters.eps_cost {
                converged = true;
                break;
            }
        } else {
            mu = Some(nu*mu_val);
            nu *= 2.0;
        }

        if nu.is_infinite() || mu.map_or(false, |v| v.is_infinite()) {
            break;
        }
    }

    Some(OptimizationSummary { state, iterations: iteration_count, converged })
}
