extern crate nalgebra as na;

use na::Vector3;
use crate::Float;
use crate::image::features::matches::Matches;
use crate::numerics::rms;
use crate::sensors::camera::Camera;
use crate::sfm::{error::{ReconstructionError, Result}, reconstruction::Reconstruction, runtime_parameters::ReconstructionParameters};

pub mod solver;
pub mod state;

use state::State;

/**
 * Root mean square of the reprojection error over every observation of a reconstructed camera and a finite point.
 */
pub fn reprojection_rms(matches: &Matches, reconstruction: &Reconstruction) -> Float {
    state_rms(&State::from_reconstruction(matches, reconstruction))
}

fn state_rms(state: &State) -> Float {
    let squared_norms = state.observations.iter()
        .filter_map(|o| state.residual(o))
        .map(|r| r.norm_squared())
        .collect::<Vec<Float>>();
    rms(&squared_norms)
}

/**
 * Centre of the fixed camera and its mean distance to the other centres. Only defined when every camera is a pinhole camera.
 */
fn gauge_reference(state: &State) -> Option<(Vector3<Float>, Float)> {
    let centers = state.cameras.iter()
        .map(|b| match &b.camera {
            Camera::Pinhole(c) => Some(c.center()),
            Camera::Projective(_) => None
        })
        .collect::<Option<Vec<Vector3<Float>>>>()?;
    let (fixed, others) = centers.split_first()?;
    if others.is_empty() {
        return None;
    }
    let mean_distance = others.iter().map(|c| (c - fixed).norm()).sum::<Float>()/(others.len() as Float);
    Some((*fixed, mean_distance))
}

/**
 * Scales the scene about the fixed camera centre so that its mean distance to the other centres is `target`.
 * Reprojections are unchanged.
 */
fn rescale(state: &mut State, fixed_center: &Vector3<Float>, target: Float) -> () {
    let current = match gauge_reference(state) {
        Some((_, d)) if d > Float::EPSILON && target > Float::EPSILON => d,
        _ => return
    };
    let s = target/current;
    for block in state.cameras.iter_mut().filter(|b| b.offset.is_some()) {
        if let Camera::Pinhole(c) = &mut block.camera {
            let center = fixed_center + (c.center() - fixed_center)*s;
            c.set_center(&center);
        }
    }
    for (_, point) in state.points.iter_mut() {
        *point = fixed_center + (*point - fixed_center)*s;
    }
}

fn write_back(state: &State, reconstruction: &mut Reconstruction) -> () {
    for block in state.cameras.iter() {
        reconstruction.insert_camera(block.id, block.camera);
    }
    for (id, point) in state.points.iter() {
        if let Some(structure) = reconstruction.structure_mut(*id).and_then(|s| s.as_point_mut()) {
            structure.set_coords(point.push(1.0));
        }
    }
}

/**
 * Jointly refines every camera and point of the store on the reprojection error of `matches`.
 * The camera with the smallest id is held fixed. For metric reconstructions the scale is fixed
 * by keeping the mean distance from that camera to the others.
 * The refined estimate is written back even if the iteration cap is hit.
 */
pub fn bundle_adjust(matches: &Matches, parameters: &ReconstructionParameters, reconstruction: &mut Reconstruction) -> Result<Float> {
    let state = State::from_reconstruction(matches, reconstruction);
    if state.observations.is_empty() {
        return Err(ReconstructionError::InsufficientCorrespondences { required: 1, found: 0 });
    }
    let initial_rms = state_rms(&state);
    let reference = gauge_reference(&state);
    log::debug!("bundle adjustment of {} cameras, {} points, {} observations", state.cameras.len(), state.points.len(), state.observations.len());

    let summary = solver::optimize(state, &parameters.bundle_adjustment)
        .ok_or_else(|| ReconstructionError::DegenerateConfiguration("initial estimate has points without projection".to_string()))?;
    let mut state = summary.state;
    if let Some((fixed_center, mean_distance)) = reference {
        rescale(&mut state, &fixed_center, mean_distance);
    }
    write_back(&state, reconstruction);

    let final_rms = state_rms(&state);
    if !summary.converged {
        log::warn!("bundle adjustment stopped after {} iterations with rms {}", summary.iterations, final_rms);
        return Err(ReconstructionError::NonConvergence { iterations: summary.iterations, rms: final_rms });
    }
    log::info!("bundle adjustment: rms {} -> {} in {} iterations", initial_rms, final_rms, summary.iterations);
    Ok(final_rms)
}
