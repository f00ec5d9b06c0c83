use rand::{rngs::SmallRng, SeedableRng, seq::index};
use serde::{Serialize, Deserialize};
use crate::Float;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacParameters {
    pub max_iterations: usize,
    pub threshold: Float,
    pub confidence: Float,
    pub min_inliers: usize,
    pub seed: u64
}

impl Default for RansacParameters {
    fn default() -> RansacParameters {
        RansacParameters {
            max_iterations: 1000,
            threshold: 1.0,
            confidence: 0.999,
            min_inliers: 0,
            seed: 1_234_567
        }
    }
}

impl RansacParameters {
    pub fn with_threshold(threshold: Float) -> RansacParameters {
        RansacParameters { threshold, ..Default::default() }
    }
}

#[derive(Debug, Clone)]
pub struct RansacResult<M> {
    pub model: M,
    pub inliers: Vec<usize>,
    pub inlier_rms: Float,
    pub iterations: usize
}

/**
 * A model that can be hypothesised from a minimal sample.
 * Minimal solvers may produce several models per sample (e.g. seven point algorithm).
 */
pub trait Estimator {
    type Datum;
    type Model: Clone;

    const MIN_SAMPLES: usize;

    fn fit(&self, data: &[Self::Datum], sample: &[usize]) -> Vec<Self::Model>;

    fn residual(&self, model: &Self::Model, datum: &Self::Datum) -> Float;

    fn refit(&self, _data: &[Self::Datum], _inliers: &[usize]) -> Option<Self::Model> {
        None
    }
}

fn score<E: Estimator>(estimator: &E, model: &E::Model, data: &[E::Datum], threshold: Float) -> (Vec<usize>, Float) {
    let mut inliers = Vec::<usize>::with_capacity(data.len());
    let mut squared_sum = 0.0;
    for (i, datum) in data.iter().enumerate() {
        let r = estimator.residual(model, datum);
        if r.is_finite() && r <= threshold {
            inliers.push(i);
            squared_sum += r*r;
        }
    }
    let rms = match inliers.len() {
        0 => Float::INFINITY,
        n => (squared_sum/n as Float).sqrt()
    };
    (inliers, rms)
}

fn is_better(inliers: usize, rms: Float, best: &Option<(usize, Float)>) -> bool {
    match best {
        None => inliers > 0,
        Some((best_inliers, best_rms)) => inliers > *best_inliers || (inliers == *best_inliers && rms < *best_rms)
    }
}

fn required_iterations(confidence: Float, inlier_ratio: Float, min_samples: usize, max_iterations: usize) -> usize {
    if confidence <= 0.0 || inlier_ratio <= 0.0 {
        return max_iterations;
    }
    let denom = (1.0 - inlier_ratio.powi(min_samples as i32)).max(1e-12).ln();
    if denom >= 0.0 {
        return max_iterations;
    }
    let n = ((1.0 - confidence.min(1.0 - 1e-12)).ln()/denom).ceil();
    match n {
        n if n.is_finite() && n >= 0.0 => (n as usize).min(max_iterations),
        _ => max_iterations
    }
}

/**
 * Random Sample Consensus - Fischler & Bolles
 * Sampling is driven by a SmallRng seeded from the parameters so that repeated runs are identical.
 * After sampling the best model is refit on its inliers as long as the consensus does not shrink.
 */
pub fn ransac<E: Estimator>(estimator: &E, data: &[E::Datum], parameters: &RansacParameters) -> Option<RansacResult<E::Model>> {
    let n = data.len();
    if n < E::MIN_SAMPLES || E::MIN_SAMPLES == 0 {
        return None;
    }

    let mut rng = SmallRng::seed_from_u64(parameters.seed);
    let mut best: Option<(E::Model, Vec<usize>, Float)> = None;
    let mut best_score: Option<(usize, Float)> = None;
    let mut dynamic_max_iterations = match n == E::MIN_SAMPLES {
        true => 1,
        false => parameters.max_iterations.max(1)
    };

    let mut iterations = 0;
    while iterations < dynamic_max_iterations {
        iterations += 1;
        let sample = index::sample(&mut rng, n, E::MIN_SAMPLES).into_vec();
        for model in estimator.fit(data, &sample) {
            let (inliers, rms) = score(estimator, &model, data, parameters.threshold);
            if inliers.len() < parameters.min_inliers.max(E::MIN_SAMPLES) {
                continue;
            }
            if is_better(inliers.len(), rms, &best_score) {
                best_score = Some((inliers.len(), rms));
                let ratio = inliers.len() as Float / n as Float;
                dynamic_max_iterations = dynamic_max_iterations.min(
                    required_iterations(parameters.confidence, ratio, E::MIN_SAMPLES, parameters.max_iterations).max(iterations));
                best = Some((model, inliers, rms));
            }
        }
    }

    let (mut model, mut inliers, mut inlier_rms) = best?;
    for _ in 0..3 {
        let refit = match estimator.refit(data, &inliers) {
            Some(m) => m,
            None => break
        };
        let (refit_inliers, refit_rms) = score(estimator, &refit, data, parameters.threshold);
        if refit_inliers.len() < inliers.len() {
            break;
        }
        let unchanged = refit_inliers == inliers;
        model = refit;
        inliers = refit_inliers;
        inlier_rms = refit_rms;
        if unchanged {
            break;
        }
    }

    log::debug!("ransac: {} of {} inliers after {} iterations, rms {}", inliers.len(), n, iterations, inlier_rms);
    Some(RansacResult { model, inliers, inlier_rms, iterations })
}
