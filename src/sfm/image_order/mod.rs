use std::collections::{BTreeMap, BTreeSet, VecDeque};
use crate::Float;
use crate::image::features::{Feature, matches::{Matches, ImageId}};
use crate::numerics::{rms, ransac::{ransac, Estimator}};
use crate::sfm::{epipolar::tensor::fundamental::Correspondence, runtime_parameters::ReconstructionParameters};

pub mod homography;

use homography::HomographyEstimator;

pub type ImagePair = (ImageId, ImageId);

/**
 * Homography inliers times the transfer error of all common tracks.
 * A pair explained well by a homography (small baseline or planar scene) scores low.
 */
pub fn pair_score(matches: &Matches, image_one: ImageId, image_two: ImageId, parameters: &ReconstructionParameters) -> Option<Float> {
    let tracks = matches.common_tracks(&[image_one, image_two]);
    if tracks.len() < parameters.image_order.min_common_matches.max(HomographyEstimator::MIN_SAMPLES) {
        return None;
    }
    let correspondences = tracks.iter()
        .filter_map(|track| Some((matches.get(image_one, *track)?.get_as_2d_point(), matches.get(image_two, *track)?.get_as_2d_point())))
        .collect::<Vec<Correspondence>>();
    let result = ransac(&HomographyEstimator, &correspondences, &parameters.homography)?;
    let squared_errors = correspondences.iter()
        .map(|c| HomographyEstimator.residual(&result.model, c).powi(2))
        .filter(|e| e.is_finite())
        .collect::<Vec<Float>>();
    let score = (result.inliers.len() as Float)*rms(&squared_errors);
    log::debug!("image pair {}-{}: {} common tracks, {} homography inliers, score {}", image_one, image_two, tracks.len(), result.inliers.len(), score);
    Some(score)
}

/**
 * Scores of every image pair with a viable edge. A zero score still connects the pair and is ranked last.
 */
pub fn pair_scores(matches: &Matches, parameters: &ReconstructionParameters) -> BTreeMap<ImagePair, Float> {
    let images = matches.images();
    let mut scores = BTreeMap::<ImagePair, Float>::new();
    for (i, &image_one) in images.iter().enumerate() {
        for &image_two in images[i + 1..].iter() {
            if let Some(score) = pair_score(matches, image_one, image_two, parameters).filter(|s| s.is_finite()) {
                scores.insert((image_one, image_two), score);
            }
        }
    }
    scores
}

fn connected_components(images: &[ImageId], scores: &BTreeMap<ImagePair, Float>) -> Vec<BTreeSet<ImageId>> {
    let mut adjacency = BTreeMap::<ImageId, BTreeSet<ImageId>>::new();
    for (a, b) in scores.keys() {
        adjacency.entry(*a).or_default().insert(*b);
        adjacency.entry(*b).or_default().insert(*a);
    }

    let mut visited = BTreeSet::<ImageId>::new();
    let mut components = Vec::<BTreeSet<ImageId>>::new();
    for image in images {
        if visited.contains(image) || !adjacency.contains_key(image) {
            continue;
        }
        let mut component = BTreeSet::<ImageId>::new();
        let mut queue = VecDeque::<ImageId>::from([*image]);
        visited.insert(*image);
        while let Some(current) = queue.pop_front() {
            component.insert(current);
            for neighbour in adjacency.get(&current).into_iter().flatten() {
                if visited.insert(*neighbour) {
                    queue.push_back(*neighbour);
                }
            }
        }
        components.push(component);
    }
    components
}

fn score_of(scores: &BTreeMap<ImagePair, Float>, a: ImageId, b: ImageId) -> Float {
    scores.get(&(a.min(b), a.max(b))).copied().unwrap_or(0.0)
}

/**
 * Best pair first, then greedily the image with the highest summed score to the images already chosen.
 */
fn order_component(component: &BTreeSet<ImageId>, scores: &BTreeMap<ImagePair, Float>) -> (Vec<ImageId>, Float) {
    let best = scores.iter()
        .filter(|((a, b), _)| component.contains(a) && component.contains(b))
        .max_by(|(_, s_1), (_, s_2)| s_1.total_cmp(s_2));
    let ((first, second), best_score) = match best {
        Some((pair, score)) => (*pair, *score),
        None => return (component.iter().copied().collect(), 0.0)
    };

    let mut order = vec![first, second];
    let mut remaining = component.iter().copied().filter(|i| *i != first && *i != second).collect::<BTreeSet<ImageId>>();
    while !remaining.is_empty() {
        let next = remaining.iter()
            .map(|&candidate| (candidate, order.iter().map(|&chosen| score_of(scores, candidate, chosen)).sum::<Float>()))
            .max_by(|(_, s_1), (_, s_2)| s_1.total_cmp(s_2))
            .map(|(candidate, _)| candidate);
        match next {
            Some(image) => {
                remaining.remove(&image);
                order.push(image);
            },
            None => break
        }
    }
    (order, best_score)
}

/**
 * Orders the images of every connected component of the pair graph so that the first two
 * form the best initial pair. Components are sorted by their best pair score.
 * Images without any viable pair are reported and left out.
 */
pub fn select_efficient_image_order(matches: &Matches, parameters: &ReconstructionParameters) -> Vec<Vec<ImageId>> {
    let images = matches.images();
    let scores = pair_scores(matches, parameters);
    let components = connected_components(&images, &scores);

    for image in images.iter() {
        if !components.iter().any(|c| c.contains(image)) {
            log::warn!("image {} has no viable pair and is excluded", image);
        }
    }

    let mut ordered = components.iter().map(|c| order_component(c, &scores)).collect::<Vec<(Vec<ImageId>, Float)>>();
    ordered.sort_by(|(_, s_1), (_, s_2)| s_2.total_cmp(s_1));
    log::info!("{} connected components over {} images", ordered.len(), images.len());
    ordered.into_iter().map(|(order, _)| order).collect()
}
