use std::collections::BTreeSet;
use vision_sfm::image::features::{PointFeature, matches::{Matches, ImageId}};
use vision_sfm::sfm::image_order::{pair_scores, select_efficient_image_order};
use vision_sfm::sfm::runtime_parameters::ReconstructionParameters;
use vision_sfm::sfm::synthetic::{n_view_dataset, NViewDataSet, NViewDataSetConfig};

fn insert_dataset(matches: &mut Matches, data: &NViewDataSet, first_image: ImageId, first_track: usize) -> () {
    for (view, observations) in data.observations.iter().enumerate() {
        for (p, x) in observations.iter().enumerate() {
            matches.insert(first_image + view, first_track + p, PointFeature::from(*x));
        }
    }
}

#[test]
fn components_are_separated_and_start_with_their_best_pair() {
    let scene_a = n_view_dataset(5, 50, &NViewDataSetConfig::default());
    let scene_b = n_view_dataset(3, 40, &NViewDataSetConfig { seed: 7, ..Default::default() });
    let mut matches = Matches::new();
    insert_dataset(&mut matches, &scene_a, 0, 0);
    insert_dataset(&mut matches, &scene_b, 10, 1000);
    for p in 0..3 {
        matches.insert(20, p, PointFeature::from(scene_a.observations[0][p]));
    }

    let parameters = ReconstructionParameters::default();
    let components = select_efficient_image_order(&matches, &parameters);

    assert_eq!(components.len(), 2);
    let as_sets = components.iter().map(|c| c.iter().copied().collect::<BTreeSet<ImageId>>()).collect::<Vec<_>>();
    assert!(as_sets.contains(&(0..5).collect::<BTreeSet<ImageId>>()));
    assert!(as_sets.contains(&(10..13).collect::<BTreeSet<ImageId>>()));
    assert!(components.iter().all(|c| !c.contains(&20)));

    let scores = pair_scores(&matches, &parameters);
    for component in components.iter() {
        let key = (component[0].min(component[1]), component[0].max(component[1]));
        let best = scores.iter()
            .filter(|((a, b), _)| component.contains(a) && component.contains(b))
            .map(|(_, s)| *s)
            .fold(0.0, f64::max);
        assert_eq!(scores.get(&key), Some(&best));
    }
}

#[test]
fn no_viable_pairs_give_no_components() {
    let scene = n_view_dataset(2, 5, &NViewDataSetConfig::default());
    let mut matches = Matches::new();
    insert_dataset(&mut matches, &scene, 0, 0);

    assert!(select_efficient_image_order(&matches, &ReconstructionParameters::default()).is_empty());
}

#[test]
fn pairs_related_by_an_exact_homography_stay_connected() {
    let scene = n_view_dataset(2, 30, &NViewDataSetConfig::default());
    let mut matches = Matches::new();
    for (p, (a, b)) in scene.observations[0].iter().zip(scene.observations[1].iter()).enumerate() {
        matches.insert(0, p, PointFeature::from(*a));
        matches.insert(1, p, PointFeature::from(*a));
        matches.insert(2, p, PointFeature::from(*b));
    }

    let scores = pair_scores(&matches, &ReconstructionParameters::default());
    assert!(scores.contains_key(&(0, 1)));
    assert!(scores[&(0, 1)] < scores[&(0, 2)]);

    let components = select_efficient_image_order(&matches, &ReconstructionParameters::default());
    assert_eq!(components.len(), 1);
    assert_eq!(components[0].iter().copied().collect::<BTreeSet<ImageId>>(), BTreeSet::from([0, 1, 2]));
    assert!(components[0][..2].contains(&2));
}
