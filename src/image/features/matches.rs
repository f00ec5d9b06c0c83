use std::collections::{BTreeMap, BTreeSet};
use serde::{Serialize, Deserialize};
use crate::image::features::PointFeature;

pub type ImageId = usize;
pub type TrackId = usize;

/**
 * Sparse table of observations keyed by (image, track).
 * A track is one physical scene point; its observations in different images share the track id.
 * Ordering of all queries is by ascending id.
 */
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Matches {
    features: BTreeMap<ImageId, BTreeMap<TrackId, PointFeature>>,
    images_of_track: BTreeMap<TrackId, BTreeSet<ImageId>>
}

impl Matches {
    pub fn new() -> Matches {
        Matches::default()
    }

    /**
     * Inserts an observation and returns the one it replaces, if any.
     */
    pub fn insert(&mut self, image: ImageId, track: TrackId, feature: PointFeature) -> Option<PointFeature> {
        self.images_of_track.entry(track).or_default().insert(image);
        self.features.entry(image).or_default().insert(track, feature)
    }

    pub fn remove(&mut self, image: ImageId, track: TrackId) -> Option<PointFeature> {
        let removed = self.features.get_mut(&image).and_then(|tracks| tracks.remove(&track));
        if removed.is_some() {
            if self.features.get(&image).map_or(false, |tracks| tracks.is_empty()) {
                self.features.remove(&image);
            }
            if let Some(images) = self.images_of_track.get_mut(&track) {
                images.remove(&image);
                if images.is_empty() {
                    self.images_of_track.remove(&track);
                }
            }
        }
        removed
    }

    pub fn get(&self, image: ImageId, track: TrackId) -> Option<&PointFeature> {
        self.features.get(&image).and_then(|tracks| tracks.get(&track))
    }

    pub fn contains(&self, image: ImageId, track: TrackId) -> bool {
        self.get(image, track).is_some()
    }

    pub fn len(&self) -> usize {
        self.features.values().map(|tracks| tracks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn images(&self) -> Vec<ImageId> {
        self.features.keys().copied().collect()
    }

    pub fn tracks(&self) -> Vec<TrackId> {
        self.images_of_track.keys().copied().collect()
    }

    pub fn tracks_in_image(&self, image: ImageId) -> Vec<TrackId> {
        self.features.get(&image).map_or_else(Vec::new, |tracks| tracks.keys().copied().collect())
    }

    pub fn features_in_image(&self, image: ImageId) -> impl Iterator<Item = (TrackId, &PointFeature)> + '_ {
        self.features.get(&image).into_iter().flat_map(|tracks| tracks.iter().map(|(t, f)| (*t, f)))
    }

    pub fn images_observing(&self, track: TrackId) -> Vec<ImageId> {
        self.images_of_track.get(&track).map_or_else(Vec::new, |images| images.iter().copied().collect())
    }

    /**
     * Tracks observed in every one of the given images.
     */
    pub fn common_tracks(&self, images: &[ImageId]) -> Vec<TrackId> {
        let (first, rest) = match images.split_first() {
            Some(v) => v,
            None => return Vec::new()
        };
        match self.features.get(first) {
            None => Vec::new(),
            Some(tracks) => tracks.keys()
                .filter(|track| rest.iter().all(|image| self.contains(*image, **track)))
                .copied()
                .collect()
        }
    }

    /**
     * Copy of this table without the given observations of one image.
     */
    pub fn without_observations(&self, image: ImageId, tracks: &[TrackId]) -> Matches {
        let mut filtered = self.clone();
        for track in tracks {
            filtered.remove(image, *track);
        }
        filtered
    }
}
