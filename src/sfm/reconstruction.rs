use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use crate::image::features::matches::{Matches, ImageId, TrackId};
use crate::sensors::camera::Camera;
use crate::sfm::landmark::Structure;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CameraId(pub usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StructureId(pub usize);

impl From<ImageId> for CameraId {
    fn from(image: ImageId) -> CameraId {
        CameraId(image)
    }
}

impl From<CameraId> for ImageId {
    fn from(camera: CameraId) -> ImageId {
        camera.0
    }
}

impl From<TrackId> for StructureId {
    fn from(track: TrackId) -> StructureId {
        StructureId(track)
    }
}

impl From<StructureId> for TrackId {
    fn from(structure: StructureId) -> TrackId {
        structure.0
    }
}

impl CameraId {
    pub fn image(&self) -> ImageId {
        self.0
    }
}

impl StructureId {
    pub fn track(&self) -> TrackId {
        self.0
    }
}

/**
 * Owns every camera and structure of a reconstruction together with the inlier matches that support them.
 * Inserting under an existing id hands the previous value back to the caller.
 * Dropping the reconstruction drops everything it owns.
 * Ids are not checked against any match table; callers insert only ids of images and tracks they have correspondences for.
 */
#[derive(Debug, Clone)]
pub struct Reconstruction<C = Camera, S = Structure> {
    cameras: BTreeMap<CameraId, C>,
    structures: BTreeMap<StructureId, S>,
    matches: Matches
}

impl<C, S> Default for Reconstruction<C, S> {
    fn default() -> Reconstruction<C, S> {
        Reconstruction { cameras: BTreeMap::new(), structures: BTreeMap::new(), matches: Matches::new() }
    }
}

impl<C, S> Reconstruction<C, S> {
    pub fn new() -> Reconstruction<C, S> {
        Reconstruction::default()
    }

    pub fn insert_camera<I: Into<CameraId>>(&mut self, id: I, camera: C) -> Option<C> {
        self.cameras.insert(id.into(), camera)
    }

    pub fn insert_structure<I: Into<StructureId>>(&mut self, id: I, structure: S) -> Option<S> {
        self.structures.insert(id.into(), structure)
    }

    pub fn remove_camera<I: Into<CameraId>>(&mut self, id: I) -> Option<C> {
        self.cameras.remove(&id.into())
    }

    pub fn remove_structure<I: Into<StructureId>>(&mut self, id: I) -> Option<S> {
        self.structures.remove(&id.into())
    }

    pub fn has_camera<I: Into<CameraId>>(&self, id: I) -> bool {
        self.cameras.contains_key(&id.into())
    }

    pub fn has_structure<I: Into<StructureId>>(&self, id: I) -> bool {
        self.structures.contains_key(&id.into())
    }

    pub fn camera<I: Into<CameraId>>(&self, id: I) -> Option<&C> {
        self.cameras.get(&id.into())
    }

    pub fn camera_mut<I: Into<CameraId>>(&mut self, id: I) -> Option<&mut C> {
        self.cameras.get_mut(&id.into())
    }

    pub fn structure<I: Into<StructureId>>(&self, id: I) -> Option<&S> {
        self.structures.get(&id.into())
    }

    pub fn structure_mut<I: Into<StructureId>>(&mut self, id: I) -> Option<&mut S> {
        self.structures.get_mut(&id.into())
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    pub fn structure_count(&self) -> usize {
        self.structures.len()
    }

    pub fn clear_cameras(&mut self) -> () {
        self.cameras.clear();
    }

    pub fn clear_structures(&mut self) -> () {
        self.structures.clear();
    }

    pub fn cameras(&self) -> &BTreeMap<CameraId, C> {
        &self.cameras
    }

    pub fn cameras_mut(&mut self) -> impl Iterator<Item = (&CameraId, &mut C)> + '_ {
        self.cameras.iter_mut()
    }

    pub fn structures(&self) -> &BTreeMap<StructureId, S> {
        &self.structures
    }

    pub fn structures_mut(&mut self) -> impl Iterator<Item = (&StructureId, &mut S)> + '_ {
        self.structures.iter_mut()
    }

    pub fn matches(&self) -> &Matches {
        &self.matches
    }

    pub fn matches_mut(&mut self) -> &mut Matches {
        &mut self.matches
    }
}
