extern crate nalgebra as na;

use std::{cell::Cell, rc::Rc};
use na::{Matrix3, Vector3};
use vision_sfm::sensors::camera::{Camera, pinhole::PinholeCamera, projective::ProjectiveCamera};
use vision_sfm::sfm::landmark::{Structure, euclidean_landmark::PointStructure};
use vision_sfm::sfm::reconstruction::{CameraId, Reconstruction, StructureId};

struct DropCounter {
    drops: Rc<Cell<usize>>
}

impl DropCounter {
    fn new(drops: &Rc<Cell<usize>>) -> DropCounter {
        DropCounter { drops: drops.clone() }
    }
}

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

#[test]
fn has_and_get_agree() {
    let mut reconstruction = Reconstruction::<Camera, Structure>::new();
    assert!(!reconstruction.has_camera(CameraId(0)));
    assert!(reconstruction.camera(CameraId(0)).is_none());

    reconstruction.insert_camera(0usize, Camera::Projective(ProjectiveCamera::canonical()));
    reconstruction.insert_structure(3usize, Structure::Point(PointStructure::from_euclidean(&Vector3::new(1.0, 2.0, 3.0))));

    assert!(reconstruction.has_camera(CameraId(0)));
    assert!(reconstruction.camera(0usize).is_some());
    assert!(!reconstruction.has_camera(1usize));
    assert!(reconstruction.has_structure(StructureId(3)));
    assert!(reconstruction.structure(3usize).is_some());
    assert!(!reconstruction.has_structure(0usize));
    assert_eq!(reconstruction.camera_count(), 1);
    assert_eq!(reconstruction.structure_count(), 1);
}

#[test]
fn ids_are_independent_between_cameras_and_structures() {
    let mut reconstruction = Reconstruction::<Camera, Structure>::new();
    reconstruction.insert_camera(5usize, Camera::Pinhole(PinholeCamera::at_world_origin(Matrix3::identity())));
    reconstruction.insert_structure(5usize, Structure::Point(PointStructure::from_euclidean(&Vector3::zeros())));
    reconstruction.remove_camera(5usize);
    assert!(!reconstruction.has_camera(5usize));
    assert!(reconstruction.has_structure(5usize));
}

#[test]
fn insert_replaces_and_returns_previous() {
    let mut reconstruction = Reconstruction::<Camera, Structure>::new();
    let first = Camera::Projective(ProjectiveCamera::canonical());
    let second = Camera::Pinhole(PinholeCamera::at_world_origin(Matrix3::identity()*2.0));

    assert!(reconstruction.insert_camera(2usize, first).is_none());
    let previous = reconstruction.insert_camera(2usize, second);

    assert_eq!(previous, Some(first));
    assert_eq!(reconstruction.camera(2usize), Some(&second));
    assert_eq!(reconstruction.camera_count(), 1);
}

#[test]
fn clear_affects_only_its_own_map() {
    let mut reconstruction = Reconstruction::<Camera, Structure>::new();
    for i in 0..3usize {
        reconstruction.insert_camera(i, Camera::Projective(ProjectiveCamera::canonical()));
        reconstruction.insert_structure(i, Structure::Point(PointStructure::from_euclidean(&Vector3::new(i as f64, 0.0, 1.0))));
    }

    reconstruction.clear_cameras();
    assert_eq!(reconstruction.camera_count(), 0);
    assert_eq!(reconstruction.structure_count(), 3);
    assert!(!reconstruction.has_camera(0usize));

    reconstruction.clear_structures();
    assert_eq!(reconstruction.structure_count(), 0);
    assert!(reconstruction.structure(1usize).is_none());
}

#[test]
fn every_owned_entity_is_released_exactly_once() {
    let drops = Rc::new(Cell::new(0));
    {
        let mut reconstruction = Reconstruction::<DropCounter, DropCounter>::new();
        reconstruction.insert_camera(0usize, DropCounter::new(&drops));
        reconstruction.insert_camera(1usize, DropCounter::new(&drops));
        reconstruction.insert_structure(0usize, DropCounter::new(&drops));

        let replaced = reconstruction.insert_camera(1usize, DropCounter::new(&drops));
        assert!(replaced.is_some());
        drop(replaced);
        assert_eq!(drops.get(), 1);

        reconstruction.clear_structures();
        assert_eq!(drops.get(), 2);
        assert_eq!(reconstruction.camera_count(), 2);
    }
    assert_eq!(drops.get(), 4);
}

#[test]
fn ids_are_not_checked_against_the_store_matches() {
    let mut reconstruction = Reconstruction::<Camera, Structure>::new();
    reconstruction.insert_camera(7usize, Camera::Projective(ProjectiveCamera::canonical()));
    reconstruction.insert_structure(11usize, Structure::Point(PointStructure::from_euclidean(&Vector3::new(0.0, 0.0, 1.0))));

    assert!(reconstruction.matches().is_empty());
    assert!(reconstruction.has_camera(7usize));
    assert!(reconstruction.has_structure(11usize));
}
