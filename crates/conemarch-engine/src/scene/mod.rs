//! Scene content and its flat descriptor buffer.
//!
//! The [`Scene`] owns the primitive list; the [`SceneBuffer`] mirrors it in the
//! `[x, y, z, tag]` record layout the marcher consumes. Every mutation keeps
//! `buffer.len() == RECORD_STRIDE * primitive_count`.

mod buffer;
mod primitive;

pub use buffer::{SceneBuffer, RECORD_STRIDE};
pub use primitive::{Primitive, ShapeKind};

/// Stable handle to a primitive inside a [`Scene`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PrimitiveId(u64);

#[derive(Debug, Default)]
pub struct Scene {
    entries: Vec<(PrimitiveId, Primitive)>,
    buffer: SceneBuffer,
    next_id: u64,
}

impl Scene {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a primitive and rebuilds the buffer from scratch.
    pub fn add(&mut self, primitive: Primitive) -> PrimitiveId {
        let id = PrimitiveId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.push((id, primitive));
        self.rebuild();
        log::debug!(
            "scene: added {} #{} ({} primitives)",
            primitive.shape(),
            id.0,
            self.entries.len()
        );
        id
    }

    /// Removes a primitive and rebuilds the buffer. Unknown ids are ignored.
    pub fn remove(&mut self, id: PrimitiveId) -> Option<Primitive> {
        let index = self.entries.iter().position(|(eid, _)| *eid == id)?;
        let (_, removed) = self.entries.remove(index);
        self.rebuild();
        log::debug!("scene: removed #{} ({} primitives)", id.0, self.entries.len());
        Some(removed)
    }

    /// Advances primitive motion by `dt` seconds, then refreshes the buffer in place.
    pub fn update(&mut self, dt: f32) {
        for (_, p) in &mut self.entries {
            p.advance(dt);
        }
        self.recompute();
    }

    /// Re-encodes every record without reallocating.
    pub fn recompute(&mut self) {
        self.buffer.refresh(self.entries.iter().map(|(_, p)| p));
    }

    /// Moves a primitive. Takes effect in the buffer on the next `update`/`recompute`.
    pub fn set_position(&mut self, id: PrimitiveId, position: glam::Vec3) -> bool {
        match self.get_mut(id) {
            Some(p) => {
                p.position = position;
                true
            }
            None => false,
        }
    }

    fn get_mut(&mut self, id: PrimitiveId) -> Option<&mut Primitive> {
        self.entries
            .iter_mut()
            .find(|(eid, _)| *eid == id)
            .map(|(_, p)| p)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn buffer(&self) -> &SceneBuffer {
        &self.buffer
    }

    fn rebuild(&mut self) {
        let count = self.entries.len();
        self.buffer
            .rebuild(self.entries.iter().map(|(_, p)| p), count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn reference_scene() -> (Scene, [PrimitiveId; 3]) {
        let mut scene = Scene::new();
        let b = scene.add(Primitive::cube(Vec3::new(-3.0, 0.0, 0.0)));
        let s = scene.add(Primitive::sphere(Vec3::ZERO));
        let c = scene.add(Primitive::cone(Vec3::new(3.0, 0.0, 0.0)));
        (scene, [b, s, c])
    }

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn empty_scene_has_empty_buffer() {
        let scene = Scene::new();
        assert!(scene.buffer().is_empty());
        assert_eq!(scene.buffer().generation(), 0);
    }

    #[test]
    fn reference_scene_encodes_in_insertion_order() {
        let (scene, _) = reference_scene();
        assert_eq!(
            scene.buffer().as_slice(),
            &[-3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 3.0, 0.0, 0.0, 2.0]
        );
    }

    #[test]
    fn tags_do_not_depend_on_insertion_order() {
        let mut scene = Scene::new();
        scene.add(Primitive::cone(Vec3::ZERO));
        scene.add(Primitive::cube(Vec3::ZERO));
        scene.add(Primitive::sphere(Vec3::ZERO));
        let tags: Vec<u32> = scene.buffer().records().map(|(_, t)| t).collect();
        assert_eq!(tags, vec![2, 0, 1]);
    }

    // ── length invariant ──────────────────────────────────────────────────

    #[test]
    fn length_tracks_count_across_add_and_remove() {
        let mut scene = Scene::new();
        let mut ids = Vec::new();
        for i in 0..6 {
            let kind = ShapeKind::ALL[i % 3];
            ids.push(scene.add(Primitive::new(kind, Vec3::splat(i as f32))));
            assert_eq!(scene.buffer().len(), RECORD_STRIDE * scene.len());
        }
        for id in [ids[4], ids[0], ids[5]] {
            assert!(scene.remove(id).is_some());
            assert_eq!(scene.buffer().len(), RECORD_STRIDE * scene.len());
        }
        assert_eq!(scene.len(), 3);
        assert_eq!(scene.buffer().primitive_count(), 3);
    }

    #[test]
    fn removing_unknown_id_is_a_no_op() {
        let (mut scene, [b, ..]) = reference_scene();
        scene.remove(b);
        let generation = scene.buffer().generation();
        assert!(scene.remove(b).is_none());
        assert_eq!(scene.buffer().generation(), generation);
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let (mut scene, [_, s, _]) = reference_scene();
        scene.remove(s);
        assert_eq!(
            scene.buffer().as_slice(),
            &[-3.0, 0.0, 0.0, 0.0, 3.0, 0.0, 0.0, 2.0]
        );
    }

    // ── structural vs value change ────────────────────────────────────────

    #[test]
    fn add_and_remove_advance_generation() {
        let (mut scene, [b, ..]) = reference_scene();
        assert_eq!(scene.buffer().generation(), 3);
        scene.remove(b);
        assert_eq!(scene.buffer().generation(), 4);
    }

    #[test]
    fn update_refreshes_in_place() {
        let (mut scene, [_, s, _]) = reference_scene();
        let ptr = scene.buffer().as_slice().as_ptr();
        let generation = scene.buffer().generation();

        scene.set_position(s, Vec3::new(0.0, 2.0, 0.0));
        scene.update(1.0 / 60.0);

        assert_eq!(scene.buffer().as_slice().as_ptr(), ptr);
        assert_eq!(scene.buffer().generation(), generation);
        assert_eq!(&scene.buffer().as_slice()[4..8], &[0.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn recompute_is_idempotent() {
        let (mut scene, _) = reference_scene();
        scene.recompute();
        let first = scene.buffer().as_bytes().to_vec();
        scene.recompute();
        assert_eq!(scene.buffer().as_bytes(), first.as_slice());
    }

    #[test]
    fn update_moves_drifting_primitives() {
        let mut scene = Scene::new();
        scene.add(Primitive::sphere(Vec3::ZERO).with_velocity(Vec3::X));
        scene.update(0.25);
        assert_eq!(&scene.buffer().as_slice()[..4], &[0.25, 0.0, 0.0, 1.0]);
    }
}
