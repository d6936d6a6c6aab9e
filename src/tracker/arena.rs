//! Slot storage for tracks.
//!
//! Deleting a track only flips its state; slots are reclaimed by [`TrackArena::sweep`]
//! once the frame is finished, so indices stay valid for a whole `step`.

use std::collections::HashMap;

use crate::tracker::track::{Track, TrackId};

#[derive(Debug, Clone, Default)]
pub struct TrackArena {
    slots: Vec<Option<Track>>,
    free: Vec<usize>,
    index: HashMap<TrackId, usize>,
}

impl TrackArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, track: Track) -> usize {
        let id = track.track_id;
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(track);
                slot
            }
            None => {
                self.slots.push(Some(track));
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot);
        slot
    }

    pub fn get(&self, slot: usize) -> Option<&Track> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Track> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    pub fn by_id(&self, id: TrackId) -> Option<&Track> {
        self.index.get(&id).and_then(|&slot| self.get(slot))
    }

    /// Occupied slot indices, ordered by ascending track id.
    pub fn slots_by_id(&self) -> Vec<usize> {
        let mut slots: Vec<(TrackId, usize)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, t)| t.as_ref().map(|t| (t.track_id, slot)))
            .collect();
        slots.sort_unstable();
        slots.into_iter().map(|(_, slot)| slot).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// Free every slot holding a deleted track and return their ids.
    pub fn sweep(&mut self) -> Vec<TrackId> {
        let mut removed = Vec::new();
        for (slot, entry) in self.slots.iter_mut().enumerate() {
            if entry.as_ref().is_some_and(Track::is_deleted) {
                if let Some(track) = entry.take() {
                    self.index.remove(&track.track_id);
                    removed.push(track.track_id);
                    self.free.push(slot);
                }
            }
        }
        removed.sort_unstable();
        removed
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::detection::Detection;
    use crate::tracker::kalman_filter::KalmanFilter;

    fn track(id: TrackId) -> Track {
        let kf = KalmanFilter::new();
        Track::new(id, &Detection::new(0.0, 0.0, 10.0, 20.0, 0.9), &kf, 0.0, 4)
    }

    #[test]
    fn test_deleted_slot_survives_until_sweep() {
        let mut arena = TrackArena::new();
        let a = arena.insert(track(1));
        let b = arena.insert(track(2));

        arena.get_mut(a).unwrap().mark_deleted();
        assert!(arena.get(a).is_some());
        assert_eq!(arena.len(), 2);

        assert_eq!(arena.sweep(), vec![1]);
        assert!(arena.get(a).is_none());
        assert!(arena.by_id(1).is_none());
        assert_eq!(arena.by_id(2).unwrap().track_id, 2);
        assert_eq!(arena.get(b).unwrap().track_id, 2);
    }

    #[test]
    fn test_freed_slot_is_reused_with_new_id() {
        let mut arena = TrackArena::new();
        let a = arena.insert(track(1));
        arena.insert(track(2));
        arena.get_mut(a).unwrap().mark_deleted();
        arena.sweep();

        let c = arena.insert(track(3));
        assert_eq!(c, a);
        assert_eq!(arena.slots_by_id(), vec![1, 0]);
    }
}
