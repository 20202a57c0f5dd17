//! Bounded recency-ordered sighting memories.
//!
//! Agents remember where they last saw enemies and teammates. The log is a
//! fixed-capacity ring: re-sighting an entity updates its entry in place,
//! inserting past capacity evicts the oldest entry, and stale entries are
//! purged lazily against the decay window on access — never via callbacks.

use arrayvec::ArrayVec;

use super::types::{EntityRef, GameTime, Vec3};

/// One remembered sighting of another entity.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sighting {
    pub entity: EntityRef,
    pub position: Vec3,
    pub seen_at: GameTime,
}

/// Fixed-capacity sighting log, newest-wins per entity.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SightingLog<const N: usize> {
    entries: ArrayVec<Sighting, N>,
}

impl<const N: usize> SightingLog<N> {
    pub fn new() -> Self {
        Self {
            entries: ArrayVec::new(),
        }
    }

    /// Records or refreshes a sighting. On overflow the oldest entry is
    /// evicted; the log never exceeds its capacity.
    pub fn note(&mut self, entity: EntityRef, position: Vec3, now: GameTime) {
        if let Some(existing) = self.entries.iter_mut().find(|s| s.entity == entity) {
            existing.position = position;
            existing.seen_at = now;
            return;
        }

        if self.entries.is_full() {
            if let Some(oldest) = self
                .entries
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.seen_at.0.total_cmp(&b.seen_at.0))
                .map(|(i, _)| i)
            {
                self.entries.remove(oldest);
            }
        }

        self.entries.push(Sighting {
            entity,
            position,
            seen_at: now,
        });
    }

    /// Drops every entry older than `decay` seconds.
    pub fn purge_expired(&mut self, now: GameTime, decay: f32) {
        self.entries.retain(|s| now.since(s.seen_at) <= decay);
    }

    pub fn recall(&self, entity: EntityRef) -> Option<&Sighting> {
        self.entries.iter().find(|s| s.entity == entity)
    }

    /// Entry with the freshest timestamp.
    pub fn most_recent(&self) -> Option<&Sighting> {
        self.entries
            .iter()
            .max_by(|a, b| a.seen_at.0.total_cmp(&b.seen_at.0))
    }

    pub fn forget(&mut self, entity: EntityRef) {
        self.entries.retain(|s| s.entity != entity);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sighting> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(index: u32) -> EntityRef {
        EntityRef { index, serial: 1 }
    }

    #[test]
    fn insertion_past_capacity_evicts_oldest() {
        let mut log: SightingLog<4> = SightingLog::new();
        for i in 0..4 {
            log.note(entity(i), Vec3::ZERO, GameTime::new(i as f32));
        }
        assert_eq!(log.len(), 4);

        log.note(entity(99), Vec3::ZERO, GameTime::new(10.0));
        assert_eq!(log.len(), 4);
        assert!(log.recall(entity(0)).is_none(), "oldest entry evicted");
        assert!(log.recall(entity(99)).is_some());
    }

    #[test]
    fn resighting_updates_in_place() {
        let mut log: SightingLog<4> = SightingLog::new();
        log.note(entity(1), Vec3::ZERO, GameTime::new(1.0));
        log.note(entity(1), Vec3::new(5.0, 0.0, 0.0), GameTime::new(2.0));

        assert_eq!(log.len(), 1);
        let s = log.recall(entity(1)).unwrap();
        assert_eq!(s.position, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(s.seen_at, GameTime::new(2.0));
    }

    #[test]
    fn purge_drops_only_expired_entries() {
        let mut log: SightingLog<4> = SightingLog::new();
        log.note(entity(1), Vec3::ZERO, GameTime::new(0.0));
        log.note(entity(2), Vec3::ZERO, GameTime::new(8.0));

        log.purge_expired(GameTime::new(12.0), 10.0);
        assert!(log.recall(entity(1)).is_none());
        assert!(log.recall(entity(2)).is_some());
    }

    #[test]
    fn most_recent_tracks_freshest_timestamp() {
        let mut log: SightingLog<4> = SightingLog::new();
        log.note(entity(1), Vec3::ZERO, GameTime::new(3.0));
        log.note(entity(2), Vec3::ZERO, GameTime::new(7.0));
        assert_eq!(log.most_recent().unwrap().entity, entity(2));
    }
}
