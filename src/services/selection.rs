//! Transient selection and deferred-move bookkeeping.
//!
//! Pure data structure: no I/O and no locking. The coordinator owns one
//! instance behind a mutex and runs every read-modify-write on it as a single
//! critical section.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::models::Transform;
use crate::ws::connctx::ConnectionId;

/// Outcome of releasing one holder's selection
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    /// The holder set became empty with this release
    pub last: bool,
    /// What this holder had buffered, if anything
    pub pending: Option<Transform>,
}

/// Most parked moves kept at once; the oldest is evicted beyond this
pub const MAX_PARKED_MOVES: usize = 1024;
/// How long a parked move waits for its object
pub const PARKED_MOVE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Parked {
    at: Instant,
    transform: Transform,
}

#[derive(Debug)]
pub struct SelectionTable {
    holders: HashMap<String, HashSet<ConnectionId>>,
    pending: HashMap<String, HashMap<ConnectionId, Transform>>,
    parked: HashMap<String, Parked>,
    max_parked: usize,
    parked_ttl: Duration,
}

impl Default for SelectionTable {
    fn default() -> Self {
        Self::with_limits(MAX_PARKED_MOVES, PARKED_MOVE_TTL)
    }
}

impl SelectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_parked: usize, parked_ttl: Duration) -> Self {
        Self {
            holders: HashMap::new(),
            pending: HashMap::new(),
            parked: HashMap::new(),
            max_parked: max_parked.max(1),
            parked_ttl,
        }
    }

    /// Whether anyone selects `uid`, or, with `holder`, whether that holder does
    pub fn is_selected(&self, uid: &str, holder: Option<ConnectionId>) -> bool {
        match (self.holders.get(uid), holder) {
            (None, _) => false,
            (Some(set), Some(holder)) => set.contains(&holder),
            (Some(set), None) => !set.is_empty(),
        }
    }

    pub fn select(&mut self, uid: &str, holder: ConnectionId) {
        self.holders.entry(uid.to_string()).or_default().insert(holder);
    }

    /// Merge a move into the holder's pending slot. Only holders that
    /// currently select the object get a slot; returns whether it was buffered.
    pub fn buffer_move(&mut self, uid: &str, holder: ConnectionId, transform: &Transform) -> bool {
        if !self.is_selected(uid, Some(holder)) {
            return false;
        }
        self.pending
            .entry(uid.to_string())
            .or_default()
            .entry(holder)
            .or_default()
            .merge(transform);
        true
    }

    /// Remove `holder` from the object's holder set together with its pending
    /// slot. `None` if the holder was not selecting the object.
    pub fn release(&mut self, uid: &str, holder: ConnectionId) -> Option<Release> {
        let set = self.holders.get_mut(uid)?;
        if !set.remove(&holder) {
            return None;
        }
        let last = set.is_empty();
        if last {
            self.holders.remove(uid);
        }

        let pending = match self.pending.get_mut(uid) {
            Some(slots) => {
                let pending = slots.remove(&holder);
                if slots.is_empty() {
                    self.pending.remove(uid);
                }
                pending
            }
            None => None,
        };
        Some(Release { last, pending })
    }

    /// Objects currently selected by `holder`
    pub fn held_by(&self, holder: ConnectionId) -> Vec<String> {
        let mut uids: Vec<String> = self
            .holders
            .iter()
            .filter(|(_, set)| set.contains(&holder))
            .map(|(uid, _)| uid.clone())
            .collect();
        uids.sort();
        uids
    }

    /// Keep a move that reached storage before its object existed.
    /// Expired entries are pruned first; a full table drops its oldest entry.
    pub fn park(&mut self, uid: &str, transform: Transform) {
        self.prune_parked();
        if !self.parked.contains_key(uid) && self.parked.len() >= self.max_parked {
            let oldest = self
                .parked
                .iter()
                .min_by_key(|(_, parked)| parked.at)
                .map(|(uid, _)| uid.clone());
            if let Some(oldest) = oldest {
                self.parked.remove(&oldest);
            }
        }
        self.parked.insert(
            uid.to_string(),
            Parked {
                at: Instant::now(),
                transform,
            },
        );
    }

    pub fn take_parked(&mut self, uid: &str) -> Option<Transform> {
        let parked = self.parked.remove(uid)?;
        if parked.at.elapsed() >= self.parked_ttl {
            return None;
        }
        Some(parked.transform)
    }

    fn prune_parked(&mut self) {
        let ttl = self.parked_ttl;
        self.parked.retain(|_, parked| parked.at.elapsed() < ttl);
    }

    /// Drop every trace of `uid`: holders, their buffered moves and any
    /// parked move. Used once the object is gone from storage.
    pub fn forget(&mut self, uid: &str) {
        self.holders.remove(uid);
        self.pending.remove(uid);
        self.parked.remove(uid);
    }

    pub fn selected_count(&self) -> usize {
        self.holders.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.values().map(HashMap::len).sum()
    }

    pub fn parked_count(&self) -> usize {
        self.parked.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ConnectionId = ConnectionId(1);
    const B: ConnectionId = ConnectionId(2);

    fn at(x: f64) -> Transform {
        Transform {
            position: Some([x, 0.0, 0.0]),
            ..Transform::default()
        }
    }

    #[test]
    fn select_is_idempotent_per_holder() {
        let mut table = SelectionTable::new();
        table.select("o1", A);
        table.select("o1", A);
        assert!(table.is_selected("o1", None));
        assert!(table.is_selected("o1", Some(A)));
        assert!(!table.is_selected("o1", Some(B)));

        assert!(table.release("o1", A).is_some());
        assert!(!table.is_selected("o1", None));
        assert_eq!(table.selected_count(), 0);
    }

    #[test]
    fn releasing_a_non_holder_changes_nothing() {
        let mut table = SelectionTable::new();
        assert_eq!(table.release("o1", A), None);

        table.select("o1", B);
        assert!(table.buffer_move("o1", B, &at(1.0)));
        assert_eq!(table.release("o1", A), None);
        assert!(table.is_selected("o1", Some(B)));
        assert_eq!(table.pending_count(), 1);
    }

    #[test]
    fn only_holders_get_a_pending_slot() {
        let mut table = SelectionTable::new();
        table.select("o1", A);
        assert!(!table.buffer_move("o1", B, &at(3.0)));
        assert_eq!(table.pending_count(), 0);
    }

    #[test]
    fn buffered_fields_merge_per_holder() {
        let mut table = SelectionTable::new();
        table.select("o1", A);
        table.buffer_move("o1", A, &at(1.0));
        table.buffer_move(
            "o1",
            A,
            &Transform {
                rotation: Some([0.0, 0.0, 0.0, 1.0]),
                ..Transform::default()
            },
        );
        let release = table.release("o1", A).unwrap();
        assert!(release.last);
        assert_eq!(
            release.pending,
            Some(Transform {
                position: Some([1.0, 0.0, 0.0]),
                scale: None,
                rotation: Some([0.0, 0.0, 0.0, 1.0]),
            })
        );
        assert_eq!(table.pending_count(), 0);
    }

    #[test]
    fn release_reports_whether_it_was_the_last_holder() {
        let mut table = SelectionTable::new();
        table.select("o1", A);
        table.select("o1", B);
        table.buffer_move("o1", A, &at(1.0));
        table.buffer_move("o1", B, &at(2.0));

        let first = table.release("o1", A).unwrap();
        assert!(!first.last);
        assert_eq!(first.pending, Some(at(1.0)));

        let second = table.release("o1", B).unwrap();
        assert!(second.last);
        assert_eq!(second.pending, Some(at(2.0)));
    }

    #[test]
    fn held_by_lists_only_that_holder() {
        let mut table = SelectionTable::new();
        table.select("o2", A);
        table.select("o1", A);
        table.select("o3", B);
        assert_eq!(table.held_by(A), vec!["o1".to_string(), "o2".to_string()]);
        assert_eq!(table.held_by(ConnectionId(9)), Vec::<String>::new());
    }

    #[test]
    fn parked_moves_are_taken_once() {
        let mut table = SelectionTable::new();
        table.park("ghost", at(4.0));
        assert_eq!(table.parked_count(), 1);
        assert_eq!(table.take_parked("ghost"), Some(at(4.0)));
        assert_eq!(table.take_parked("ghost"), None);
    }

    #[test]
    fn parked_table_is_bounded() {
        let mut table = SelectionTable::with_limits(2, Duration::from_secs(60));
        table.park("g1", at(1.0));
        std::thread::sleep(Duration::from_millis(2));
        table.park("g2", at(2.0));
        std::thread::sleep(Duration::from_millis(2));
        table.park("g3", at(3.0));

        assert_eq!(table.parked_count(), 2);
        assert_eq!(table.take_parked("g1"), None);
        assert_eq!(table.take_parked("g3"), Some(at(3.0)));

        // re-parking an existing uid does not evict anything
        table.park("g2", at(5.0));
        assert_eq!(table.parked_count(), 1);
        assert_eq!(table.take_parked("g2"), Some(at(5.0)));
    }

    #[test]
    fn expired_parked_moves_are_not_applied() {
        let mut table = SelectionTable::with_limits(8, Duration::ZERO);
        table.park("g1", at(1.0));
        assert_eq!(table.take_parked("g1"), None);

        table.park("g2", at(2.0));
        table.park("g3", at(3.0));
        assert_eq!(table.parked_count(), 1);
    }

    #[test]
    fn forget_clears_holders_pending_and_parked() {
        let mut table = SelectionTable::new();
        table.select("o1", A);
        table.select("o1", B);
        table.buffer_move("o1", A, &at(9.0));
        table.park("o1", at(4.0));

        table.forget("o1");
        assert!(!table.is_selected("o1", None));
        assert_eq!(table.pending_count(), 0);
        assert_eq!(table.parked_count(), 0);
        assert_eq!(table.release("o1", A), None);
        assert!(table.held_by(A).is_empty());
    }
}
