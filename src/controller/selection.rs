//! Ranked candidate selection.
//!
//! One algorithm for every kind of tier: network uplinks and compute nodes are
//! both candidates with a rank and an availability bit.

use std::sync::Arc;

use crate::link::Link;

/// Something that can be chosen by rank (lower = preferred) and health.
pub trait RankedCandidate {
    fn rank(&self) -> u32;
    fn is_available(&self) -> bool;
}

impl RankedCandidate for Link {
    fn rank(&self) -> u32 {
        self.priority()
    }

    fn is_available(&self) -> bool {
        self.is_healthy()
    }
}

impl<T: RankedCandidate + ?Sized> RankedCandidate for Arc<T> {
    fn rank(&self) -> u32 {
        (**self).rank()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// Lowest-ranked available candidate.
pub fn best_available<T: RankedCandidate>(candidates: &[T]) -> Option<&T> {
    candidates
        .iter()
        .filter(|c| c.is_available())
        .min_by_key(|c| c.rank())
}

/// Lowest-ranked candidate regardless of health.
pub fn lowest_rank<T: RankedCandidate>(candidates: &[T]) -> Option<&T> {
    candidates.iter().min_by_key(|c| c.rank())
}

/// Outcome of a selection: the chosen candidate and whether it is a
/// last-resort pick (nothing was available).
#[derive(Debug)]
pub struct Selection<'a, T> {
    pub candidate: &'a T,
    pub degraded: bool,
}

/// Best available candidate, falling back to the lowest rank overall.
///
/// Returns `None` only for an empty slice.
pub fn select<T: RankedCandidate>(candidates: &[T]) -> Option<Selection<'_, T>> {
    if let Some(candidate) = best_available(candidates) {
        return Some(Selection {
            candidate,
            degraded: false,
        });
    }
    lowest_rank(candidates).map(|candidate| Selection {
        candidate,
        degraded: true,
    })
}

/// A strictly better-ranked available candidate than `current`, if any.
pub fn better_than<'a, T: RankedCandidate>(candidates: &'a [T], current: &T) -> Option<&'a T> {
    best_available(candidates).filter(|c| c.rank() < current.rank())
}
