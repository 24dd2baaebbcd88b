//! Allocation of fresh trice IDs
//!
//! [`allocate`] never touches the occupancy it is given; the caller inserts
//! the returned ID once it is used, so calling it twice without inserting can
//! hand out the same ID again.

use crate::id::{IdRange, TriceId};
use crate::list::TriceIdList;
use rand::Rng;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Random draws before falling back to picking among the enumerated free IDs
const MAX_RANDOM_DRAWS: usize = 64;

/// How a free ID is searched for inside a range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMethod {
    /// Uniformly random free ID
    #[default]
    Random,
    /// Smallest free ID
    Upward,
    /// Biggest free ID
    Downward,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Random => "random",
            SearchMethod::Upward => "upward",
            SearchMethod::Downward => "downward",
        }
    }
}

impl FromStr for SearchMethod {
    type Err = AllocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(SearchMethod::Random),
            "upward" => Ok(SearchMethod::Upward),
            "downward" => Ok(SearchMethod::Downward),
            other => Err(AllocError::UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AllocError {
    #[error("no new ID possible: min={min}, max={max}, used={used}")]
    RangeExhausted {
        min: TriceId,
        max: TriceId,
        used: u64,
    },
    #[error("{0:?} is an unknown ID search method (expected random, upward or downward)")]
    UnknownMethod(String),
}

/// Set of IDs that are already taken
pub trait Occupancy {
    fn is_occupied(&self, id: TriceId) -> bool;

    /// How many taken IDs fall inside `range`
    fn occupied_in(&self, range: IdRange) -> u64;
}

impl Occupancy for BTreeSet<TriceId> {
    fn is_occupied(&self, id: TriceId) -> bool {
        self.contains(&id)
    }

    fn occupied_in(&self, range: IdRange) -> u64 {
        self.range(range.min()..=range.max()).count() as u64
    }
}

impl Occupancy for TriceIdList {
    fn is_occupied(&self, id: TriceId) -> bool {
        self.contains(id)
    }

    fn occupied_in(&self, range: IdRange) -> u64 {
        self.ids_in(range).count() as u64
    }
}

/// Find a free ID inside `range`.
///
/// Fails with [`AllocError::RangeExhausted`] when every ID of the range is
/// occupied. `Upward` and `Downward` are pure functions of their inputs;
/// `Random` is not reproducible.
pub fn allocate(
    range: IdRange,
    occupied: &impl Occupancy,
    method: SearchMethod,
    rng: &mut impl Rng,
) -> Result<TriceId, AllocError> {
    let size = range.len();
    let used = occupied.occupied_in(range);
    let exhausted = || AllocError::RangeExhausted {
        min: range.min(),
        max: range.max(),
        used,
    };
    if used >= size {
        return Err(exhausted());
    }

    let id = match method {
        SearchMethod::Random => {
            let free = size - used;
            if low_headroom(size, free) {
                warn!(%range, free, "less than 25% of the IDs are free");
            }
            random_id(range, occupied, free, rng)
        }
        SearchMethod::Upward => range.iter().find(|id| !occupied.is_occupied(*id)),
        SearchMethod::Downward => range.iter().rev().find(|id| !occupied.is_occupied(*id)),
    };
    id.ok_or_else(exhausted)
}

/// Fewer than a quarter of the range's IDs are still free
fn low_headroom(size: u64, free: u64) -> bool {
    free < size / 4
}

fn random_id(
    range: IdRange,
    occupied: &impl Occupancy,
    free: u64,
    rng: &mut impl Rng,
) -> Option<TriceId> {
    for _ in 0..MAX_RANDOM_DRAWS {
        let id = TriceId(rng.gen_range(range.min().0..=range.max().0));
        if !occupied.is_occupied(id) {
            return Some(id);
        }
        debug!(%id, "ID used, next try");
    }

    // Crowded range: pick uniformly among the free IDs instead.
    let pick = rng.gen_range(0..free);
    range
        .iter()
        .filter(|id| !occupied.is_occupied(*id))
        .nth(usize::try_from(pick).ok()?)
}
