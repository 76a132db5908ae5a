use tracing::debug;

use crate::errors::{HeapError, RepositoryError, TreeError};
use crate::heap::PriorityIndex;
use crate::rbtree::RedBlackTree;
use crate::ride::{Cost, Ride, RideId, TripDuration};

pub const DEFAULT_CAPACITY: usize = 2000;

/// Added to a ride's cost when its trip grows by at most a factor of two.
pub const REPRICE_PENALTY: Cost = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The new duration was no longer than the old one and replaced it.
    Shortened,
    /// The trip grew by at most 2x; duration replaced and cost penalized.
    Repriced,
    /// The trip more than doubled and the ride was dropped.
    Cancelled,
}

/// Pending rides indexed both by ride number and by dispatch priority.
///
/// Every ride is present in both indexes or in neither once a call returns.
pub struct RideRepository {
    rides: RedBlackTree<RideId, Ride>,
    queue: PriorityIndex<Ride>,
}

impl Default for RideRepository {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RideRepository {
    /// `capacity` bounds how many rides can be pending at once.
    pub fn new(capacity: usize) -> Self {
        Self {
            rides: RedBlackTree::new(),
            queue: PriorityIndex::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.rides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rides.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Adds a new ride. Capacity is checked before the ride number, so a
    /// full queue reports `CapacityExhausted` even for a taken number.
    /// Neither index is touched when the insert is rejected.
    pub fn insert(
        &mut self,
        ride_id: RideId,
        cost: Cost,
        duration: TripDuration,
    ) -> Result<(), RepositoryError> {
        let capacity = self.queue.capacity();
        if self.queue.is_full() {
            return Err(RepositoryError::CapacityExhausted { capacity });
        }
        if self.rides.contains_key(&ride_id) {
            return Err(RepositoryError::DuplicateRide(ride_id));
        }

        let ride = Ride::new(ride_id, cost, duration);
        self.queue.insert(ride).map_err(|err| match err {
            HeapError::Full { capacity } => RepositoryError::CapacityExhausted { capacity },
            HeapError::DuplicateKey => RepositoryError::DuplicateRide(ride_id),
        })?;

        if let Err(err) = self.rides.insert(ride_id, ride) {
            self.queue.remove(&ride_id);
            return Err(match err {
                TreeError::DuplicateKey => RepositoryError::DuplicateRide(ride_id),
                TreeError::ArenaFull => RepositoryError::CapacityExhausted { capacity },
            });
        }

        debug!(ride_id, cost, duration, "ride inserted");
        Ok(())
    }

    /// Drops a ride from both indexes, returning it if it was pending.
    pub fn cancel(&mut self, ride_id: RideId) -> Option<Ride> {
        let ride = self.rides.remove(&ride_id)?;
        self.queue.remove(&ride_id);
        debug!(ride_id, "ride cancelled");
        Some(ride)
    }

    /// Applies a new trip duration:
    /// - not longer than before: the duration is replaced,
    /// - up to twice as long: the duration is replaced and the cost goes up by
    ///   [`REPRICE_PENALTY`],
    /// - more than twice as long: the ride is cancelled.
    ///
    /// Returns `None` when the ride isn't pending.
    pub fn update(&mut self, ride_id: RideId, new_duration: TripDuration) -> Option<UpdateOutcome> {
        let existing = *self.rides.get(&ride_id)?;

        let outcome = if new_duration <= existing.duration {
            self.reprioritize(ride_id, existing.cost, new_duration);
            UpdateOutcome::Shortened
        } else if new_duration <= existing.duration.saturating_mul(2) {
            let cost = existing.cost.saturating_add(REPRICE_PENALTY);
            self.reprioritize(ride_id, cost, new_duration);
            UpdateOutcome::Repriced
        } else {
            self.cancel(ride_id);
            UpdateOutcome::Cancelled
        };

        debug!(ride_id, new_duration, ?outcome, "ride updated");
        Some(outcome)
    }

    /// Removes and returns the cheapest pending ride (shortest trip on equal
    /// cost). `None` means nothing is pending.
    pub fn next_ride(&mut self) -> Option<Ride> {
        let ride = self.queue.extract_min()?;
        self.rides.remove(&ride.ride_id);
        debug!(ride_id = ride.ride_id, "ride dispatched");
        Some(ride)
    }

    pub fn find(&self, ride_id: RideId) -> Option<Ride> {
        self.rides.get(&ride_id).copied()
    }

    /// Pending rides with `low <= ride_id <= high`, ascending by ride number.
    pub fn find_range(&self, low: RideId, high: RideId) -> Vec<Ride> {
        self.rides
            .range(&low, &high)
            .into_iter()
            .map(|(_, ride)| *ride)
            .collect()
    }

    /// Verifies both indexes and that they hold exactly the same rides.
    pub fn check_consistency(&self) -> Result<(), String> {
        self.rides.check_invariants()?;
        self.queue.check_invariants()?;

        if self.rides.len() != self.queue.len() {
            return Err(format!(
                "ordered index holds {} rides, priority index {}",
                self.rides.len(),
                self.queue.len()
            ));
        }
        for queued in self.queue.iter() {
            match self.rides.get(&queued.ride_id) {
                Some(ride) if ride == queued => {}
                Some(ride) => {
                    return Err(format!("ride {} differs: {ride:?} vs {queued:?}", queued.ride_id));
                }
                None => {
                    return Err(format!("ride {} is only queued", queued.ride_id));
                }
            }
        }
        Ok(())
    }

    /// Rewrites cost and duration in both indexes. The ride number is the
    /// tree key and doesn't move; the queue re-sifts around the new priority.
    fn reprioritize(&mut self, ride_id: RideId, cost: Cost, duration: TripDuration) {
        if let Some(ride) = self.rides.get_mut(&ride_id) {
            ride.cost = cost;
            ride.duration = duration;
        }
        self.queue.modify(&ride_id, |ride| {
            ride.cost = cost;
            ride.duration = duration;
        });
    }
}
