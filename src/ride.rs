use serde::Serialize;

use crate::heap::Prioritized;

pub type RideId = i64;
pub type Cost = i64;
pub type TripDuration = i64;

/// A pending ride request.
///
/// Rides are ordered for dispatch by cost, then by trip duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ride {
    pub ride_id: RideId,
    pub cost: Cost,
    pub duration: TripDuration,
}

impl Ride {
    pub fn new(ride_id: RideId, cost: Cost, duration: TripDuration) -> Self {
        Self {
            ride_id,
            cost,
            duration,
        }
    }
}

impl Prioritized for Ride {
    type Key = RideId;
    type Priority = (Cost, TripDuration);

    fn key(&self) -> RideId {
        self.ride_id
    }

    fn priority(&self) -> (Cost, TripDuration) {
        (self.cost, self.duration)
    }
}
