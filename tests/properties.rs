use std::collections::BTreeMap;

use proptest::prelude::*;

use ridedb::{Ride, RideRepository, UpdateOutcome};

#[derive(Debug, Clone)]
enum Op {
    Insert(i64, i64, i64),
    Cancel(i64),
    Update(i64, i64),
    NextRide,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0i64..200, 0i64..50, 1i64..50).prop_map(|(id, cost, duration)| Op::Insert(id, cost, duration)),
        2 => (0i64..200).prop_map(Op::Cancel),
        2 => (0i64..200, 1i64..120).prop_map(|(id, duration)| Op::Update(id, duration)),
        1 => Just(Op::NextRide),
    ]
}

/// Plain map model of the repository. Dispatch picks the lowest
/// (cost, duration); among equal priorities any ride may come first.
fn model_next(model: &BTreeMap<i64, Ride>) -> Option<(i64, i64)> {
    model.values().map(|ride| (ride.cost, ride.duration)).min()
}

fn apply(repo: &mut RideRepository, model: &mut BTreeMap<i64, Ride>, op: &Op) -> Result<(), TestCaseError> {
    match *op {
        Op::Insert(id, cost, duration) => {
            let result = repo.insert(id, cost, duration);
            if model.contains_key(&id) {
                prop_assert!(result.unwrap_err().is_fatal());
            } else {
                prop_assert!(result.is_ok());
                model.insert(id, Ride::new(id, cost, duration));
            }
        }
        Op::Cancel(id) => {
            prop_assert_eq!(repo.cancel(id), model.remove(&id));
        }
        Op::Update(id, duration) => {
            let outcome = repo.update(id, duration);
            match model.get(&id).copied() {
                None => prop_assert_eq!(outcome, None),
                Some(old) if duration <= old.duration => {
                    prop_assert_eq!(outcome, Some(UpdateOutcome::Shortened));
                    model.insert(id, Ride::new(id, old.cost, duration));
                }
                Some(old) if duration <= 2 * old.duration => {
                    prop_assert_eq!(outcome, Some(UpdateOutcome::Repriced));
                    model.insert(id, Ride::new(id, old.cost + 10, duration));
                }
                Some(_) => {
                    prop_assert_eq!(outcome, Some(UpdateOutcome::Cancelled));
                    model.remove(&id);
                }
            }
        }
        Op::NextRide => {
            let expected = model_next(model);
            let ride = repo.next_ride();
            prop_assert_eq!(ride.map(|r| (r.cost, r.duration)), expected);
            if let Some(ride) = ride {
                prop_assert_eq!(model.remove(&ride.ride_id), Some(ride));
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invariants_hold_after_every_operation(ops in prop::collection::vec(op_strategy(), 0..400)) {
        let mut repo = RideRepository::new(1000);
        let mut model = BTreeMap::new();

        for op in &ops {
            apply(&mut repo, &mut model, op)?;
            if let Err(violation) = repo.check_consistency() {
                return Err(TestCaseError::fail(violation));
            }
            prop_assert_eq!(repo.len(), model.len());
        }

        for (id, ride) in &model {
            prop_assert_eq!(repo.find(*id), Some(*ride));
        }
    }

    #[test]
    fn found_rides_are_exactly_the_dispatchable_ones(ops in prop::collection::vec(op_strategy(), 0..300)) {
        let mut repo = RideRepository::new(1000);
        let mut model = BTreeMap::new();
        for op in &ops {
            apply(&mut repo, &mut model, op)?;
        }

        let findable: Vec<i64> = (0..200).filter(|id| repo.find(*id).is_some()).collect();
        let mut dispatched = Vec::new();
        while let Some(ride) = repo.next_ride() {
            dispatched.push(ride.ride_id);
        }
        dispatched.sort();

        prop_assert_eq!(findable, dispatched);
        prop_assert!(repo.is_empty());
    }

    #[test]
    fn next_ride_yields_non_decreasing_priorities(
        rides in prop::collection::btree_map(any::<i32>(), (-100i64..100, -100i64..100), 0..200)
    ) {
        let mut repo = RideRepository::new(rides.len());
        for (&id, &(cost, duration)) in &rides {
            repo.insert(id as i64, cost, duration).unwrap();
        }

        let mut previous = None;
        for _ in 0..rides.len() {
            let ride = repo.next_ride();
            prop_assert!(ride.is_some());
            let priority = ride.map(|r| (r.cost, r.duration));
            prop_assert!(previous <= priority);
            previous = priority;
        }
        prop_assert_eq!(repo.next_ride(), None);
    }

    #[test]
    fn find_range_matches_reference_scan(
        ids in prop::collection::btree_set(-500i64..500, 0..150),
        low in -600i64..600,
        span in 0i64..400,
    ) {
        let mut repo = RideRepository::new(ids.len());
        for &id in &ids {
            repo.insert(id, id.abs(), 1).unwrap();
        }
        let high = low + span;

        let found: Vec<i64> = repo.find_range(low, high).iter().map(|ride| ride.ride_id).collect();
        let expected: Vec<i64> = ids.iter().copied().filter(|id| low <= *id && *id <= high).collect();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn duplicate_insert_leaves_both_indexes_untouched(
        ids in prop::collection::btree_set(0i64..100, 1..50),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut repo = RideRepository::new(ids.len() + 1);
        for &id in &ids {
            repo.insert(id, id, id).unwrap();
        }
        let ids: Vec<i64> = ids.into_iter().collect();
        let dup = ids[pick.index(ids.len())];

        let result = repo.insert(dup, -1, -1);
        prop_assert!(result.unwrap_err().is_fatal());
        prop_assert_eq!(repo.len(), ids.len());
        prop_assert_eq!(repo.find(dup), Some(Ride::new(dup, dup, dup)));
        if let Err(violation) = repo.check_consistency() {
            return Err(TestCaseError::fail(violation));
        }
        // the rejected ride must not be dispatchable
        prop_assert_eq!(repo.next_ride().map(|r| r.cost), Some(ids[0]));
    }
}

#[test]
fn dispatch_scenario() {
    let mut repo = RideRepository::new(10);
    repo.insert(1, 10, 5).unwrap();
    repo.insert(2, 5, 8).unwrap();
    repo.insert(3, 5, 3).unwrap();

    assert_eq!(repo.next_ride(), Some(Ride::new(3, 5, 3)));
    assert_eq!(repo.next_ride(), Some(Ride::new(2, 5, 8)));
    assert_eq!(repo.next_ride(), Some(Ride::new(1, 10, 5)));
    assert_eq!(repo.next_ride(), None);
}

#[test]
fn update_policy_boundaries() {
    let mut repo = RideRepository::new(10);
    repo.insert(5, 20, 10).unwrap();

    repo.update(5, 10);
    assert_eq!(repo.find(5), Some(Ride::new(5, 20, 10)));
    repo.update(5, 15);
    assert_eq!(repo.find(5), Some(Ride::new(5, 30, 15)));

    let mut repo = RideRepository::new(10);
    repo.insert(5, 20, 10).unwrap();
    repo.update(5, 21);
    assert_eq!(repo.find(5), None);
    assert_eq!(repo.next_ride(), None);
}
