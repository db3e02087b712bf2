use std::collections::{HashMap, VecDeque};

use tracing::debug;

use super::chain::{ChainError, MoveChain};
use super::entity::{EntityId, EntityStore};

/// Riders keyed by the entity that carries them, sampled once per build so that
/// propagation cannot change what discovery sees.
#[derive(Debug, Default, Clone)]
pub struct SupportSnapshot {
    riders_by_support: HashMap<EntityId, Vec<EntityId>>,
}

impl SupportSnapshot {
    pub fn capture<S: EntityStore + ?Sized>(store: &S) -> Self {
        let mut riders_by_support = HashMap::<EntityId, Vec<EntityId>>::new();
        for id in store.entity_ids() {
            let Some(entity) = store.entity(id) else {
                continue;
            };
            for support in entity.supports() {
                if support == id {
                    continue;
                }
                let riders = riders_by_support.entry(support).or_default();
                if !riders.contains(&id) {
                    riders.push(id);
                }
            }
        }
        Self { riders_by_support }
    }

    pub fn riders_of(&self, support: EntityId) -> &[EntityId] {
        self.riders_by_support
            .get(&support)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Fills `chain` with every entity transitively carried by `mover`.
///
/// Traversal is breadth-first over the support snapshot. The mover itself is
/// never added and each entity is added at most once, which also terminates
/// support cycles. A rider that the store can no longer resolve ends its
/// branch.
pub fn build_chain<S: EntityStore + ?Sized>(
    store: &S,
    mover: EntityId,
    chain: &mut MoveChain<'_>,
) -> Result<(), ChainError> {
    let snapshot = SupportSnapshot::capture(store);
    build_chain_from_snapshot(store, &snapshot, mover, chain)
}

pub fn build_chain_from_snapshot<S: EntityStore + ?Sized>(
    store: &S,
    snapshot: &SupportSnapshot,
    mover: EntityId,
    chain: &mut MoveChain<'_>,
) -> Result<(), ChainError> {
    let mut frontier = VecDeque::from([mover]);

    while let Some(support) = frontier.pop_front() {
        for &rider in snapshot.riders_of(support) {
            if rider == mover || chain.contains(rider) {
                continue;
            }
            if !store.contains(rider) {
                debug!(
                    support = support.0,
                    rider = rider.0,
                    "stale_support_reference"
                );
                continue;
            }
            chain.prepend(rider)?;
            frontier.push_back(rider);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;
    use crate::sim::chain::ChainArena;
    use crate::sim::entity::Entity;
    use crate::sim::test_support::FakeStore;

    fn collect(store: &FakeStore, mover: EntityId) -> Vec<EntityId> {
        let mut arena = ChainArena::default();
        let mut chain = arena.acquire();
        build_chain(store, mover, &mut chain).expect("build");
        let members = chain.discovery_order().collect();
        members
    }

    #[test]
    fn lone_mover_builds_empty_chain() {
        let store = FakeStore::with_entities(1);
        assert!(collect(&store, EntityId(0)).is_empty());
    }

    #[test]
    fn stacked_riders_are_discovered_breadth_first() {
        let mut store = FakeStore::with_entities(5);
        store.stand(1, 0);
        store.stand(2, 0);
        store.stand(3, 1);
        store.stand(4, 3);

        let chain = collect(&store, EntityId(0));
        assert_eq!(
            chain,
            vec![EntityId(1), EntityId(2), EntityId(3), EntityId(4)]
        );
    }

    #[test]
    fn unrelated_entities_are_not_collected() {
        let mut store = FakeStore::with_entities(4);
        store.stand(1, 0);
        store.stand(3, 2);

        assert_eq!(collect(&store, EntityId(0)), vec![EntityId(1)]);
    }

    #[test]
    fn attachment_edges_are_followed() {
        let mut store = FakeStore::with_entities(3);
        store.attach(1, 0);
        store.stand(2, 1);

        assert_eq!(collect(&store, EntityId(0)), vec![EntityId(1), EntityId(2)]);
    }

    #[test]
    fn rider_both_standing_and_attached_appears_once() {
        let mut store = FakeStore::with_entities(2);
        store.stand(1, 0);
        store.attach(1, 0);

        assert_eq!(collect(&store, EntityId(0)), vec![EntityId(1)]);
    }

    #[test]
    fn support_cycle_terminates_with_each_member_once() {
        let mut store = FakeStore::with_entities(3);
        store.stand(1, 0);
        store.stand(2, 1);
        store.attach(1, 2);

        assert_eq!(collect(&store, EntityId(0)), vec![EntityId(1), EntityId(2)]);
    }

    #[test]
    fn cycle_back_through_mover_skips_mover() {
        let mut store = FakeStore::with_entities(2);
        store.stand(1, 0);
        store.stand(0, 1);

        assert_eq!(collect(&store, EntityId(0)), vec![EntityId(1)]);
    }

    #[test]
    fn self_support_is_ignored() {
        let mut store = FakeStore::with_entities(2);
        store.stand(1, 0);
        store.attach(1, 1);

        assert_eq!(collect(&store, EntityId(0)), vec![EntityId(1)]);
    }

    #[test]
    fn stale_rider_terminates_branch() {
        let mut store = FakeStore::with_entities(3);
        store.stand(1, 0);
        store.stand(2, 1);
        let snapshot = SupportSnapshot::capture(&store);
        store.remove(1);

        let mut arena = ChainArena::default();
        let mut chain = arena.acquire();
        build_chain_from_snapshot(&store, &snapshot, EntityId(0), &mut chain).expect("build");
        assert!(chain.is_empty());
    }

    #[test]
    fn stale_support_reference_is_never_descended() {
        let mut store = FakeStore::with_entities(2);
        store.insert(Entity {
            ground_entity: Some(EntityId(77)),
            ..FakeStore::blank_entity(5)
        });
        store.stand(1, 0);

        assert_eq!(collect(&store, EntityId(0)), vec![EntityId(1)]);
    }

    #[test]
    fn exhaustion_surfaces_as_error_and_releases_nodes() {
        let mut store = FakeStore::with_entities(4);
        store.stand(1, 0);
        store.stand(2, 0);
        store.stand(3, 0);

        let mut arena = ChainArena::with_capacity(2);
        {
            let mut chain = arena.acquire();
            let err = build_chain(&store, EntityId(0), &mut chain).expect_err("exhausted");
            assert_eq!(err, ChainError::Exhausted { capacity: 2 });
        }
        assert_eq!(arena.stats().allocated, 2);
        assert_eq!(arena.stats().live_nodes(), 0);
    }

    #[test]
    fn snapshot_is_not_affected_by_later_store_edits() {
        let mut store = FakeStore::with_entities(3);
        store.stand(1, 0);
        let snapshot = SupportSnapshot::capture(&store);
        store.stand(2, 1);

        let mut arena = ChainArena::default();
        let mut chain = arena.acquire();
        build_chain_from_snapshot(&store, &snapshot, EntityId(0), &mut chain).expect("build");
        assert_eq!(chain.discovery_order().collect::<Vec<_>>(), vec![EntityId(1)]);
    }

    /// Entity `i + 1` either stands on some `j <= i` or on nothing.
    fn forest() -> impl Strategy<Value = Vec<Option<u64>>> {
        (1usize..24).prop_flat_map(|count| {
            (0..count)
                .map(|i| prop::option::of(0..=i as u64).boxed())
                .collect::<Vec<_>>()
        })
    }

    proptest! {
        #[test]
        fn acyclic_support_collects_every_descendant_once(supports in forest()) {
            let mut store = FakeStore::with_entities(supports.len() as u64 + 1);
            for (index, support) in supports.iter().enumerate() {
                if let Some(support) = support {
                    store.stand(index as u64 + 1, *support);
                }
            }

            let mut expected = HashSet::from([EntityId(0)]);
            for (index, support) in supports.iter().enumerate() {
                if support.is_some_and(|raw| expected.contains(&EntityId(raw))) {
                    expected.insert(EntityId(index as u64 + 1));
                }
            }
            expected.remove(&EntityId(0));

            let chain = collect(&store, EntityId(0));
            let unique = chain.iter().copied().collect::<HashSet<_>>();
            prop_assert_eq!(unique.len(), chain.len());
            prop_assert_eq!(unique, expected);
        }
    }
}
