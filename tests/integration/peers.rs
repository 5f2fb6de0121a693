use std::collections::HashMap;

use oapp_core::wire::Bytes32;
use oapp_services::origin::{self, Origin};
use oapp_services::{OAppError, PeerTable, PeerTransition};
use proptest::prelude::*;

fn peer(byte: u8) -> Bytes32 {
    let mut p = [0u8; 32];
    p[12..].fill(byte);
    p
}

// A handful of eids so updates and removals hit the same entries often.
fn op_strategy() -> impl Strategy<Value = (u32, Bytes32)> {
    (
        prop_oneof![Just(1u32), Just(1234), Just(5678), Just(9012), Just(u32::MAX)],
        prop_oneof![Just(0u8), 1u8..=4].prop_map(|b| if b == 0 { [0u8; 32] } else { peer(b) }),
    )
}

#[test]
fn prop_table_matches_model() {
    proptest!(|(ops in proptest::collection::vec(op_strategy(), 0..64))| {
        let mut table: PeerTable<Bytes32> = PeerTable::new();
        let mut model: HashMap<u32, Bytes32> = HashMap::new();

        for (eid, p) in ops {
            let before = model.get(&eid).copied();
            let transition = table.set_peer(eid, p);
            if p == [0u8; 32] {
                model.remove(&eid);
            } else {
                model.insert(eid, p);
            }

            let expected = match (before, p == [0u8; 32]) {
                (None, true) => PeerTransition::Unchanged,
                (None, false) => PeerTransition::Added,
                (Some(prev), false) if prev == p => PeerTransition::Unchanged,
                (Some(previous), false) => PeerTransition::Updated { previous },
                (Some(previous), true) => PeerTransition::Removed { previous },
            };
            prop_assert_eq!(transition, expected);

            prop_assert_eq!(table.len(), model.len());
            for probe in [1u32, 1234, 5678, 9012, u32::MAX] {
                let stored = model.get(&probe).copied();
                prop_assert_eq!(table.peer(probe), stored.unwrap_or([0u8; 32]));
                prop_assert_eq!(table.contains(probe), stored.is_some());
                match stored {
                    Some(p) => prop_assert_eq!(table.get_peer_or_revert(probe), Ok(p)),
                    None => prop_assert_eq!(
                        table.get_peer_or_revert(probe),
                        Err(OAppError::NoPeer(probe))
                    ),
                }
            }

            let mut eids = table.configured_eids();
            eids.sort_unstable();
            let mut expected_eids: Vec<u32> = model.keys().copied().collect();
            expected_eids.sort_unstable();
            prop_assert_eq!(eids, expected_eids);
        }
    });
}

#[test]
fn three_peers_remove_middle_and_readd() {
    let mut table: PeerTable<Bytes32> = PeerTable::new();
    for (eid, byte) in [(1234, 1), (5678, 2), (9012, 3)] {
        assert_eq!(table.set_peer(eid, peer(byte)), PeerTransition::Added);
    }

    assert_eq!(
        table.set_peer(5678, [0u8; 32]),
        PeerTransition::Removed { previous: peer(2) }
    );
    assert_eq!(table.len(), 2);
    assert_eq!(table.peer(1234), peer(1));
    assert_eq!(table.peer(9012), peer(3));
    assert_eq!(table.get_peer_or_revert(5678), Err(OAppError::NoPeer(5678)));

    assert_eq!(table.set_peer(5678, peer(4)), PeerTransition::Added);
    assert_eq!(table.len(), 3);
    assert_eq!(table.peer(5678), peer(4));
    assert_eq!(table.peer(9012), peer(3));
}

#[test]
fn batched_updates_apply_together() {
    let mut table: PeerTable<Bytes32> = PeerTable::new();
    table.set_peer(1234, peer(1));

    {
        let mut txn = table.begin();
        txn.set_peer(5678, peer(2)).set_peer(1234, [0u8; 32]);
        assert_eq!(txn.peer(1234), [0u8; 32]);
        // dropped without commit
    }
    assert_eq!(table.peer(1234), peer(1));
    assert!(!table.contains(5678));

    let mut txn = table.begin();
    txn.set_peer(5678, peer(2)).set_peer(1234, [0u8; 32]);
    let transitions = txn.commit();
    assert_eq!(
        transitions,
        vec![
            (5678, PeerTransition::Added),
            (1234, PeerTransition::Removed { previous: peer(1) }),
        ]
    );
    assert_eq!(table.configured_eids(), vec![5678]);
}

#[test]
fn origin_validation_order() {
    let mut table: PeerTable<Bytes32> = PeerTable::new();
    let origin = |src_eid, sender| Origin {
        src_eid,
        sender,
        nonce: 1,
    };

    assert_eq!(
        origin::validate(&table, &origin(1234, peer(1))),
        Err(OAppError::NoPeer(1234))
    );
    assert!(!origin::allow_initialize_path(&table, &origin(1234, peer(1))));
    assert!(!origin::allow_initialize_path(&table, &origin(1234, [0u8; 32])));
    assert_eq!(
        origin::validate(&table, &origin(1234, [0u8; 32])),
        Err(OAppError::NoPeer(1234))
    );

    table.set_peer(1234, peer(1));
    assert!(origin::validate(&table, &origin(1234, peer(1))).is_ok());
    assert!(origin::allow_initialize_path(&table, &origin(1234, peer(1))));

    assert!(matches!(
        origin::validate(&table, &origin(1234, peer(9))),
        Err(OAppError::InvalidSender { src_eid: 1234, .. })
    ));
    assert!(!origin::allow_initialize_path(&table, &origin(1234, peer(9))));
}
