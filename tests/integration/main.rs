//! OApp integration test harness.
//!
//! Two messengers, each bound to its own loopback endpoint. Packets only
//! move between them when a test calls [`deliver`], so every test controls
//! exactly what the receiving side sees.
//!
//!   cargo test --test integration

use oapp_core::config::OAppConfig;
use oapp_core::wire::Address;
use oapp_services::endpoint::{FeeModel, OutboundPacket};
use oapp_services::{Endpoint, LoopbackEndpoint, Messenger, OApp, OAppError};

mod messaging;
mod options;
mod peers;
mod read_cmd;

// ── Harness ───────────────────────────────────────────────────────────────────

pub const EID_A: u32 = 30101;
pub const EID_B: u32 = 30184;

pub const OWNER: Address = [0x0a; 20];
pub const APP_A: Address = [0xa1; 20];
pub const APP_B: Address = [0xb1; 20];
pub const ENDPOINT_A: Address = [0xe1; 20];
pub const ENDPOINT_B: Address = [0xe2; 20];
pub const EXECUTOR: Address = [0xee; 20];

pub type Node = Messenger<LoopbackEndpoint>;

pub fn fees() -> FeeModel {
    FeeModel {
        base: 1_000,
        per_byte: 10,
        lz_token: None,
    }
}

pub fn node(eid: u32, endpoint: Address, app: Address) -> Node {
    let endpoint = LoopbackEndpoint::new(eid, endpoint).with_fees(fees());
    Messenger::new(OApp::new(app, OWNER, endpoint), &OAppConfig::default())
}

/// Two nodes on different endpoints that trust each other.
pub fn peered_pair() -> (Node, Node) {
    let mut a = node(EID_A, ENDPOINT_A, APP_A);
    let mut b = node(EID_B, ENDPOINT_B, APP_B);
    let (peer_a, peer_b) = (a.as_peer(), b.as_peer());
    a.oapp_mut().set_peer(&OWNER, EID_B, peer_b).unwrap();
    b.oapp_mut().set_peer(&OWNER, EID_A, peer_a).unwrap();
    (a, b)
}

/// Drain `from`'s endpoint outbox.
pub fn take_packets(from: &mut Node) -> Vec<OutboundPacket> {
    from.oapp_mut().endpoint_mut().drain_outbox()
}

/// Hand every queued packet of `from` to `to`, as `to`'s endpoint would.
pub fn deliver(from: &mut Node, to: &mut Node) -> Vec<Result<(), OAppError>> {
    let caller = to.oapp().endpoint().address();
    take_packets(from)
        .into_iter()
        .map(|p| to.lz_receive(&caller, &p.origin(), &p.guid, &p.message, &EXECUTOR, &[]))
        .collect()
}
