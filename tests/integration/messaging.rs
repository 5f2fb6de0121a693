use bytes::Bytes;
use oapp_core::read_cmd::{self, BlockRef};
use oapp_core::wire::address_to_bytes32;
use oapp_services::oapp::LZ_READ_CHANNEL;
use oapp_services::{Endpoint, OAppError, Origin, ReadQuery, SendContext};

use crate::*;

/// Message sent on A arrives in B's inbox with A as the origin.
#[test]
fn message_round_trip_between_peers() {
    let (mut a, mut b) = peered_pair();

    let fee = a.quote_message_fee(EID_B, "hello").unwrap();
    let ctx = SendContext {
        caller: OWNER,
        value: fee.native_fee,
    };
    let receipt = a.send_message(&ctx, EID_B, "hello").unwrap();
    assert_eq!(receipt.nonce, 1);
    assert_eq!(receipt.fee, fee);

    let results = deliver(&mut a, &mut b);
    assert_eq!(results, vec![Ok(())]);

    let inbox = b.inbox().messages();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].text(), "hello");
    assert_eq!(inbox[0].src_eid, EID_A);
    assert_eq!(inbox[0].sender, address_to_bytes32(&APP_A));
    assert_eq!(inbox[0].guid, receipt.guid);
}

#[test]
fn nonces_increase_per_path() {
    let (mut a, mut b) = peered_pair();
    let fee = a.quote_message_fee(EID_B, "x").unwrap();
    let ctx = SendContext {
        caller: OWNER,
        value: fee.native_fee,
    };

    let first = a.send_message(&ctx, EID_B, "x").unwrap();
    let second = a.send_message(&ctx, EID_B, "x").unwrap();
    assert_eq!((first.nonce, second.nonce), (1, 2));
    assert_ne!(first.guid, second.guid);

    assert!(deliver(&mut a, &mut b).iter().all(Result::is_ok));
    let nonces: Vec<u64> = b.inbox().messages().iter().map(|m| m.nonce).collect();
    assert_eq!(nonces, vec![1, 2]);
}

#[test]
fn overpayment_is_kept_and_withdrawable() {
    let (mut a, _b) = peered_pair();
    let fee = a.quote_message_fee(EID_B, "hi").unwrap();
    let ctx = SendContext {
        caller: OWNER,
        value: fee.native_fee + 500,
    };
    a.send_message(&ctx, EID_B, "hi").unwrap();
    assert_eq!(a.balance(), 500);

    assert!(matches!(
        a.withdraw(&APP_B, 500),
        Err(OAppError::Unauthorized(_))
    ));
    assert_eq!(a.withdraw(&OWNER, 500).unwrap(), 500);
    assert_eq!(a.balance(), 0);
}

#[test]
fn underpaid_send_leaves_no_trace() {
    let (mut a, _b) = peered_pair();
    let fee = a.quote_message_fee(EID_B, "hi").unwrap();
    let ctx = SendContext {
        caller: OWNER,
        value: fee.native_fee - 1,
    };
    assert!(matches!(
        a.send_message(&ctx, EID_B, "hi"),
        Err(OAppError::NotEnoughNative { .. })
    ));
    assert!(a.oapp().endpoint().outbox().is_empty());
    assert_eq!(a.balance(), 0);
}

/// Packets from an untrusted sender or a non-endpoint caller never reach
/// the inbox.
#[test]
fn receiver_rejects_unauthorized_deliveries() {
    let (mut a, mut b) = peered_pair();
    let mut stranger = node(EID_A, ENDPOINT_A, [0x99; 20]);
    stranger
        .oapp_mut()
        .set_peer(&OWNER, EID_B, b.as_peer())
        .unwrap();

    let fee = stranger.quote_message_fee(EID_B, "spoof").unwrap();
    let ctx = SendContext {
        caller: OWNER,
        value: fee.native_fee,
    };
    stranger.send_message(&ctx, EID_B, "spoof").unwrap();
    let results = deliver(&mut stranger, &mut b);
    assert!(matches!(
        results.as_slice(),
        [Err(OAppError::InvalidSender { src_eid: EID_A, .. })]
    ));

    let fee = a.quote_message_fee(EID_B, "hi").unwrap();
    a.send_message(
        &SendContext {
            caller: OWNER,
            value: fee.native_fee,
        },
        EID_B,
        "hi",
    )
    .unwrap();
    let packet = take_packets(&mut a).remove(0);
    let err = b
        .lz_receive(&EXECUTOR, &packet.origin(), &packet.guid, &packet.message, &EXECUTOR, &[])
        .unwrap_err();
    assert!(matches!(err, OAppError::OnlyEndpoint(_)));

    assert!(b.inbox().messages().is_empty());
}

#[test]
fn removed_peer_stops_traffic_both_ways() {
    let (mut a, mut b) = peered_pair();
    let fee = a.quote_message_fee(EID_B, "hi").unwrap();
    let ctx = SendContext {
        caller: OWNER,
        value: fee.native_fee,
    };
    a.send_message(&ctx, EID_B, "hi").unwrap();

    b.oapp_mut().set_peer(&OWNER, EID_A, [0u8; 32]).unwrap();
    assert_eq!(deliver(&mut a, &mut b), vec![Err(OAppError::NoPeer(EID_A))]);

    a.oapp_mut().set_peer(&OWNER, EID_B, [0u8; 32]).unwrap();
    assert_eq!(
        a.quote_message_fee(EID_B, "hi"),
        Err(OAppError::NoPeer(EID_B))
    );
}

#[test]
fn read_request_loops_back_to_self() {
    let (mut a, _b) = peered_pair();
    let query = ReadQuery {
        target_eid: EID_B,
        to: [0x33; 20],
        call_data: Bytes::from_static(&[0x18, 0x16, 0x0d, 0xdd]),
        block: Some(BlockRef::Number(1_000)),
    };
    assert_eq!(
        a.quote_read_fee(LZ_READ_CHANNEL, &query),
        Err(OAppError::NoPeer(LZ_READ_CHANNEL))
    );

    a.oapp_mut()
        .set_read_channel(&OWNER, LZ_READ_CHANNEL, true)
        .unwrap();
    let fee = a.quote_read_fee(LZ_READ_CHANNEL, &query).unwrap();
    let ctx = SendContext {
        caller: OWNER,
        value: fee.native_fee * 2,
    };
    a.request_read(&ctx, LZ_READ_CHANNEL, &query).unwrap();
    assert_eq!(a.balance(), fee.native_fee);

    let packet = take_packets(&mut a).remove(0);
    assert_eq!(packet.dst_eid, LZ_READ_CHANNEL);
    assert_eq!(packet.receiver, a.as_peer());

    let cmd = read_cmd::decode(&packet.message).unwrap();
    assert_eq!(cmd.requests.len(), 1);
    assert_eq!(cmd.requests[0].target_eid, EID_B);
    assert_eq!(cmd.requests[0].block, BlockRef::Number(1_000));
    assert_eq!(cmd.requests[0].call_data, query.call_data);

    // the read response arrives on the channel, from ourselves
    let response = Origin {
        src_eid: LZ_READ_CHANNEL,
        sender: a.as_peer(),
        nonce: 1,
    };
    let endpoint = a.oapp().endpoint().address();
    a.lz_receive(&endpoint, &response, &[7; 32], &[0x2a], &EXECUTOR, &[])
        .unwrap();
    assert_eq!(a.inbox().read_responses().len(), 1);
    assert!(a.inbox().messages().is_empty());

    a.oapp_mut()
        .set_read_channel(&OWNER, LZ_READ_CHANNEL, false)
        .unwrap();
    assert!(a.request_read(&ctx, LZ_READ_CHANNEL, &query).is_err());
}

#[test]
fn enforced_options_reach_the_wire() {
    let (mut a, _b) = peered_pair();
    let mut enforced = oapp_core::Options::new();
    enforced.add_executor_ordered_execution_option().unwrap();
    a.oapp_mut()
        .set_enforced_options(&OWNER, EID_B, enforced.as_bytes())
        .unwrap();

    let fee = a.quote_message_fee(EID_B, "hi").unwrap();
    let ctx = SendContext {
        caller: OWNER,
        value: fee.native_fee,
    };
    a.send_message(&ctx, EID_B, "hi").unwrap();

    let packet = take_packets(&mut a).remove(0);
    let decoded = oapp_core::options::decode_options(&packet.options)
        .unwrap()
        .executor_options()
        .unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[0], oapp_core::ExecutorOption::OrderedExecution);
}
