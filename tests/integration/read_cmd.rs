use bytes::Bytes;
use oapp_core::read_cmd::{
    decode, decode_cmd_app_label, decode_num_requests, decode_request_app_request_label, encode,
    BlockRef, CallRequest, ComputeDirective,
};
use oapp_core::wire::{WireError, COMPUTE_SETTING_MAP_REDUCE, REQUEST_TARGET_SIZE};
use proptest::prelude::*;

const REQUEST_HEADER_LEN: usize = 7;

fn block_strategy() -> impl Strategy<Value = BlockRef> {
    prop_oneof![
        any::<u64>().prop_map(BlockRef::Number),
        any::<u64>().prop_map(BlockRef::Timestamp),
    ]
}

fn request_strategy() -> impl Strategy<Value = CallRequest> {
    (
        any::<u16>(),
        any::<u32>(),
        block_strategy(),
        any::<u16>(),
        any::<[u8; 20]>(),
        proptest::collection::vec(any::<u8>(), 0..96),
    )
        .prop_map(
            |(app_request_label, target_eid, block, confirmations, to, call_data)| CallRequest {
                app_request_label,
                target_eid,
                block,
                confirmations,
                to,
                call_data: Bytes::from(call_data),
            },
        )
}

#[test]
fn prop_selective_decoders_read_fixed_offsets() {
    proptest!(|(
        label in any::<u16>(),
        requests in proptest::collection::vec(request_strategy(), 1..6),
    )| {
        let cmd = encode(label, &requests, None).unwrap();

        prop_assert_eq!(decode_cmd_app_label(&cmd).unwrap(), label);
        prop_assert_eq!(&cmd[2..4], &label.to_be_bytes());
        prop_assert_eq!(decode_num_requests(&cmd).unwrap() as usize, requests.len());
        prop_assert_eq!(&cmd[4..6], &(requests.len() as u16).to_be_bytes());

        // walk the request records by their payload sizes
        let mut offset = 6;
        for request in &requests {
            prop_assert_eq!(
                decode_request_app_request_label(&cmd[offset..]).unwrap(),
                request.app_request_label
            );
            offset += REQUEST_HEADER_LEN + REQUEST_TARGET_SIZE + request.call_data.len();
        }
        prop_assert_eq!(offset, cmd.len());
    });
}

#[test]
fn prop_full_decode_recovers_requests() {
    proptest!(|(
        label in any::<u16>(),
        requests in proptest::collection::vec(request_strategy(), 1..4),
        setting in 0u8..=2,
    )| {
        let compute = ComputeDirective {
            compute_setting: setting,
            target_eid: 30101,
            block: BlockRef::Timestamp(1_700_000_000),
            confirmations: 3,
            to: [0x77; 20],
        };
        let cmd = encode(label, &requests, Some(&compute)).unwrap();
        let decoded = decode(&cmd).unwrap();

        prop_assert_eq!(decoded.app_cmd_label, label);
        prop_assert_eq!(&decoded.requests, &requests);
        prop_assert_eq!(decoded.compute, Some(compute));
    });
}

#[test]
fn compute_record_trails_the_requests() {
    let request = CallRequest {
        app_request_label: 1,
        target_eid: 30110,
        block: BlockRef::Number(19_000_000),
        confirmations: 15,
        to: [0x33; 20],
        call_data: Bytes::from_static(&[0x70, 0xa0, 0x82, 0x31]),
    };
    let compute = ComputeDirective {
        compute_setting: COMPUTE_SETTING_MAP_REDUCE,
        target_eid: 30101,
        block: BlockRef::Number(1),
        confirmations: 1,
        to: [0x44; 20],
    };
    let plain = encode(5, &[request.clone()], None).unwrap();
    let with_compute = encode(5, &[request], Some(&compute)).unwrap();

    assert_eq!(with_compute.len(), plain.len() + 37);
    assert_eq!(&with_compute[..plain.len()], &plain[..]);
    assert_eq!(with_compute[plain.len()], 1);
    assert_eq!(with_compute[plain.len() + 1], COMPUTE_SETTING_MAP_REDUCE);
}

#[test]
fn malformed_commands_are_rejected() {
    assert_eq!(encode(1, &[], None).unwrap_err(), WireError::NoRequests);
    assert!(decode_cmd_app_label(&[0x00, 0x01, 0x02]).is_err());
    assert!(decode_num_requests(&[0x00, 0x01, 0x00, 0x05]).is_err());

    let request = CallRequest {
        app_request_label: 1,
        target_eid: 1,
        block: BlockRef::Number(1),
        confirmations: 0,
        to: [0; 20],
        call_data: Bytes::new(),
    };
    let cmd = encode(1, &[request], None).unwrap();

    let mut trailing = cmd.to_vec();
    trailing.push(0);
    assert_eq!(decode(&trailing).unwrap_err(), WireError::TrailingBytes(1));

    assert!(decode(&cmd[..cmd.len() - 1]).is_err());
}
