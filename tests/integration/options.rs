use oapp_core::options::{combine_options, decode_options, default_message_options, Options};
use oapp_core::wire::{
    WireError, MAX_OPTIONS_TOTAL_SIZE, MAX_OPTION_SINGLE_SIZE, OPTION_TYPE_LZRECEIVE,
};
use oapp_core::ExecutorOption;
use proptest::prelude::*;
use std::num::NonZeroU128;

// Raw executor records: (option_type, params) with params small enough that
// eight of them always fit under the total ceiling.
fn record_strategy() -> impl Strategy<Value = (u8, Vec<u8>)> {
    (1u8..=5, proptest::collection::vec(any::<u8>(), 0..=56))
}

#[test]
fn gas_60000_matches_reference_encoding() {
    let opts = default_message_options(60_000).unwrap();
    assert_eq!(
        hex::encode(opts.as_bytes()),
        "0003010011010000000000000000000000000000ea60"
    );
}

#[test]
fn prop_blob_length_is_header_plus_records() {
    proptest!(|(records in proptest::collection::vec(record_strategy(), 0..8))| {
        let mut opts = Options::new();
        for (option_type, params) in &records {
            opts.add_executor_option(*option_type, params).unwrap();
        }

        let expected = 2 + records.iter().map(|(_, p)| 4 + p.len()).sum::<usize>();
        prop_assert_eq!(opts.len(), expected);

        let decoded = decode_options(opts.as_bytes()).unwrap();
        prop_assert_eq!(decoded.executor.len(), records.len());
        for (got, (option_type, params)) in decoded.executor.iter().zip(&records) {
            prop_assert_eq!(got.option_type, *option_type);
            prop_assert_eq!(&got.params, params);
        }
    });
}

#[test]
fn prop_lz_receive_record_layout() {
    proptest!(|(gas in any::<u128>(), value in any::<u128>())| {
        let mut opts = Options::new();
        opts.add_executor_lz_receive_option(gas, NonZeroU128::new(value)).unwrap();
        let blob = opts.as_bytes();

        let size = if value == 0 { 17u16 } else { 33 };
        prop_assert_eq!(&blob[..2], &[0x00, 0x03]);
        prop_assert_eq!(blob[2], 1);
        prop_assert_eq!(&blob[3..5], &size.to_be_bytes());
        prop_assert_eq!(blob[5], OPTION_TYPE_LZRECEIVE);
        prop_assert_eq!(&blob[6..22], &gas.to_be_bytes());
        if value != 0 {
            prop_assert_eq!(&blob[22..38], &value.to_be_bytes());
        }
        prop_assert_eq!(blob.len(), 5 + size as usize);

        let decoded = decode_options(blob).unwrap().executor_options().unwrap();
        prop_assert_eq!(
            decoded,
            vec![ExecutorOption::LzReceive { gas, value: NonZeroU128::new(value) }]
        );
    });
}

#[test]
fn executor_and_dvn_records_interleave() {
    let mut opts = Options::new();
    opts.add_executor_lz_receive_option(200_000, None)
        .unwrap()
        .add_dvn_precrime_option(0)
        .unwrap()
        .add_executor_ordered_execution_option()
        .unwrap()
        .add_dvn_precrime_option(3)
        .unwrap();

    let decoded = decode_options(opts.as_bytes()).unwrap();
    assert_eq!(
        decoded.executor_options().unwrap(),
        vec![
            ExecutorOption::LzReceive {
                gas: 200_000,
                value: None
            },
            ExecutorOption::OrderedExecution,
        ]
    );
    assert_eq!(decoded.dvn.keys().copied().collect::<Vec<_>>(), vec![0, 3]);
}

#[test]
fn ceilings_are_enforced_without_mutation() {
    let mut opts = Options::new();
    let oversized = vec![0u8; MAX_OPTION_SINGLE_SIZE];
    assert_eq!(
        opts.add_executor_option(OPTION_TYPE_LZRECEIVE, &oversized)
            .unwrap_err(),
        WireError::SizeExceeded {
            size: MAX_OPTION_SINGLE_SIZE + 1,
            limit: MAX_OPTION_SINGLE_SIZE
        }
    );
    assert_eq!(opts.len(), 2);

    let params = vec![0u8; MAX_OPTION_SINGLE_SIZE - 1];
    while opts.len() + 4 + params.len() <= MAX_OPTIONS_TOTAL_SIZE {
        opts.add_executor_option(OPTION_TYPE_LZRECEIVE, &params).unwrap();
    }
    let full = opts.as_bytes().to_vec();
    assert!(matches!(
        opts.add_executor_option(OPTION_TYPE_LZRECEIVE, &params),
        Err(WireError::SizeExceeded { limit: MAX_OPTIONS_TOTAL_SIZE, .. })
    ));
    assert_eq!(opts.as_bytes(), &full[..]);
}

#[test]
fn combined_options_decode_as_one_blob() {
    let enforced = default_message_options(100_000).unwrap();
    let mut extra = Options::new();
    extra
        .add_executor_native_drop_option(1_000, [0x42; 32])
        .unwrap();

    let combined = combine_options(enforced.as_bytes(), extra.as_bytes()).unwrap();
    let decoded = decode_options(&combined).unwrap().executor_options().unwrap();
    assert_eq!(decoded.len(), 2);
    assert!(matches!(decoded[1], ExecutorOption::NativeDrop { amount: 1_000, .. }));
}
