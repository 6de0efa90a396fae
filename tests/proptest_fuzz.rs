//! Property-based tests for feed decoding, assembly and pagination.
//!
//! Uses proptest to generate random/malformed inputs and verify the
//! coordinator never panics and keeps its ordering guarantees.
//!
//! Run with: `cargo test --test proptest_fuzz`

use std::collections::HashMap;
use std::sync::Arc;
use proptest::prelude::*;
use serde_json::Value;

use feed_sync::model::{assemble, owner_keys};
use feed_sync::source::decode_items;
use feed_sync::{
    FeedSyncConfig, InMemoryStore, Item, ManualProbe, MemorySource, PageRequest,
    SourceError, SyncCoordinator,
};

// =============================================================================
// Strategies for generating test data
// =============================================================================

fn item_strategy() -> impl Strategy<Value = Item> {
    (any::<i64>(), 0i64..20, ".{0,20}", ".{0,40}")
        .prop_map(|(id, owner, title, body)| Item::new(id, owner, title, body))
}

/// Generate arbitrary JSON values (including invalid structures)
fn arbitrary_json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        ".*".prop_map(Value::String),
    ];

    leaf.prop_recursive(
        4,   // depth
        64,  // max nodes
        10,  // items per collection
        |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..10)
                    .prop_map(Value::Array),
                prop::collection::hash_map(".*", inner, 0..10)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        },
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

// =============================================================================
// Decoding
// =============================================================================

proptest! {
    #[test]
    fn fuzz_decode_random_bytes(bytes in prop::collection::vec(any::<u8>(), 0..4096)) {
        match decode_items(&bytes) {
            Ok(_) => {}
            Err(SourceError::Decode(_)) => {}
            Err(other) => prop_assert!(false, "unexpected error kind: {:?}", other),
        }
    }

    #[test]
    fn fuzz_decode_arbitrary_json(json in arbitrary_json_strategy()) {
        let bytes = serde_json::to_vec(&json).unwrap();
        let _ = decode_items(&bytes);
    }

    #[test]
    fn prop_well_formed_page_decodes(items in prop::collection::vec(item_strategy(), 0..30)) {
        let bytes = serde_json::to_vec(&items).unwrap();
        prop_assert_eq!(decode_items(&bytes).unwrap(), items);
    }

    #[test]
    fn prop_offset_matches_page_arithmetic(page in 1u32..100_000, limit in 1u32..1_000) {
        let request = PageRequest::new(page, limit).unwrap();
        prop_assert_eq!(request.offset(), (u64::from(page) - 1) * u64::from(limit));
    }
}

// =============================================================================
// Assembly
// =============================================================================

proptest! {
    #[test]
    fn prop_assemble_preserves_length_and_order(
        items in prop::collection::vec(item_strategy(), 0..50),
        with_asset in prop::collection::btree_set(0i64..20, 0..20),
    ) {
        let assets: HashMap<_, _> = with_asset.iter().map(|&k| (k, vec![k as u8])).collect();
        let records = assemble(&items, &assets);

        prop_assert_eq!(records.len(), items.len());
        for (record, item) in records.iter().zip(&items) {
            prop_assert_eq!(&record.title, &item.title);
            prop_assert_eq!(record.owner_key, item.owner_key);
            prop_assert_eq!(record.has_asset(), with_asset.contains(&item.owner_key));
        }
    }

    #[test]
    fn prop_owner_keys_are_distinct(items in prop::collection::vec(item_strategy(), 0..50)) {
        let keys = owner_keys(&items);
        prop_assert!(keys.len() <= items.len());
        prop_assert!(items.iter().all(|i| keys.contains(&i.owner_key)));
    }
}

// =============================================================================
// Pagination
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_pages_accumulate(sizes in prop::collection::vec(1usize..10, 1..6)) {
        let source = Arc::new(MemorySource::new());
        let mut next_id = 1i64;
        for (index, &size) in sizes.iter().enumerate() {
            let items: Vec<Item> = (0..size)
                .map(|_| {
                    let item = Item::new(next_id, next_id % 4, format!("t{}", next_id), "");
                    next_id += 1;
                    item
                })
                .collect();
            source.set_page(index as u32 + 1, &items);
        }

        let coordinator = SyncCoordinator::new(
            FeedSyncConfig::default(),
            source,
            Arc::new(InMemoryStore::new()),
            Arc::new(ManualProbe::new(true)),
        );

        let rt = runtime();
        let mut expected = 0;
        for (index, &size) in sizes.iter().enumerate() {
            let outcome = rt.block_on(coordinator.load_page(index == 0));
            expected += size;
            prop_assert_eq!(outcome.page as usize, index + 1);
            prop_assert_eq!(coordinator.count_of_news(), expected);
        }

        let ids: Vec<String> = coordinator.snapshot().iter().map(|r| r.title.clone()).collect();
        let in_order: Vec<String> = (1..next_id).map(|id| format!("t{}", id)).collect();
        prop_assert_eq!(ids, in_order);
    }
}
