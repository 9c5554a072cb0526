//! Property tests for the metadata heuristic

use proptest::prelude::*;
use serde_json::{json, Value};
use synthscan_analyzers::heuristic::{HeuristicScorer, MAX_SCORE};
use synthscan_core::{keys, MetadataRecord};

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        (0i64..64).prop_map(|n| Value::from(n * 64)),
        any::<f64>().prop_filter("finite", |f| f.is_finite()).prop_map(|f| json!(f)),
        "[a-z]{0,8}".prop_map(Value::from),
        Just(json!({})),
    ]
}

fn arb_metadata() -> impl Strategy<Value = Vec<(String, Value)>> {
    let key = prop_oneof![
        Just(keys::EXIF.to_string()),
        Just(keys::PNG.to_string()),
        Just(keys::GPS.to_string()),
        Just(keys::PIXEL_WIDTH.to_string()),
        Just(keys::PIXEL_HEIGHT.to_string()),
        "[A-Za-z{}]{1,10}",
    ];
    prop::collection::vec((key, arb_value()), 0..8)
}

fn build(entries: &[(String, Value)]) -> MetadataRecord {
    entries
        .iter()
        .fold(MetadataRecord::new(), |record, (k, v)| record.with(k.clone(), v.clone()))
}

proptest! {
    #[test]
    fn score_is_bounded_and_deterministic(entries in arb_metadata()) {
        let record = build(&entries);
        let score = HeuristicScorer::score(&record);

        prop_assert!(score <= MAX_SCORE);
        prop_assert_eq!(score, HeuristicScorer::score(&record));
        prop_assert_eq!(score, HeuristicScorer::evaluate(&record).score);
    }

    #[test]
    fn score_ignores_insertion_order(entries in arb_metadata()) {
        // Later duplicates overwrite earlier ones, so dedupe first
        let mut unique: Vec<(String, Value)> = Vec::new();
        for (k, v) in entries {
            unique.retain(|(existing, _)| existing != &k);
            unique.push((k, v));
        }

        let forward = build(&unique);
        unique.reverse();
        let backward = build(&unique);

        prop_assert_eq!(HeuristicScorer::score(&forward), HeuristicScorer::score(&backward));
    }
}
