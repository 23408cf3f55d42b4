//! Property tests for the matcher, codec, filter, sort and pager.

#[path = "../common/mod.rs"]
mod common;

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use dynidx::codec;
use dynidx::config::SearchConfig;
use dynidx::model::{
    FieldDefinition, FieldSchema, FieldValue, IndexConfiguration, IndexStatus, Record,
};
use dynidx::query::fuzzy::{levenshtein, similarity};
use dynidx::query::{
    SearchCriterion, SearchHit, SearchRequest, SearchResult, SearchStatistics, SortCriterion,
    paginate, search_records,
};
use dynidx::test_utils::fixtures::{property_config, property_index};

use common::{SEED, number, uncached};

fn schema() -> FieldSchema {
    FieldSchema::new([
        FieldDefinition::text("Name").sortable(),
        FieldDefinition::number("Price").sortable(),
        FieldDefinition::number("Rating").sortable(),
    ])
    .unwrap()
}

fn record_strategy() -> impl Strategy<Value = Record> {
    (
        "[a-z]{1,8}( [a-z]{1,8})?",
        proptest::option::of(0u32..500),
        0u32..6,
    )
        .prop_map(|(name, price, rating)| {
            Record::new()
                .with("Name", name)
                .with("Price", price.map(f64::from))
                .with("Rating", f64::from(rating))
        })
}

fn date_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_102_444_800, 0u32..1_000_000_000)
        .prop_filter_map("representable instant", |(secs, nanos)| {
            DateTime::from_timestamp(secs, nanos)
        })
}

fn value_strategy() -> impl Strategy<Value = FieldValue> {
    let leaf = prop_oneof![
        Just(FieldValue::Null),
        ".{0,16}".prop_map(FieldValue::Text),
        (-1.0e9..1.0e9f64).prop_map(FieldValue::Number),
        any::<bool>().prop_map(FieldValue::Bool),
        date_strategy().prop_map(FieldValue::Date),
        (-1.0e6..1.0e6f64, 0.0..1.0e6f64)
            .prop_map(|(min, span)| FieldValue::NumberRange { min, max: min + span }),
        (date_strategy(), date_strategy()).prop_map(|(a, b)| FieldValue::DateRange {
            start: a.min(b),
            end: a.max(b),
        }),
    ];
    leaf.prop_recursive(2, 16, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(FieldValue::List)
    })
}

fn setting_strategy() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        any::<i64>().prop_map(serde_json::Value::from),
        (-1.0e12..1.0e12f64).prop_map(serde_json::Value::from),
        "[a-z0-9 ]{0,12}".prop_map(serde_json::Value::from),
        prop::collection::vec("[a-z]{0,6}", 0..4).prop_map(serde_json::Value::from),
    ]
}

fn configuration_strategy() -> impl Strategy<Value = IndexConfiguration> {
    let fields = vec![
        FieldDefinition::text("Name").required().sortable(),
        FieldDefinition::select("City", ["Sanaa", "Aden"]).display_name("Town"),
        FieldDefinition::number("Price").min(0.0).max(1.0e6).error_message("bad price"),
        FieldDefinition::multi_select("Amenities", ["wifi", "pool"]),
        FieldDefinition::date_range("Season"),
        FieldDefinition::numeric_range("Rooms").not_searchable(),
    ];
    (
        "[a-z]{1,10}",
        "[a-z0-9-]{1,12}",
        any::<i32>(),
        prop_oneof![
            Just(IndexStatus::Building),
            Just(IndexStatus::Active),
            Just(IndexStatus::Disabled),
        ],
        proptest::option::of(1usize..100_000),
        prop::sample::subsequence(fields, 0..=6),
        prop::collection::btree_map("[a-z_]{1,8}", setting_strategy(), 0..5),
        date_strategy(),
    )
        .prop_map(
            |(name, id, priority, status, max_items, fields, settings, created_at)| {
                let mut config = IndexConfiguration::new(name)
                    .with_id(id)
                    .with_type("properties")
                    .with_priority(priority)
                    .with_fields(fields)
                    .unwrap();
                config.status = status;
                config.is_enabled = status != IndexStatus::Disabled;
                config.max_items = max_items;
                config.custom_settings = settings;
                config.created_at = created_at;
                config.updated_at = created_at;
                config
            },
        )
}

fn result_strategy() -> impl Strategy<Value = SearchResult<SearchHit>> {
    let hit = ("[a-z0-9]{1,8}", 0.0..=1.0f64, prop::collection::vec(value_strategy(), 0..4))
        .prop_map(|(id, score, values)| SearchHit {
            id,
            score,
            record: values
                .into_iter()
                .enumerate()
                .map(|(i, value)| (format!("f{i}"), value))
                .collect(),
        });
    (
        prop::collection::vec(hit, 0..12),
        1usize..5,
        1usize..6,
        any::<bool>(),
        0u64..500,
    )
        .prop_map(|(hits, page_number, page_size, with_stats, examined)| {
            let mut result = paginate(hits, page_number, page_size);
            result.execution_time_ms = 1.25;
            if with_stats {
                let matched = examined / 2;
                result.statistics = Some(SearchStatistics {
                    items_examined: examined,
                    items_matched: matched,
                    criteria_evaluated: 2,
                    efficiency_ratio: SearchStatistics::efficiency(examined, matched),
                    ..SearchStatistics::default()
                });
            }
            result
        })
}

fn unlimited() -> SearchConfig {
    SearchConfig {
        max_page_size: usize::MAX,
        ..SearchConfig::default()
    }
}

proptest! {
    #[test]
    fn fuzzy_similarity_is_symmetric_and_bounded(a in "[a-zA-Z ]{0,12}", b in "[a-zA-Z ]{0,12}") {
        let ab = similarity(&a, &b);
        prop_assert!((ab - similarity(&b, &a)).abs() < 1e-12);
        prop_assert!((0.0..=1.0).contains(&ab));
        prop_assert_eq!(levenshtein(&a, &b), levenshtein(&b, &a));
        prop_assert!((similarity(&a, &a) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn codec_round_trips_records(values in prop::collection::vec(value_strategy(), 0..8)) {
        let record: Record = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| (format!("f{i}"), value))
            .collect();
        let bytes = codec::compress(&record).unwrap();
        let back: Record = codec::decompress(&bytes).unwrap();
        prop_assert_eq!(back, record);
    }

    #[test]
    fn codec_round_trips_configurations(config in configuration_strategy()) {
        let bytes = codec::compress(&config).unwrap();
        let back: IndexConfiguration = codec::decompress(&bytes).unwrap();
        prop_assert_eq!(back, config);
    }

    #[test]
    fn codec_round_trips_result_pages(result in result_strategy()) {
        let bytes = codec::compress(&result).unwrap();
        let back: SearchResult<SearchHit> = codec::decompress(&bytes).unwrap();
        prop_assert_eq!(back, result);
    }

    #[test]
    fn filter_is_sound_and_complete(
        records in prop::collection::vec(record_strategy(), 0..40),
        low in 0u32..500,
        span in 0u32..200,
    ) {
        let (low, high) = (f64::from(low), f64::from(low + span));
        let request = SearchRequest::new()
            .criterion(SearchCriterion::between("Price", low, high))
            .page(1, records.len().max(1));
        let result = search_records(&records, &request, &schema(), &unlimited()).unwrap();

        let expected: Vec<&Record> = records
            .iter()
            .filter(|r| (low..=high).contains(&number(r, "Price")))
            .collect();
        prop_assert_eq!(result.total_count, expected.len());
        let actual: Vec<&Record> = result.items.iter().collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn sort_is_stable_and_ordered(records in prop::collection::vec(record_strategy(), 0..40)) {
        let tagged: Vec<Record> = records
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.with("Seq", f64::from(u32::try_from(i).unwrap())))
            .collect();
        let request = SearchRequest::new()
            .sort_by(SortCriterion::descending("Rating"))
            .page(1, tagged.len().max(1));
        let result = search_records(&tagged, &request, &schema(), &unlimited()).unwrap();

        for pair in result.items.windows(2) {
            let rating = number(&pair[0], "Rating").total_cmp(&number(&pair[1], "Rating"));
            prop_assert_ne!(rating, Ordering::Less);
            if rating == Ordering::Equal {
                prop_assert!(number(&pair[0], "Seq") < number(&pair[1], "Seq"));
            }
        }
    }

    #[test]
    fn nulls_sort_last_both_ways(records in prop::collection::vec(record_strategy(), 1..30), descending in any::<bool>()) {
        let sort = if descending {
            SortCriterion::descending("Price")
        } else {
            SortCriterion::ascending("Price")
        };
        let request = SearchRequest::new().sort_by(sort).page(1, records.len());
        let result = search_records(&records, &request, &schema(), &unlimited()).unwrap();
        let first_null = result
            .items
            .iter()
            .position(|r| r.value("Price").is_null())
            .unwrap_or(result.items.len());
        prop_assert!(result.items[first_null..].iter().all(|r| r.value("Price").is_null()));
    }

    #[test]
    fn pagination_partitions_the_input(len in 0usize..120, page_size in 1usize..25) {
        let items: Vec<usize> = (0..len).collect();
        let total_pages = len.div_ceil(page_size);
        let mut seen = Vec::new();
        for page_number in 1..=total_pages + 1 {
            let page = paginate(items.clone(), page_number, page_size);
            prop_assert_eq!(page.total_count, len);
            prop_assert_eq!(page.total_pages, total_pages);
            prop_assert_eq!(page.has_previous, page_number > 1);
            prop_assert_eq!(page.has_next, page_number < total_pages);
            prop_assert!(page.items.len() <= page_size);
            seen.extend(page.items);
        }
        prop_assert_eq!(seen, items);
    }
}

fn compress_from_threads<T>(value: &Arc<T>, threads: usize) -> Vec<Vec<u8>>
where
    T: serde::Serialize + Send + Sync + 'static,
{
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let value = Arc::clone(value);
            std::thread::spawn(move || codec::compress(&*value).unwrap())
        })
        .collect();
    handles.into_iter().map(|handle| handle.join().unwrap()).collect()
}

#[test]
fn concurrent_compression_of_one_configuration_agrees() {
    let config = Arc::new(
        property_config("shared")
            .unwrap()
            .with_setting("region", serde_json::json!("north"))
            .with_setting("weights", serde_json::json!([0.5, 1.5])),
    );
    let outputs = compress_from_threads(&config, 8);
    for bytes in &outputs {
        let back: IndexConfiguration = codec::decompress(bytes).unwrap();
        assert_eq!(&back, config.as_ref());
        assert_eq!(bytes, &outputs[0]);
    }
}

#[test]
fn concurrent_compression_of_one_result_agrees() {
    let index = property_index(60, SEED, &uncached()).unwrap();
    let request = SearchRequest::new()
        .criterion(SearchCriterion::fuzzy("Name", "Hotell").optional())
        .sort_by(SortCriterion::descending("Rating"))
        .page(1, 20)
        .with_statistics();
    let result = Arc::new(index.search(&request).unwrap());
    let outputs = compress_from_threads(&result, 8);
    for bytes in &outputs {
        let back: SearchResult<SearchHit> = codec::decompress(bytes).unwrap();
        assert_eq!(&back, result.as_ref());
    }
}

#[test]
fn concurrent_compression_of_distinct_payloads_is_independent() {
    let payloads: Vec<Vec<String>> = (0..8)
        .map(|i| (0..200).map(|j| format!("item {i}-{j}")).collect())
        .collect();
    std::thread::scope(|scope| {
        for payload in &payloads {
            scope.spawn(move || {
                let bytes = codec::compress(payload).unwrap();
                let back: Vec<String> = codec::decompress(&bytes).unwrap();
                assert_eq!(&back, payload);
            });
        }
    });
}
