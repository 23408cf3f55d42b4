use std::cmp::Ordering;

use dynidx::query::fuzzy::best_similarity;
use dynidx::query::{SearchCriterion, SearchRequest, SortCriterion};
use dynidx::test_utils::fixtures::{property_index, property_records};

use crate::common::{SEED, ids, number, text, uncached};

#[test]
fn exact_city_returns_only_that_city() {
    let index = property_index(50, SEED, &uncached()).unwrap();
    let result = index
        .search(
            &SearchRequest::new()
                .criterion(SearchCriterion::exact("City", "Sanaa"))
                .page(1, 100),
        )
        .unwrap();

    let expected: Vec<String> = property_records(50, SEED)
        .into_iter()
        .filter(|(_, record)| text(record, "City") == "Sanaa")
        .map(|(id, _)| id)
        .collect();
    assert!(!expected.is_empty());
    assert_eq!(ids(&result), expected);
    assert!(result.items.iter().all(|hit| text(&hit.record, "City") == "Sanaa"));
}

#[test]
fn price_range_is_exact_and_inclusive() {
    let index = property_index(50, SEED, &uncached()).unwrap();
    let result = index
        .search(
            &SearchRequest::new()
                .criterion(SearchCriterion::between("Price", 100.0, 300.0))
                .page(1, 100)
                .with_statistics(),
        )
        .unwrap();

    let expected: Vec<String> = property_records(50, SEED)
        .into_iter()
        .filter(|(_, record)| (100.0..=300.0).contains(&number(record, "Price")))
        .map(|(id, _)| id)
        .collect();
    assert_eq!(ids(&result), expected);

    let prices: Vec<f64> = result.items.iter().map(|hit| number(&hit.record, "Price")).collect();
    #[allow(clippy::cast_precision_loss)]
    let average = prices.iter().sum::<f64>() / prices.len() as f64;
    assert!((100.0..=300.0).contains(&average));

    let stats = result.statistics.unwrap();
    assert_eq!(stats.items_examined, 50);
    assert_eq!(stats.items_matched as usize, expected.len());
}

#[test]
fn fuzzy_name_respects_threshold() {
    let index = property_index(50, SEED, &uncached()).unwrap();
    let result = index
        .search(
            &SearchRequest::new()
                .criterion(SearchCriterion::fuzzy("Name", "Hotell"))
                .page(1, 100),
        )
        .unwrap();

    assert!(result.total_count > 0);
    for hit in &result.items {
        assert!(best_similarity("Hotell", text(&hit.record, "Name"), false) >= 0.6);
    }

    let matched = ids(&result);
    for (id, record) in property_records(50, SEED) {
        let name = text(&record, "Name");
        if name.contains("Hotel") {
            assert!(matched.contains(&id), "{name} should match");
        }
        if best_similarity("Hotell", name, false) < 0.6 {
            assert!(!matched.contains(&id), "{name} should not match");
        }
    }
}

#[test]
fn multi_key_sort_pages_in_order() {
    let index = property_index(50, SEED, &uncached()).unwrap();
    let result = index
        .search(
            &SearchRequest::new()
                .sort_by(SortCriterion::descending("Rating"))
                .sort_by(SortCriterion::ascending("Price"))
                .page(1, 5),
        )
        .unwrap();

    assert_eq!(result.items.len(), 5);
    assert_eq!(result.total_count, 50);
    assert_eq!(result.total_pages, 10);
    assert!(result.has_next);
    assert!(!result.has_previous);

    for pair in result.items.windows(2) {
        let (a, b) = (&pair[0].record, &pair[1].record);
        let rating = number(a, "Rating").total_cmp(&number(b, "Rating"));
        assert_ne!(rating, Ordering::Less);
        if rating == Ordering::Equal {
            assert!(number(a, "Price") <= number(b, "Price"));
        }
    }

    let mut all = property_records(50, SEED);
    all.sort_by(|(_, a), (_, b)| {
        number(b, "Rating")
            .total_cmp(&number(a, "Rating"))
            .then_with(|| number(a, "Price").total_cmp(&number(b, "Price")))
    });
    let expected: Vec<String> = all.into_iter().take(5).map(|(id, _)| id).collect();
    assert_eq!(ids(&result), expected);
}

#[test]
fn optional_criteria_rank_by_score() {
    let index = property_index(50, SEED, &uncached()).unwrap();
    let result = index
        .search(
            &SearchRequest::new()
                .criterion(SearchCriterion::exact("City", "Aden").optional().weight(2.0))
                .criterion(SearchCriterion::greater_than_or_equal("Rating", 4.0).optional())
                .page(1, 100),
        )
        .unwrap();

    assert_eq!(result.total_count, 50);
    for pair in result.items.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    let top = &result.items[0];
    assert!(top.score > 0.0);
    assert_eq!(text(&top.record, "City"), "Aden");
}

#[test]
fn require_all_turns_optional_into_filters() {
    let index = property_index(50, SEED, &uncached()).unwrap();
    let request = SearchRequest::new()
        .criterion(SearchCriterion::exact("City", "Taiz").optional())
        .page(1, 100)
        .require_all();
    let result = index.search(&request).unwrap();
    assert!(result.total_count < 50);
    assert!(result.items.iter().all(|hit| text(&hit.record, "City") == "Taiz"));
}

#[test]
fn out_of_range_page_is_empty() {
    let index = property_index(12, SEED, &uncached()).unwrap();
    let result = index.search(&SearchRequest::new().page(4, 5)).unwrap();
    assert!(result.items.is_empty());
    assert_eq!(result.total_count, 12);
    assert_eq!(result.total_pages, 3);
    assert!(!result.has_next);
}

#[test]
fn invalid_requests_are_rejected_before_scanning() {
    let index = property_index(10, SEED, &uncached()).unwrap();
    let cases = [
        SearchRequest::new().criterion(SearchCriterion::exact("Owner", "x")),
        SearchRequest::new().criterion(SearchCriterion::regex("Name", "(")),
        SearchRequest::new().sort_by(SortCriterion::ascending("Amenities")),
        SearchRequest::new().page(0, 10),
        SearchRequest::new().page(1, 5000),
    ];
    for request in cases {
        let err = index.search(&request).unwrap_err();
        assert!(err.is_validation(), "{request:?} gave {err}");
    }
    assert_eq!(index.telemetry().snapshot().items_examined, 0);
}
