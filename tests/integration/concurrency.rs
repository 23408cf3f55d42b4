use std::sync::Arc;
use std::thread;

use dynidx::index::IndexRegistry;
use dynidx::query::{SearchCriterion, SearchRequest, SortCriterion};
use dynidx::test_utils::fixtures::{property_config, property_index, property_records};
use dynidx::EngineConfig;

use crate::common::{SEED, ids, uncached};

#[test]
fn readers_and_writers_share_an_index() {
    let registry = IndexRegistry::new(EngineConfig::default());
    let index = registry.create_index(property_config("shared").unwrap()).unwrap();
    index.activate().unwrap();

    let records = property_records(200, SEED);
    let (first, second) = records.split_at(100);
    let writers: Vec<_> = [first.to_vec(), second.to_vec()]
        .into_iter()
        .map(|batch| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for (id, record) in batch {
                    index.add_item(id, record).unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                let request = SearchRequest::new()
                    .criterion(SearchCriterion::exact("City", "Aden"))
                    .page(1, 500);
                for _ in 0..25 {
                    let result = index.search(&request).unwrap();
                    assert!(result.items.iter().all(|hit| {
                        hit.record.value("City").as_text() == Some("Aden")
                    }));
                    assert_eq!(result.items.len(), result.total_count);
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }

    assert_eq!(index.len(), 200);
    let stats = registry.registry_statistics();
    assert_eq!(stats.total_searches, 100);
    assert_eq!(stats.total_items, 200);
}

#[test]
fn parallel_filtering_matches_sequential_order() {
    let mut parallel = uncached();
    parallel.search.parallel_threshold = 1;
    let mut sequential = uncached();
    sequential.search.parallel_threshold = usize::MAX;

    let request = SearchRequest::new()
        .criterion(SearchCriterion::fuzzy("Name", "Hotell"))
        .criterion(SearchCriterion::greater_than("Rating", 2.0))
        .page(1, 1000);
    let a = property_index(400, SEED, &parallel).unwrap().search(&request).unwrap();
    let b = property_index(400, SEED, &sequential).unwrap().search(&request).unwrap();
    assert_eq!(ids(&a), ids(&b));
    assert!(a.total_count > 0);
}

#[test]
fn concurrent_cached_searches_agree() {
    let index = Arc::new(property_index(100, SEED, &EngineConfig::default()).unwrap());
    let request = SearchRequest::new()
        .sort_by(SortCriterion::descending("Price"))
        .page(2, 10);
    let expected = ids(&index.search(&request).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let index = Arc::clone(&index);
            let request = request.clone();
            thread::spawn(move || ids(&index.search(&request).unwrap()))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
    let cache = index.get_statistics().cache_statistics;
    assert!(cache.hits >= 8);
    assert!(cache.hottest_entry_hits >= 8);
}
