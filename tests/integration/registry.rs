use dynidx::index::IndexRegistry;
use dynidx::model::IndexStatus;
use dynidx::query::SearchRequest;
use dynidx::test_utils::fixtures::{TempWorkspace, property_config, property_records};
use dynidx::EngineError;

use crate::common::{SEED, uncached};

fn populated(registry: &IndexRegistry, name: &str, count: usize) {
    let index = registry.create_index(property_config(name).unwrap()).unwrap();
    index.activate().unwrap();
    for (id, record) in property_records(count, SEED) {
        index.add_item(id, record).unwrap();
    }
}

#[test]
fn statistics_aggregate_across_indices() {
    let registry = IndexRegistry::new(uncached());
    populated(&registry, "north", 10);
    populated(&registry, "south", 15);
    registry
        .create_index(property_config("staging").unwrap())
        .unwrap();

    for name in ["north", "south", "south"] {
        registry.get_index(name).unwrap().search(&SearchRequest::new()).unwrap();
    }

    let stats = registry.registry_statistics();
    assert_eq!(stats.total_indices, 3);
    assert_eq!(stats.active_indices_count, 2);
    assert_eq!(registry.active_indices_count(), 2);
    assert_eq!(stats.total_creates, 3);
    assert_eq!(stats.total_searches, 3);
    assert_eq!(stats.total_items, 25);
    let north = registry.get_index("north").unwrap().size_bytes();
    let south = registry.get_index("south").unwrap().size_bytes();
    assert_eq!(stats.total_index_size_bytes, north + south);
}

#[test]
fn lookups_by_name_and_id() {
    let registry = IndexRegistry::new(uncached());
    let index = registry
        .create_index(property_config("main").unwrap().with_id("idx-main"))
        .unwrap();
    assert_eq!(registry.get_index_by_id("idx-main").unwrap().name(), "main");
    assert_eq!(registry.get_index("main").unwrap().index_id(), index.index_id());
    assert!(registry.get_index_by_id("idx-other").is_none());

    let listed = registry.list_indices();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, IndexStatus::Building);
    assert_eq!(listed[0].index_type, "properties");
}

#[test]
fn duplicates_and_missing_indices() {
    let registry = IndexRegistry::new(uncached());
    populated(&registry, "one", 1);
    assert!(matches!(
        registry.create_index(property_config("one").unwrap()),
        Err(EngineError::DuplicateIndex(_))
    ));
    assert!(matches!(
        registry.remove_index("two"),
        Err(EngineError::IndexNotFound(_))
    ));

    registry.remove_index("one").unwrap();
    let stats = registry.registry_statistics();
    assert_eq!(stats.total_indices, 0);
    assert_eq!(stats.total_removes, 1);
    assert_eq!(stats.total_items, 0);
}

#[test]
fn loaded_indices_join_the_registry() {
    let workspace = TempWorkspace::new().unwrap();
    let path = workspace.join("saved.dyz");
    let source = IndexRegistry::new(uncached());
    populated(&source, "saved", 8);
    source.get_index("saved").unwrap().save_to_file(&path).unwrap();

    let registry = IndexRegistry::new(uncached());
    let loaded = registry.load_index(&path).unwrap();
    assert_eq!(loaded.len(), 8);
    loaded.search(&SearchRequest::new()).unwrap();
    assert_eq!(registry.registry_statistics().total_searches, 1);
    assert!(matches!(
        registry.load_index(&path),
        Err(EngineError::DuplicateIndex(_))
    ));
}
