use dynidx::model::{FieldDefinition, IndexStatus, Record};
use dynidx::query::{SearchCriterion, SearchRequest};
use dynidx::test_utils::fixtures::{property_config, property_index, property_records};
use dynidx::test_utils::logging::capture_logs;
use dynidx::{EngineConfig, EngineError, IndexInstance};
use tracing::Level;

use crate::common::{SEED, uncached};

#[test]
fn full_status_cycle() {
    let index = IndexInstance::new(property_config("cycle").unwrap(), &uncached()).unwrap();
    assert_eq!(index.status(), IndexStatus::Building);
    assert!(index.configuration().is_enabled);

    index.activate().unwrap();
    for (id, record) in property_records(5, SEED) {
        index.add_item(id, record).unwrap();
    }

    index.disable().unwrap();
    assert_eq!(index.status(), IndexStatus::Disabled);
    assert!(!index.configuration().is_enabled);
    assert!(matches!(
        index.add_item("late", property_records(1, 9).remove(0).1),
        Err(EngineError::InvalidState { .. })
    ));
    assert!(matches!(index.remove_item("prop-000"), Err(EngineError::InvalidState { .. })));

    index.enable().unwrap();
    assert_eq!(index.len(), 5);
    assert_eq!(index.search(&SearchRequest::new()).unwrap().total_count, 5);
}

#[test]
fn invalid_transitions_are_rejected() {
    let index = IndexInstance::new(property_config("t").unwrap(), &uncached()).unwrap();
    assert!(matches!(index.disable(), Err(EngineError::InvalidState { .. })));
    assert!(matches!(index.enable(), Err(EngineError::InvalidState { .. })));
    index.activate().unwrap();
    assert!(matches!(index.activate(), Err(EngineError::InvalidState { .. })));
}

#[test]
fn building_index_accepts_schema_changes_only() {
    let index = IndexInstance::new(property_config("b").unwrap(), &uncached()).unwrap();
    index.add_field(FieldDefinition::text("Owner")).unwrap();
    assert_eq!(index.remove_field("Owner").unwrap().field_name, "Owner");
    assert!(matches!(
        index.remove_field("Owner"),
        Err(EngineError::UnknownField(_))
    ));
    assert!(index.add_item("x", Record::new().with("Name", "x")).is_err());
    assert!(index.is_empty());
}

#[test]
fn invalid_configuration_is_refused() {
    let duplicate = dynidx::IndexConfiguration::new("dup")
        .with_fields([FieldDefinition::text("A"), FieldDefinition::text("A")]);
    assert!(duplicate.is_err());

    let empty_name = dynidx::IndexConfiguration::new("  ");
    assert!(IndexInstance::new(empty_name, &uncached()).is_err());
}

#[test]
fn configured_capacity_default_applies() {
    let mut settings = uncached();
    settings.index.default_max_items = Some(3);
    let err = property_index(4, SEED, &settings).unwrap_err();
    assert!(matches!(err, EngineError::CapacityExceeded { max_items: 3, .. }));
}

#[test]
fn mutations_and_transitions_are_logged() {
    let capture = capture_logs("index=debug");
    let index = property_index(3, SEED, &uncached()).unwrap();
    index.disable().unwrap();

    assert!(capture.contains("index created"), "{}", capture.format_for_display());
    let transition = capture.find(Level::INFO, "status changed").unwrap();
    assert_eq!(transition.field("to"), Some("Disabled"));
    assert!(capture.find(Level::DEBUG, "item added").is_some());
}

#[test]
fn slow_searches_warn() {
    let mut settings: EngineConfig = uncached();
    settings.search.slow_query_ms = 0;
    let index = property_index(10, SEED, &settings).unwrap();

    let capture = capture_logs("index=warn");
    index
        .search(&SearchRequest::new().criterion(SearchCriterion::fuzzy("Name", "Villa")))
        .unwrap();
    let entry = capture.find(Level::WARN, "slow search").unwrap();
    assert_eq!(entry.field("criteria"), Some("1"));
    assert_eq!(capture.count_at(Level::DEBUG), 0);
}

#[test]
fn telemetry_counts_successes_and_failures() {
    let index = property_index(5, SEED, &uncached()).unwrap();
    index.search(&SearchRequest::new()).unwrap();
    index.search(&SearchRequest::new().page(0, 1)).unwrap_err();
    index.update_item("missing", Record::new()).unwrap_err();

    let counters = index.telemetry().snapshot();
    assert_eq!(counters.add_operations, 5);
    assert_eq!(counters.search_operations, 1);
    assert_eq!(counters.failed_operations, 2);

    let metrics = index.get_statistics();
    assert_eq!(metrics.total_items, 5);
    assert!(metrics.derived.success_rate > 0.7);
    assert_eq!(metrics.field_statistics["City"].non_null_count, 5);
}
