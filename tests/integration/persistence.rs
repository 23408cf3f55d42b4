use dynidx::index::IndexSnapshot;
use dynidx::model::IndexStatus;
use dynidx::query::{SearchCriterion, SearchHit, SearchRequest, SearchResult, SortCriterion};
use dynidx::test_utils::fixtures::{TempWorkspace, property_index};
use dynidx::{EngineConfig, IndexInstance, codec};

use crate::common::{SEED, fixture_path, uncached};

fn sample_request() -> SearchRequest {
    SearchRequest::new()
        .criterion(SearchCriterion::in_list("City", ["Aden", "Taiz"]))
        .criterion(SearchCriterion::fuzzy("Name", "Hotell").optional())
        .sort_by(SortCriterion::ascending("Price"))
        .page(1, 50)
}

#[test]
fn saved_index_searches_identically() {
    let workspace = TempWorkspace::new().unwrap();
    let path = workspace.join("properties.dyz");
    let index = property_index(50, SEED, &uncached()).unwrap();
    assert!(index.save_to_file(&path).unwrap());

    let loaded = IndexInstance::load_from_file(&path, &uncached()).unwrap();
    assert_eq!(loaded.configuration(), index.configuration());
    assert_eq!(loaded.item_ids(), index.item_ids());
    assert_eq!(loaded.status(), IndexStatus::Active);
    assert_eq!(loaded.size_bytes(), index.size_bytes());

    let before = index.search(&sample_request()).unwrap();
    let after = loaded.search(&sample_request()).unwrap();
    assert_eq!(after.items, before.items);
    assert_eq!(after.total_count, before.total_count);
}

#[test]
fn save_leaves_no_temporary_files() {
    let workspace = TempWorkspace::new().unwrap();
    let path = workspace.join("nested/dir/index.dyz");
    let index = property_index(5, SEED, &uncached()).unwrap();
    index.save_to_file(&path).unwrap();
    index.save_to_file(&path).unwrap();

    let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(entries, ["index.dyz"]);
}

#[test]
fn snapshot_is_codec_framed() {
    let workspace = TempWorkspace::new().unwrap();
    let path = workspace.join("framed.dyz");
    property_index(3, SEED, &uncached())
        .unwrap()
        .save_to_file(&path)
        .unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..4], codec::MAGIC);
    let snapshot: IndexSnapshot = codec::decompress(&bytes).unwrap();
    assert_eq!(snapshot.items.len(), 3);
    assert_eq!(snapshot.items[0].id, "prop-000");
}

#[test]
fn corrupt_or_missing_files_fail_cleanly() {
    let workspace = TempWorkspace::new().unwrap();
    let garbage = workspace.write_file("garbage.dyz", "DYZ1 but not gzip").unwrap();
    let err = IndexInstance::load_from_file(&garbage, &EngineConfig::default()).unwrap_err();
    assert_eq!(err.code(), "codec");

    let missing = workspace.join("missing.dyz");
    let err = IndexInstance::load_from_file(&missing, &EngineConfig::default()).unwrap_err();
    assert_eq!(err.code(), "io");
}

#[test]
fn truncated_snapshot_is_a_codec_error() {
    let workspace = TempWorkspace::new().unwrap();
    let path = workspace.join("truncated.dyz");
    property_index(20, SEED, &uncached())
        .unwrap()
        .save_to_file(&path)
        .unwrap();
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
    let err = IndexInstance::load_from_file(&path, &uncached()).unwrap_err();
    assert_eq!(err.code(), "codec");
}

#[test]
fn exported_results_decode_to_the_same_page() {
    let index = property_index(30, SEED, &uncached()).unwrap();
    let page = index.search(&sample_request()).unwrap();
    let bytes = index.export_results(&page).unwrap();
    let decoded: SearchResult<SearchHit> = codec::decompress(&bytes).unwrap();
    assert_eq!(decoded, page);
}

#[test]
fn query_fixture_runs_against_saved_index() {
    let workspace = TempWorkspace::new().unwrap();
    let path = workspace.join("q.dyz");
    property_index(50, SEED, &uncached())
        .unwrap()
        .save_to_file(&path)
        .unwrap();

    let raw = std::fs::read_to_string(fixture_path("requests/affordable_sanaa.json")).unwrap();
    let request: SearchRequest = serde_json::from_str(&raw).unwrap();
    let loaded = IndexInstance::load_from_file(&path, &uncached()).unwrap();
    let result = loaded.search(&request).unwrap();

    assert!(result.statistics.is_some());
    for hit in &result.items {
        assert_eq!(hit.record.value("City").as_text(), Some("Sanaa"));
        assert!(hit.record.value("Price").as_number().unwrap() <= 300.0);
    }
    for pair in result.items.windows(2) {
        assert!(
            pair[0].record.value("Price").as_number() <= pair[1].record.value("Price").as_number()
        );
    }
}

#[test]
fn schema_extended_after_activation_survives_reload() {
    use dynidx::FieldDefinition;
    use dynidx::model::Record;

    let workspace = TempWorkspace::new().unwrap();
    let path = workspace.join("extended.dyz");
    let index = property_index(6, SEED, &uncached()).unwrap();
    let annex = Record::new().with("Name", "Annex").with("City", "Aden");
    index
        .add_item("extra", annex.clone().with("Stars", "five"))
        .unwrap();

    assert!(index.add_field(FieldDefinition::number("Stars")).is_err());
    index
        .update_item("extra", annex.with("Stars", 5.0))
        .unwrap();
    index.add_field(FieldDefinition::number("Stars").sortable()).unwrap();

    index.save_to_file(&path).unwrap();
    let loaded = IndexInstance::load_from_file(&path, &uncached()).unwrap();
    let request = SearchRequest::new().criterion(SearchCriterion::greater_than("Stars", 4.0));
    assert_eq!(loaded.search(&request).unwrap().total_count, 1);
    assert_eq!(loaded.get_item("extra"), index.get_item("extra"));
}
