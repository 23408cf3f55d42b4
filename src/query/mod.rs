//! Query pipeline: criteria, evaluation, filtering, sorting and paging.

pub mod criterion;
pub mod engine;
pub mod evaluator;
pub mod fuzzy;
pub mod request;
pub mod result;
pub mod sort;
pub mod validate;

use std::time::Instant;

pub use criterion::{CriterionKind, SearchCriterion};
pub use engine::{QueryEngine, QueryPlan, Scored, Searchable};
pub use evaluator::{PreparedCriterion, evaluate};
pub use request::{SearchRequest, SortCriterion, SortDirection};
pub use result::{SearchHit, SearchResult, SearchStatistics, paginate};
pub use sort::SortKey;
pub use validate::{ValidatedRequest, validate_request};

use crate::config::SearchConfig;
use crate::error::Result;
use crate::model::{FieldSchema, Record};
use crate::telemetry::TelemetryStore;

fn millis_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Filter, sort and page `candidates` for a validated request.
///
/// With no sort keys, optional criteria order results by descending score;
/// otherwise candidate order is kept.
pub fn execute<'a, T: Searchable>(
    candidates: &[&'a T],
    request: &ValidatedRequest,
    engine: &QueryEngine,
    telemetry: &TelemetryStore,
) -> SearchResult<Scored<'a, T>> {
    let started = Instant::now();

    let outcome = engine.filter(candidates, &request.plan, telemetry);
    let filter_time_ms = millis_since(started);
    let examined = outcome.examined;
    let mut matches = outcome.matches;
    let matched = matches.len() as u64;

    let sort_started = Instant::now();
    if !request.sort_keys.is_empty() {
        sort::sort_by_keys(&mut matches, &request.sort_keys, |scored| scored.item.record());
    } else if request.plan.has_optional() {
        sort::sort_by_score(&mut matches, |scored| scored.score);
    }
    let sort_time_ms = millis_since(sort_started);

    let mut result = paginate(matches, request.page_number, request.page_size);
    let execution_time_ms = millis_since(started);
    result.execution_time_ms = execution_time_ms;
    if request.include_statistics {
        result.statistics = Some(SearchStatistics {
            items_examined: examined,
            items_matched: matched,
            criteria_evaluated: request.plan.criteria_count(),
            filter_time_ms,
            sort_time_ms,
            execution_time_ms,
            efficiency_ratio: SearchStatistics::efficiency(examined, matched),
            served_from_cache: false,
        });
    }
    result
}

/// Run `request` over a plain record slice.
pub fn search_records(
    records: &[Record],
    request: &SearchRequest,
    schema: &FieldSchema,
    settings: &SearchConfig,
) -> Result<SearchResult<Record>> {
    let validated = validate_request(request, schema, settings)?;
    let candidates: Vec<&Record> = records.iter().collect();
    let engine = QueryEngine::new(settings.parallel_threshold);
    let result = execute(&candidates, &validated, &engine, &TelemetryStore::new());
    Ok(result.map_items(|scored| scored.item.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDefinition, FieldValue};

    fn schema() -> FieldSchema {
        FieldSchema::new([
            FieldDefinition::text("Name").sortable(),
            FieldDefinition::number("Price").sortable(),
        ])
        .unwrap()
    }

    fn records() -> Vec<Record> {
        [("Hotel A", 50.0), ("Inn B", 150.0), ("Hotel C", 250.0), ("Lodge D", 350.0)]
            .into_iter()
            .map(|(name, price)| Record::new().with("Name", name).with("Price", price))
            .collect()
    }

    #[test]
    fn pipeline_filters_sorts_and_pages() {
        let request = SearchRequest::new()
            .criterion(SearchCriterion::between("Price", 100.0, 400.0))
            .sort_by(SortCriterion::descending("Price"))
            .page(1, 2)
            .with_statistics();
        let result = search_records(&records(), &request, &schema(), &SearchConfig::default())
            .unwrap();
        assert_eq!(result.total_count, 3);
        assert_eq!(result.total_pages, 2);
        assert_eq!(result.items[0].value("Price"), &FieldValue::Number(350.0));
        let stats = result.statistics.unwrap();
        assert_eq!(stats.items_examined, 4);
        assert_eq!(stats.items_matched, 3);
        assert!((stats.efficiency_ratio - 0.75).abs() < 1e-12);
    }

    #[test]
    fn optional_criteria_rank_without_sort_keys() {
        let request = SearchRequest::new()
            .criterion(SearchCriterion::contains("Name", "hotel").optional())
            .page(1, 10);
        let result = search_records(&records(), &request, &schema(), &SearchConfig::default())
            .unwrap();
        assert_eq!(result.total_count, 4);
        let names: Vec<String> = result
            .items
            .iter()
            .map(|r| r.value("Name").display_string())
            .collect();
        assert_eq!(names, ["Hotel A", "Hotel C", "Inn B", "Lodge D"]);
    }

    #[test]
    fn statistics_are_omitted_unless_requested() {
        let result = search_records(
            &records(),
            &SearchRequest::new(),
            &schema(),
            &SearchConfig::default(),
        )
        .unwrap();
        assert!(result.statistics.is_none());
        assert_eq!(result.items.len(), 4);
    }
}
