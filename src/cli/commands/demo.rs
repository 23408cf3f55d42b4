//! dynidx demo - synthetic property listings and the sample queries

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::Result;
use crate::index::{IndexRegistry, RegistryStatistics};
use crate::query::{SearchCriterion, SearchHit, SearchRequest, SearchResult, SortCriterion};
use crate::telemetry::PerformanceMetrics;
use crate::test_utils::fixtures::{property_config, property_records};

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Number of synthetic listings
    #[arg(long, default_value_t = 50)]
    pub records: usize,

    /// Seed for the listing generator
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Save the populated index to this path
    #[arg(long, value_name = "PATH")]
    pub save: Option<PathBuf>,
}

#[derive(Serialize)]
struct ScenarioReport {
    name: &'static str,
    request: SearchRequest,
    result: SearchResult<SearchHit>,
}

#[derive(Serialize)]
struct DemoReport {
    records: usize,
    seed: u64,
    scenarios: Vec<ScenarioReport>,
    metrics: PerformanceMetrics,
    registry: RegistryStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_to: Option<PathBuf>,
}

/// The sample queries, in presentation order.
#[must_use]
pub fn scenarios() -> Vec<(&'static str, SearchRequest)> {
    vec![
        (
            "listings in Sanaa",
            SearchRequest::new().criterion(SearchCriterion::exact("City", "Sanaa")),
        ),
        (
            "price between 100 and 300",
            SearchRequest::new()
                .criterion(SearchCriterion::between("Price", 100.0, 300.0))
                .with_statistics(),
        ),
        (
            "names like \"Hotell\"",
            SearchRequest::new().criterion(SearchCriterion::fuzzy("Name", "Hotell")),
        ),
        (
            "top rated, cheapest first",
            SearchRequest::new()
                .sort_by(SortCriterion::descending("Rating"))
                .sort_by(SortCriterion::ascending("Price"))
                .page(1, 5),
        ),
    ]
}

pub fn run(ctx: &AppContext, args: &DemoArgs) -> Result<()> {
    let registry = IndexRegistry::new(ctx.config.clone());
    let index = registry.create_index(property_config("properties")?)?;
    index.activate()?;
    for (id, record) in property_records(args.records, args.seed) {
        index.add_item(id, record)?;
    }
    info!(records = index.len(), seed = args.seed, "listings loaded");

    let mut reports = Vec::new();
    for (name, request) in scenarios() {
        let result = index.search(&request)?;
        reports.push(ScenarioReport {
            name,
            request,
            result,
        });
    }

    if let Some(path) = &args.save {
        index.save_to_file(path)?;
    }

    let report = DemoReport {
        records: index.len(),
        seed: args.seed,
        scenarios: reports,
        metrics: index.get_statistics(),
        registry: registry.registry_statistics(),
        saved_to: args.save.clone(),
    };

    if ctx.json {
        return emit_json(&report);
    }

    let mut layout = HumanLayout::new();
    layout.title("Property search demo");
    layout.kv("Listings", &report.records.to_string());
    layout.kv("Seed", &report.seed.to_string());
    for scenario in &report.scenarios {
        layout.section(scenario.name);
        super::layout_hits(&mut layout, &scenario.result);
    }
    layout.section("Telemetry");
    layout.kv(
        "Searches",
        &report.metrics.counters.search_operations.to_string(),
    );
    layout.kv(
        "Avg search",
        &format!("{:.3} ms", report.metrics.average_search_time_ms),
    );
    layout.kv(
        "Index size",
        &format!("{} bytes", report.metrics.index_size_bytes),
    );
    if let Some(path) = &report.saved_to {
        layout.kv("Saved to", &path.display().to_string());
    }
    emit_human(&layout);
    Ok(())
}
