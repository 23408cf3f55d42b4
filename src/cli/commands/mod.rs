//! CLI command implementations
//!
//! Each subcommand has its own module with an Args struct and a `run`
//! function.

use clap::Subcommand;

pub mod demo;
pub mod inspect;
pub mod query;

use crate::app::AppContext;
use crate::cli::output::HumanLayout;
use crate::error::Result;
use crate::query::{SearchHit, SearchResult};

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Demo(args) => demo::run(ctx, args),
        Commands::Inspect(args) => inspect::run(ctx, args),
        Commands::Query(args) => query::run(ctx, args),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a synthetic property index and run sample queries
    Demo(demo::DemoArgs),

    /// Show configuration and statistics of a saved index
    Inspect(inspect::InspectArgs),

    /// Run a JSON search request against a saved index
    Query(query::QueryArgs),
}

/// Shared rendering of a result page: paging summary plus one bullet per hit.
fn layout_hits(layout: &mut HumanLayout, result: &SearchResult<SearchHit>) {
    layout.kv("Matches", &result.total_count.to_string());
    layout.kv(
        "Page",
        &format!("{} of {}", result.page_number, result.total_pages.max(1)),
    );
    layout.kv("Time", &format!("{:.3} ms", result.execution_time_ms));
    for hit in &result.items {
        let fields: Vec<String> = hit
            .record
            .iter()
            .map(|(name, value)| format!("{name}={}", value.display_string()))
            .collect();
        layout.bullet(&format!("{} ({:.2}) {}", hit.id, hit.score, fields.join(" ")));
    }
}
