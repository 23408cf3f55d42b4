//! dynidx query - run a JSON search request against a saved index

use std::path::PathBuf;

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::Result;
use crate::index::IndexInstance;
use crate::query::SearchRequest;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Saved index file
    pub path: PathBuf,

    /// File holding the request as JSON
    #[arg(long, value_name = "FILE")]
    pub request: PathBuf,
}

pub fn run(ctx: &AppContext, args: &QueryArgs) -> Result<()> {
    let index = IndexInstance::load_from_file(&args.path, &ctx.config)?;
    let raw = std::fs::read_to_string(&args.request)?;
    let request: SearchRequest = serde_json::from_str(&raw)?;
    let result = index.search(&request)?;

    if ctx.json {
        return emit_json(&result);
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!("Results from {}", index.name()));
    super::layout_hits(&mut layout, &result);
    if let Some(stats) = &result.statistics {
        layout.section("Statistics");
        layout.kv("Examined", &stats.items_examined.to_string());
        layout.kv("Matched", &stats.items_matched.to_string());
        layout.kv("Efficiency", &format!("{:.2}", stats.efficiency_ratio));
    }
    emit_human(&layout);
    Ok(())
}
