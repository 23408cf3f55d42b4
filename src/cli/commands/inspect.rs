//! dynidx inspect - configuration and statistics of a saved index

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::Result;
use crate::index::IndexInstance;
use crate::model::IndexConfiguration;
use crate::telemetry::FieldStats;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Saved index file
    pub path: PathBuf,
}

#[derive(Serialize)]
struct InspectReport {
    path: PathBuf,
    configuration: IndexConfiguration,
    items: usize,
    size_bytes: usize,
    field_statistics: BTreeMap<String, FieldStats>,
}

pub fn run(ctx: &AppContext, args: &InspectArgs) -> Result<()> {
    let index = IndexInstance::load_from_file(&args.path, &ctx.config)?;
    let metrics = index.get_statistics();
    let report = InspectReport {
        path: args.path.clone(),
        configuration: index.configuration(),
        items: metrics.total_items,
        size_bytes: metrics.index_size_bytes,
        field_statistics: metrics.field_statistics,
    };

    if ctx.json {
        return emit_json(&report);
    }

    let config = &report.configuration;
    let mut layout = HumanLayout::new();
    layout.title(&format!("Index {}", config.name));
    layout.kv("Id", &config.index_id);
    layout.kv("Type", &config.index_type);
    layout.kv("Status", &config.status.to_string());
    layout.kv("Priority", &config.priority.to_string());
    layout.kv("Items", &report.items.to_string());
    layout.kv("Size", &format!("{} bytes", report.size_bytes));
    layout.kv("Updated", &config.updated_at.to_rfc3339());

    layout.section("Fields");
    for field in &config.fields {
        let mut flags = Vec::new();
        if field.is_required {
            flags.push("required");
        }
        if field.is_sortable {
            flags.push("sortable");
        }
        if !field.is_searchable {
            flags.push("not searchable");
        }
        let stats = report
            .field_statistics
            .get(&field.field_name)
            .map(|stats| {
                format!(
                    "{} set, {} null, {} distinct",
                    stats.non_null_count, stats.null_count, stats.distinct_values
                )
            })
            .unwrap_or_default();
        layout.bullet(&format!(
            "{} : {} [{}] {stats}",
            field.field_name,
            field.data_type,
            flags.join(", ")
        ));
    }
    emit_human(&layout);
    Ok(())
}
