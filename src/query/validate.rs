//! Request validation ahead of any scan.

use crate::config::SearchConfig;
use crate::error::{EngineError, Result};
use crate::model::FieldSchema;

use super::engine::QueryPlan;
use super::request::SearchRequest;
use super::sort::{SortKey, resolve_sort_keys};

/// A request checked against a schema and resolved into executable parts.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub plan: QueryPlan,
    pub sort_keys: Vec<SortKey>,
    pub page_number: usize,
    pub page_size: usize,
    pub include_statistics: bool,
}

/// Reject malformed requests: unknown fields, type mismatches, bad paging,
/// unsortable sort keys.
pub fn validate_request(
    request: &SearchRequest,
    schema: &FieldSchema,
    settings: &SearchConfig,
) -> Result<ValidatedRequest> {
    let page_number = request.page_number.unwrap_or(1);
    if page_number == 0 {
        return Err(EngineError::Validation(
            "page number must be at least 1".to_string(),
        ));
    }

    let page_size = request.page_size.unwrap_or(settings.default_page_size);
    if page_size == 0 {
        return Err(EngineError::Validation(
            "page size must be positive".to_string(),
        ));
    }
    if page_size > settings.max_page_size {
        return Err(EngineError::Validation(format!(
            "page size {page_size} exceeds the maximum of {}",
            settings.max_page_size
        )));
    }

    let plan = QueryPlan::prepare(
        &request.criteria,
        schema,
        settings.fuzzy_threshold,
        request.require_all,
    )?;
    let sort_keys = resolve_sort_keys(&request.sort, schema)?;

    Ok(ValidatedRequest {
        plan,
        sort_keys,
        page_number,
        page_size,
        include_statistics: request.include_statistics,
    })
}
