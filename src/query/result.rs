//! Result assembly: pagination and search statistics.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::Record;

/// One matching record with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
    pub record: Record,
}

/// Execution statistics reported when a request asks for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStatistics {
    pub items_examined: u64,
    pub items_matched: u64,
    pub criteria_evaluated: usize,
    pub filter_time_ms: f64,
    pub sort_time_ms: f64,
    pub execution_time_ms: f64,
    /// `items_matched / max(items_examined, 1)`.
    pub efficiency_ratio: f64,
    #[serde(default)]
    pub served_from_cache: bool,
}

impl SearchStatistics {
    #[must_use]
    pub fn efficiency(items_examined: u64, items_matched: u64) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let ratio = items_matched as f64 / items_examined.max(1) as f64;
        ratio
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub page_number: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub execution_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<SearchStatistics>,
}

impl<T> SearchResult<T> {
    /// Project every item, keeping the paging metadata.
    #[must_use]
    pub fn map_items<U, F>(self, f: F) -> SearchResult<U>
    where
        F: FnMut(T) -> U,
    {
        SearchResult {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page_number: self.page_number,
            page_size: self.page_size,
            total_pages: self.total_pages,
            has_previous: self.has_previous,
            has_next: self.has_next,
            execution_time_ms: self.execution_time_ms,
            statistics: self.statistics,
        }
    }

    /// Fallible projection; the first error aborts.
    pub fn try_map_items<U, F>(self, f: F) -> Result<SearchResult<U>>
    where
        F: FnMut(T) -> Result<U>,
    {
        let items = self.items.into_iter().map(f).collect::<Result<Vec<_>>>()?;
        Ok(SearchResult {
            items,
            total_count: self.total_count,
            page_number: self.page_number,
            page_size: self.page_size,
            total_pages: self.total_pages,
            has_previous: self.has_previous,
            has_next: self.has_next,
            execution_time_ms: self.execution_time_ms,
            statistics: self.statistics,
        })
    }
}

impl SearchResult<SearchHit> {
    /// Drop ids and scores, keeping only records.
    #[must_use]
    pub fn into_records(self) -> SearchResult<Record> {
        self.map_items(|hit| hit.record)
    }
}

/// Cut one page out of the sorted set.
///
/// `page_number` is 1-based and `page_size` must be positive; callers
/// validate both. A page past the end is empty rather than an error.
#[must_use]
pub fn paginate<T>(sorted: Vec<T>, page_number: usize, page_size: usize) -> SearchResult<T> {
    let page_size = page_size.max(1);
    let page_number = page_number.max(1);
    let total_count = sorted.len();
    let total_pages = total_count.div_ceil(page_size);

    let start = (page_number - 1).saturating_mul(page_size);
    let items: Vec<T> = if start >= total_count {
        Vec::new()
    } else {
        sorted.into_iter().skip(start).take(page_size).collect()
    };

    SearchResult {
        items,
        total_count,
        page_number,
        page_size,
        total_pages,
        has_previous: page_number > 1,
        has_next: page_number < total_pages,
        execution_time_ms: 0.0,
        statistics: None,
    }
}
