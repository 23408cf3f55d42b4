//! Search requests and sort keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::FieldDataType;

use super::criterion::SearchCriterion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => f.write_str("asc"),
            Self::Descending => f.write_str("desc"),
        }
    }
}

/// One sort key. Lower `priority` is applied first; keys with equal
/// priority keep their position in the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCriterion {
    pub field_name: String,
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default)]
    pub priority: i32,
    /// Overrides the field's declared type for comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<FieldDataType>,
}

impl SortCriterion {
    #[must_use]
    pub fn ascending(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            direction: SortDirection::Ascending,
            priority: 0,
            data_type: None,
        }
    }

    #[must_use]
    pub fn descending(field_name: impl Into<String>) -> Self {
        Self {
            direction: SortDirection::Descending,
            ..Self::ascending(field_name)
        }
    }

    #[must_use]
    pub const fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub const fn compare_as(mut self, data_type: FieldDataType) -> Self {
        self.data_type = Some(data_type);
        self
    }
}

/// A query: criteria, sort keys and the page to return.
///
/// `page_number` is 1-based. Omitted paging values take the configured
/// defaults. `timeout_ms` is carried for callers that enforce deadlines
/// around the engine call; the pipeline itself does not enforce it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub criteria: Vec<SearchCriterion>,
    #[serde(default)]
    pub sort: Vec<SortCriterion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub include_statistics: bool,
    #[serde(default)]
    pub require_all: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl SearchRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn criterion(mut self, criterion: SearchCriterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    #[must_use]
    pub fn sort_by(mut self, sort: SortCriterion) -> Self {
        self.sort.push(sort);
        self
    }

    #[must_use]
    pub const fn page(mut self, page_number: usize, page_size: usize) -> Self {
        self.page_number = Some(page_number);
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub const fn with_statistics(mut self) -> Self {
        self.include_statistics = true;
        self
    }

    #[must_use]
    pub const fn require_all(mut self) -> Self {
        self.require_all = true;
        self
    }

    #[must_use]
    pub const fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}
