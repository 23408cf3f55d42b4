//! Stable multi-key sorting.

use std::cmp::Ordering;

use crate::error::{EngineError, Result};
use crate::model::{FieldDataType, FieldSchema, Record};

use super::request::{SortCriterion, SortDirection};

/// A sort key resolved against the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field_name: String,
    pub direction: SortDirection,
    pub data_type: FieldDataType,
}

impl SortKey {
    /// Compare two records on this key. Nulls go last in either direction.
    #[must_use]
    pub fn compare(&self, left: &Record, right: &Record) -> Ordering {
        let left = left.value(&self.field_name);
        let right = right.value(&self.field_name);
        if left.is_null() || right.is_null() {
            return left.is_null().cmp(&right.is_null());
        }
        let ordering = left.sort_compare(right, self.data_type);
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Resolve sort criteria into keys ordered by ascending priority.
///
/// Unknown and non-sortable fields are rejected.
pub fn resolve_sort_keys(sort: &[SortCriterion], schema: &FieldSchema) -> Result<Vec<SortKey>> {
    let mut ordered: Vec<&SortCriterion> = sort.iter().collect();
    ordered.sort_by_key(|criterion| criterion.priority);

    ordered
        .into_iter()
        .map(|criterion| {
            let field = schema.require(&criterion.field_name)?;
            if !field.is_sortable {
                return Err(EngineError::Validation(format!(
                    "field {} is not sortable",
                    field.field_name
                )));
            }
            Ok(SortKey {
                field_name: field.field_name.clone(),
                direction: criterion.direction,
                data_type: criterion.data_type.unwrap_or(field.data_type),
            })
        })
        .collect()
}

/// Lexicographic comparison over all keys.
#[must_use]
pub fn compare_records(left: &Record, right: &Record, keys: &[SortKey]) -> Ordering {
    keys.iter()
        .map(|key| key.compare(left, right))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Stable sort of `items` by `keys`; `record` projects each item.
pub fn sort_by_keys<T, F>(items: &mut [T], keys: &[SortKey], record: F)
where
    F: Fn(&T) -> &Record,
{
    if keys.is_empty() {
        return;
    }
    items.sort_by(|a, b| compare_records(record(a), record(b), keys));
}

/// Stable sort by descending relevance score.
pub fn sort_by_score<T, F>(items: &mut [T], score: F)
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| score(b).total_cmp(&score(a)));
}

/// Sort plain records.
pub fn sort(records: &mut [Record], keys: &[SortKey]) {
    sort_by_keys(records, keys, |record| record);
}
