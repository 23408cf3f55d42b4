//! Query engine: admission and relevance scoring over a collection.

use rayon::prelude::*;

use crate::error::Result;
use crate::model::{FieldSchema, FieldValue, Record};
use crate::telemetry::TelemetryStore;

use super::criterion::SearchCriterion;
use super::evaluator::PreparedCriterion;

/// Anything the engine can filter.
pub trait Searchable: Sync {
    fn record(&self) -> &Record;
}

impl Searchable for Record {
    fn record(&self) -> &Record {
        self
    }
}

/// Prepared criteria for one request, split by admission role.
#[derive(Debug, Clone, Default)]
pub struct QueryPlan {
    required: Vec<PreparedCriterion>,
    optional: Vec<PreparedCriterion>,
    require_all: bool,
    total_weight: f64,
}

impl QueryPlan {
    /// Validate and prepare every criterion. Nothing is scanned here.
    pub fn prepare(
        criteria: &[SearchCriterion],
        schema: &FieldSchema,
        fuzzy_threshold: f64,
        require_all: bool,
    ) -> Result<Self> {
        let mut plan = Self {
            require_all,
            ..Self::default()
        };
        for criterion in criteria {
            let prepared = PreparedCriterion::prepare(criterion, schema, fuzzy_threshold)?;
            plan.total_weight += prepared.weight;
            if prepared.is_required {
                plan.required.push(prepared);
            } else {
                plan.optional.push(prepared);
            }
        }
        Ok(plan)
    }

    #[must_use]
    pub fn criteria_count(&self) -> usize {
        self.required.len() + self.optional.len()
    }

    #[must_use]
    pub fn has_optional(&self) -> bool {
        !self.optional.is_empty()
    }

    /// Required equality criteria, usable for postings lookups.
    pub fn equality_lookups(&self) -> impl Iterator<Item = (&str, &[FieldValue])> {
        self.required.iter().filter_map(|criterion| {
            criterion
                .equality_operands()
                .map(|values| (criterion.field_name.as_str(), values))
        })
    }

    /// Relevance score when `record` is admitted, `None` otherwise.
    ///
    /// Stops at the first failing required criterion. The score is the
    /// weighted mean strength of the passing criteria; 1.0 without criteria.
    #[must_use]
    pub fn matches(&self, record: &Record) -> Option<f64> {
        let mut weighted = 0.0;
        for criterion in &self.required {
            let (passed, strength) = criterion.evaluate_with_strength(record);
            if !passed {
                return None;
            }
            weighted += criterion.weight * strength;
        }
        for criterion in &self.optional {
            let (passed, strength) = criterion.evaluate_with_strength(record);
            if passed {
                weighted += criterion.weight * strength;
            } else if self.require_all {
                return None;
            }
        }
        if self.total_weight > 0.0 {
            Some(weighted / self.total_weight)
        } else {
            Some(1.0)
        }
    }
}

/// A match and its score.
#[derive(Debug, Clone, Copy)]
pub struct Scored<'a, T> {
    pub item: &'a T,
    pub score: f64,
}

#[derive(Debug)]
pub struct FilterOutcome<'a, T> {
    pub matches: Vec<Scored<'a, T>>,
    pub examined: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct QueryEngine {
    parallel_threshold: usize,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl QueryEngine {
    #[must_use]
    pub const fn new(parallel_threshold: usize) -> Self {
        Self { parallel_threshold }
    }

    /// Keep every candidate the plan admits, in candidate order.
    ///
    /// Large candidate sets are scanned with rayon; the indexed collect keeps
    /// the original order.
    pub fn filter<'a, T: Searchable>(
        &self,
        candidates: &[&'a T],
        plan: &QueryPlan,
        telemetry: &TelemetryStore,
    ) -> FilterOutcome<'a, T> {
        let score = |item: &&'a T| {
            plan.matches(item.record())
                .map(|score| Scored { item: *item, score })
        };
        let matches: Vec<Scored<'a, T>> =
            if self.parallel_threshold > 0 && candidates.len() >= self.parallel_threshold {
                candidates.par_iter().filter_map(score).collect()
            } else {
                candidates.iter().filter_map(score).collect()
            };

        let examined = candidates.len() as u64;
        telemetry.record_filter(examined, matches.len() as u64);
        FilterOutcome { matches, examined }
    }
}

/// Filter a plain record collection by `criteria`.
pub fn filter<'a>(
    records: &'a [Record],
    criteria: &[SearchCriterion],
    schema: &FieldSchema,
) -> Result<Vec<&'a Record>> {
    let plan = QueryPlan::prepare(
        criteria,
        schema,
        super::fuzzy::DEFAULT_FUZZY_THRESHOLD,
        false,
    )?;
    let candidates: Vec<&Record> = records.iter().collect();
    let outcome = QueryEngine::default().filter(&candidates, &plan, &TelemetryStore::new());
    Ok(outcome.matches.into_iter().map(|scored| scored.item).collect())
}
