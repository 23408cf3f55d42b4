//! Criterion evaluation against a single record.
//!
//! A [`SearchCriterion`] is first prepared against the schema: operands are
//! coerced to the field's type, regexes compiled, fuzzy thresholds resolved.
//! Preparation is where type mismatches and unknown fields are rejected, so
//! evaluation itself is infallible.

use std::cmp::Ordering;

use regex::Regex;

use crate::error::{EngineError, Result};
use crate::model::{FieldDataType, FieldDefinition, FieldSchema, FieldValue, Record, parse_date};

use super::criterion::{CriterionKind, SearchCriterion};
use super::fuzzy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl CompareOp {
    const fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Greater => matches!(ordering, Ordering::Greater),
            Self::GreaterOrEqual => !matches!(ordering, Ordering::Less),
            Self::Less => matches!(ordering, Ordering::Less),
            Self::LessOrEqual => !matches!(ordering, Ordering::Greater),
        }
    }
}

#[derive(Debug, Clone)]
enum Test {
    Equals(FieldValue),
    NotEquals(FieldValue),
    Range {
        min: Option<FieldValue>,
        max: Option<FieldValue>,
    },
    Compare {
        op: CompareOp,
        bound: FieldValue,
    },
    Contains {
        needle: String,
        point: Option<FieldValue>,
    },
    StartsWith(String),
    EndsWith(String),
    Fuzzy {
        needle: String,
        threshold: f64,
    },
    InList(Vec<FieldValue>),
    NotInList(Vec<FieldValue>),
    Regex(Regex),
    IsNull,
    IsNotNull,
}

/// A criterion bound to its field definition, ready to evaluate.
#[derive(Debug, Clone)]
pub struct PreparedCriterion {
    pub field_name: String,
    pub data_type: FieldDataType,
    pub weight: f64,
    pub is_required: bool,
    pub case_sensitive: bool,
    test: Test,
}

impl PreparedCriterion {
    /// Validate `criterion` against `schema` and prepare it.
    pub fn prepare(
        criterion: &SearchCriterion,
        schema: &FieldSchema,
        default_fuzzy_threshold: f64,
    ) -> Result<Self> {
        let field = schema.require(&criterion.field_name)?;
        if !field.is_searchable {
            return Err(EngineError::Validation(format!(
                "field {} is not searchable",
                field.field_name
            )));
        }
        if !criterion.weight.is_finite() || criterion.weight < 0.0 {
            return Err(EngineError::Validation(format!(
                "criterion on {}: weight must be a non-negative number",
                field.field_name
            )));
        }

        let case_sensitive = criterion.case_sensitive;
        let test = match &criterion.kind {
            CriterionKind::ExactMatch { value } => Test::Equals(operand(field, value)?),
            CriterionKind::NotEqual { value } => Test::NotEquals(operand(field, value)?),
            CriterionKind::InList { values } => Test::InList(operands(field, values)?),
            CriterionKind::NotInList { values } => Test::NotInList(operands(field, values)?),
            CriterionKind::InRange { min, max } => {
                require_ordered(field, &criterion.kind)?;
                let min = min.as_ref().map(|v| bound(field, v)).transpose()?;
                let max = max.as_ref().map(|v| bound(field, v)).transpose()?;
                if let (Some(lo), Some(hi)) = (&min, &max) {
                    if lo.partial_compare(hi, case_sensitive) == Some(Ordering::Greater) {
                        return Err(EngineError::Validation(format!(
                            "criterion on {}: range minimum exceeds maximum",
                            field.field_name
                        )));
                    }
                }
                Test::Range { min, max }
            }
            CriterionKind::GreaterThan { value } => compare(field, &criterion.kind, CompareOp::Greater, value)?,
            CriterionKind::GreaterThanOrEqual { value } => {
                compare(field, &criterion.kind, CompareOp::GreaterOrEqual, value)?
            }
            CriterionKind::LessThan { value } => compare(field, &criterion.kind, CompareOp::Less, value)?,
            CriterionKind::LessThanOrEqual { value } => {
                compare(field, &criterion.kind, CompareOp::LessOrEqual, value)?
            }
            CriterionKind::Contains { value } => Test::Contains {
                needle: fold(value, case_sensitive),
                point: range_point(field.data_type, value),
            },
            CriterionKind::StartsWith { value } => Test::StartsWith(fold(value, case_sensitive)),
            CriterionKind::EndsWith { value } => Test::EndsWith(fold(value, case_sensitive)),
            CriterionKind::Fuzzy { value, threshold } => {
                if !field.data_type.is_textual() {
                    return Err(EngineError::type_mismatch(
                        &field.field_name,
                        "Text, Select or MultiSelect",
                        field.data_type,
                    ));
                }
                let threshold = threshold.unwrap_or(default_fuzzy_threshold);
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(EngineError::Validation(format!(
                        "criterion on {}: fuzzy threshold {threshold} is outside [0, 1]",
                        field.field_name
                    )));
                }
                Test::Fuzzy {
                    needle: value.clone(),
                    threshold,
                }
            }
            CriterionKind::Regex { pattern } => {
                let source = if case_sensitive {
                    pattern.clone()
                } else {
                    format!("(?i){pattern}")
                };
                let regex = Regex::new(&source).map_err(|err| {
                    EngineError::Validation(format!(
                        "criterion on {}: invalid pattern: {err}",
                        field.field_name
                    ))
                })?;
                Test::Regex(regex)
            }
            CriterionKind::IsNull => Test::IsNull,
            CriterionKind::IsNotNull => Test::IsNotNull,
        };

        Ok(Self {
            field_name: field.field_name.clone(),
            data_type: field.data_type,
            weight: criterion.weight,
            is_required: criterion.is_required,
            case_sensitive,
            test,
        })
    }

    /// Pass/fail for one record.
    #[must_use]
    pub fn evaluate(&self, record: &Record) -> bool {
        self.evaluate_with_strength(record).0
    }

    /// Match strength in `[0, 1]`: the similarity for fuzzy criteria,
    /// otherwise 1.0 on pass and 0.0 on failure.
    #[must_use]
    pub fn match_strength(&self, record: &Record) -> f64 {
        self.evaluate_with_strength(record).1
    }

    #[must_use]
    pub fn evaluate_with_strength(&self, record: &Record) -> (bool, f64) {
        let value = record.value(&self.field_name);
        if let Test::Fuzzy { needle, threshold } = &self.test {
            let score = self.fuzzy_score(needle, value);
            return (score >= *threshold, score);
        }
        let passed = self.test_value(value);
        (passed, if passed { 1.0 } else { 0.0 })
    }

    /// Literal operands usable for an equality postings lookup.
    #[must_use]
    pub fn equality_operands(&self) -> Option<&[FieldValue]> {
        match &self.test {
            Test::Equals(value) => Some(std::slice::from_ref(value)),
            Test::InList(values) => Some(values),
            _ => None,
        }
    }

    fn test_value(&self, value: &FieldValue) -> bool {
        match &self.test {
            Test::IsNull => value.is_null(),
            Test::IsNotNull => !value.is_null(),
            Test::NotEquals(target) => !self.matches_value(value, target),
            Test::NotInList(targets) => !targets.iter().any(|t| self.matches_value(value, t)),
            _ if value.is_null() => false,
            Test::Equals(target) => self.matches_value(value, target),
            Test::InList(targets) => targets.iter().any(|t| self.matches_value(value, t)),
            Test::Range { min, max } => self.in_range(value, min.as_ref(), max.as_ref()),
            Test::Compare { op, bound } => self.compare(value, *op, bound),
            Test::Contains { needle, point } => match (value, point) {
                (FieldValue::NumberRange { .. } | FieldValue::DateRange { .. }, Some(point)) => {
                    range_contains(value, point)
                }
                _ => fold(&value.display_string(), self.case_sensitive).contains(needle.as_str()),
            },
            Test::StartsWith(needle) => {
                fold(&value.display_string(), self.case_sensitive).starts_with(needle.as_str())
            }
            Test::EndsWith(needle) => {
                fold(&value.display_string(), self.case_sensitive).ends_with(needle.as_str())
            }
            Test::Regex(regex) => regex.is_match(&value.display_string()),
            Test::Fuzzy { needle, threshold } => self.fuzzy_score(needle, value) >= *threshold,
        }
    }

    fn fuzzy_score(&self, needle: &str, value: &FieldValue) -> f64 {
        match value {
            FieldValue::Null => 0.0,
            FieldValue::List(items) => items
                .iter()
                .map(|item| {
                    fuzzy::best_similarity(needle, &item.display_string(), self.case_sensitive)
                })
                .fold(0.0, f64::max),
            other => fuzzy::best_similarity(needle, &other.display_string(), self.case_sensitive),
        }
    }

    /// Equality with multi-select and range semantics.
    fn matches_value(&self, value: &FieldValue, target: &FieldValue) -> bool {
        match (value, target) {
            (FieldValue::List(items), FieldValue::List(_)) => {
                value.equals(target, self.case_sensitive)
                    || items.iter().any(|item| item.equals(target, self.case_sensitive))
            }
            (FieldValue::List(items), _) => {
                items.iter().any(|item| item.equals(target, self.case_sensitive))
            }
            (FieldValue::NumberRange { .. } | FieldValue::DateRange { .. }, _)
                if !matches!(
                    target,
                    FieldValue::NumberRange { .. } | FieldValue::DateRange { .. }
                ) =>
            {
                range_contains(value, target)
            }
            _ => value.equals(target, self.case_sensitive),
        }
    }

    fn in_range(&self, value: &FieldValue, min: Option<&FieldValue>, max: Option<&FieldValue>) -> bool {
        match value {
            FieldValue::NumberRange { min: lo, max: hi } => {
                let lo = FieldValue::Number(*lo);
                let hi = FieldValue::Number(*hi);
                self.overlaps(&lo, &hi, min, max)
            }
            FieldValue::DateRange { start, end } => {
                let lo = FieldValue::Date(*start);
                let hi = FieldValue::Date(*end);
                self.overlaps(&lo, &hi, min, max)
            }
            _ => {
                min.is_none_or(|min| self.compare(value, CompareOp::GreaterOrEqual, min))
                    && max.is_none_or(|max| self.compare(value, CompareOp::LessOrEqual, max))
            }
        }
    }

    fn overlaps(
        &self,
        lo: &FieldValue,
        hi: &FieldValue,
        min: Option<&FieldValue>,
        max: Option<&FieldValue>,
    ) -> bool {
        min.is_none_or(|min| self.compare(hi, CompareOp::GreaterOrEqual, min))
            && max.is_none_or(|max| self.compare(lo, CompareOp::LessOrEqual, max))
    }

    /// Ordering test. Range values are compared by their lower bound for
    /// `>`/`>=` and by their upper bound for `<`/`<=`.
    fn compare(&self, value: &FieldValue, op: CompareOp, bound: &FieldValue) -> bool {
        let subject = match (value, op) {
            (FieldValue::NumberRange { min, .. }, CompareOp::Greater | CompareOp::GreaterOrEqual) => {
                FieldValue::Number(*min)
            }
            (FieldValue::NumberRange { max, .. }, _) => FieldValue::Number(*max),
            (FieldValue::DateRange { start, .. }, CompareOp::Greater | CompareOp::GreaterOrEqual) => {
                FieldValue::Date(*start)
            }
            (FieldValue::DateRange { end, .. }, _) => FieldValue::Date(*end),
            _ => value.clone(),
        };
        let ordering = subject
            .partial_compare(bound, self.case_sensitive)
            .unwrap_or_else(|| {
                // lexical fallback for values that do not share a variant
                fold(&subject.display_string(), self.case_sensitive)
                    .cmp(&fold(&bound.display_string(), self.case_sensitive))
            });
        op.accepts(ordering)
    }
}

/// Evaluate one criterion against one record.
pub fn evaluate(record: &Record, criterion: &SearchCriterion, schema: &FieldSchema) -> Result<bool> {
    let prepared = PreparedCriterion::prepare(criterion, schema, fuzzy::DEFAULT_FUZZY_THRESHOLD)?;
    Ok(prepared.evaluate(record))
}

/// Coerce an equality operand: a single element first, then the whole type.
fn operand(field: &FieldDefinition, value: &FieldValue) -> Result<FieldValue> {
    if value.is_null() {
        return Err(EngineError::Validation(format!(
            "criterion on {}: use IsNull to match missing values",
            field.field_name
        )));
    }
    value
        .coerce_to(field.data_type.element_type())
        .or_else(|| value.coerce_to(field.data_type))
        .ok_or_else(|| {
            EngineError::type_mismatch(&field.field_name, field.data_type, value.type_name())
        })
}

fn operands(field: &FieldDefinition, values: &[FieldValue]) -> Result<Vec<FieldValue>> {
    if values.is_empty() {
        return Err(EngineError::Validation(format!(
            "criterion on {}: value list is empty",
            field.field_name
        )));
    }
    values.iter().map(|value| operand(field, value)).collect()
}

fn bound(field: &FieldDefinition, value: &FieldValue) -> Result<FieldValue> {
    let element = field.data_type.element_type();
    match value.coerce_to(element) {
        Some(coerced) if !coerced.is_null() => Ok(coerced),
        _ => Err(EngineError::type_mismatch(
            &field.field_name,
            element,
            value.type_name(),
        )),
    }
}

fn compare(
    field: &FieldDefinition,
    kind: &CriterionKind,
    op: CompareOp,
    value: &FieldValue,
) -> Result<Test> {
    require_ordered(field, kind)?;
    Ok(Test::Compare {
        op,
        bound: bound(field, value)?,
    })
}

fn require_ordered(field: &FieldDefinition, kind: &CriterionKind) -> Result<()> {
    if field.data_type.is_ordered() {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "{} is not supported on {} field {}",
            kind.name(),
            field.data_type,
            field.field_name
        )))
    }
}

/// For range fields, parse a `Contains` needle as a point.
fn range_point(data_type: FieldDataType, needle: &str) -> Option<FieldValue> {
    match data_type {
        FieldDataType::NumericRange => needle.trim().parse::<f64>().ok().map(FieldValue::Number),
        FieldDataType::DateRange => parse_date(needle).map(FieldValue::Date),
        _ => None,
    }
}

fn range_contains(range: &FieldValue, point: &FieldValue) -> bool {
    match (range, point) {
        (FieldValue::NumberRange { min, max }, FieldValue::Number(p)) => min <= p && p <= max,
        (FieldValue::DateRange { start, end }, FieldValue::Date(p)) => start <= p && p <= end,
        _ => false,
    }
}

fn fold(text: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        text.to_string()
    } else {
        text.to_lowercase()
    }
}
