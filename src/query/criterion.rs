//! Search criteria: one typed condition per field.

use serde::{Deserialize, Serialize};

use crate::model::FieldValue;

/// The condition a criterion applies.
///
/// Closed set: the evaluator matches on it exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CriterionKind {
    ExactMatch {
        value: FieldValue,
    },
    NotEqual {
        value: FieldValue,
    },
    InRange {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<FieldValue>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<FieldValue>,
    },
    Contains {
        value: String,
    },
    StartsWith {
        value: String,
    },
    EndsWith {
        value: String,
    },
    Fuzzy {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        threshold: Option<f64>,
    },
    InList {
        values: Vec<FieldValue>,
    },
    NotInList {
        values: Vec<FieldValue>,
    },
    GreaterThan {
        value: FieldValue,
    },
    GreaterThanOrEqual {
        value: FieldValue,
    },
    LessThan {
        value: FieldValue,
    },
    LessThanOrEqual {
        value: FieldValue,
    },
    Regex {
        pattern: String,
    },
    IsNull,
    IsNotNull,
}

impl CriterionKind {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ExactMatch { .. } => "ExactMatch",
            Self::NotEqual { .. } => "NotEqual",
            Self::InRange { .. } => "InRange",
            Self::Contains { .. } => "Contains",
            Self::StartsWith { .. } => "StartsWith",
            Self::EndsWith { .. } => "EndsWith",
            Self::Fuzzy { .. } => "Fuzzy",
            Self::InList { .. } => "InList",
            Self::NotInList { .. } => "NotInList",
            Self::GreaterThan { .. } => "GreaterThan",
            Self::GreaterThanOrEqual { .. } => "GreaterThanOrEqual",
            Self::LessThan { .. } => "LessThan",
            Self::LessThanOrEqual { .. } => "LessThanOrEqual",
            Self::Regex { .. } => "Regex",
            Self::IsNull => "IsNull",
            Self::IsNotNull => "IsNotNull",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCriterion {
    pub field_name: String,
    #[serde(flatten)]
    pub kind: CriterionKind,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_required")]
    pub is_required: bool,
    #[serde(default)]
    pub case_sensitive: bool,
}

const fn default_weight() -> f64 {
    1.0
}

const fn default_required() -> bool {
    true
}

impl SearchCriterion {
    #[must_use]
    pub fn new(field_name: impl Into<String>, kind: CriterionKind) -> Self {
        Self {
            field_name: field_name.into(),
            kind,
            weight: default_weight(),
            is_required: default_required(),
            case_sensitive: false,
        }
    }

    #[must_use]
    pub fn exact(field_name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field_name, CriterionKind::ExactMatch { value: value.into() })
    }

    #[must_use]
    pub fn not_equal(field_name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field_name, CriterionKind::NotEqual { value: value.into() })
    }

    /// Inclusive range; pass `None` for an open bound.
    #[must_use]
    pub fn in_range(
        field_name: impl Into<String>,
        min: Option<FieldValue>,
        max: Option<FieldValue>,
    ) -> Self {
        Self::new(field_name, CriterionKind::InRange { min, max })
    }

    #[must_use]
    pub fn between(
        field_name: impl Into<String>,
        min: impl Into<FieldValue>,
        max: impl Into<FieldValue>,
    ) -> Self {
        Self::in_range(field_name, Some(min.into()), Some(max.into()))
    }

    #[must_use]
    pub fn contains(field_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field_name, CriterionKind::Contains { value: value.into() })
    }

    #[must_use]
    pub fn starts_with(field_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field_name, CriterionKind::StartsWith { value: value.into() })
    }

    #[must_use]
    pub fn ends_with(field_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field_name, CriterionKind::EndsWith { value: value.into() })
    }

    #[must_use]
    pub fn fuzzy(field_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            field_name,
            CriterionKind::Fuzzy {
                value: value.into(),
                threshold: None,
            },
        )
    }

    #[must_use]
    pub fn fuzzy_with_threshold(
        field_name: impl Into<String>,
        value: impl Into<String>,
        threshold: f64,
    ) -> Self {
        Self::new(
            field_name,
            CriterionKind::Fuzzy {
                value: value.into(),
                threshold: Some(threshold),
            },
        )
    }

    #[must_use]
    pub fn in_list<V: Into<FieldValue>>(
        field_name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(
            field_name,
            CriterionKind::InList {
                values: values.into_iter().map(Into::into).collect(),
            },
        )
    }

    #[must_use]
    pub fn not_in_list<V: Into<FieldValue>>(
        field_name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(
            field_name,
            CriterionKind::NotInList {
                values: values.into_iter().map(Into::into).collect(),
            },
        )
    }

    #[must_use]
    pub fn greater_than(field_name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field_name, CriterionKind::GreaterThan { value: value.into() })
    }

    #[must_use]
    pub fn greater_than_or_equal(
        field_name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Self {
        Self::new(
            field_name,
            CriterionKind::GreaterThanOrEqual { value: value.into() },
        )
    }

    #[must_use]
    pub fn less_than(field_name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field_name, CriterionKind::LessThan { value: value.into() })
    }

    #[must_use]
    pub fn less_than_or_equal(field_name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(
            field_name,
            CriterionKind::LessThanOrEqual { value: value.into() },
        )
    }

    #[must_use]
    pub fn regex(field_name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(
            field_name,
            CriterionKind::Regex {
                pattern: pattern.into(),
            },
        )
    }

    #[must_use]
    pub fn is_null(field_name: impl Into<String>) -> Self {
        Self::new(field_name, CriterionKind::IsNull)
    }

    #[must_use]
    pub fn is_not_null(field_name: impl Into<String>) -> Self {
        Self::new(field_name, CriterionKind::IsNotNull)
    }

    /// Mark as optional: affects ranking, not admission.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.is_required = false;
        self
    }

    #[must_use]
    pub const fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    #[must_use]
    pub const fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }
}
